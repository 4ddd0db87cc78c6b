//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// A configuration file could not be read.
    #[error("Cannot read {path}: {source}")]
    ReadFile {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML for an analysis.
    #[error("Invalid configuration in {path}: {reason}")]
    ConfigFormat {
        /// File that failed.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A series entry is not a number.
    #[error("Line {line}: '{value}' is not a number")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },

    /// The input contained no observations.
    #[error("No observations in input")]
    EmptySeries,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
