//! CLI command implementations.

pub mod compare;
pub mod config;
pub mod diagnose;

// Re-export submodules for convenience
pub use compare::CompareArgs;
pub use config::ConfigArgs;
pub use diagnose::DiagnoseArgs;

use std::path::Path;

use varcontrib_risk::config::AnalysisConfig;

use crate::error::{CliError, CliResult};

/// Loads an analysis configuration from a TOML file, or the defaults.
pub fn load_config(path: Option<&Path>) -> CliResult<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };

    let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| CliError::ConfigFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
