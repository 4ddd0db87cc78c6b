//! Error types for risk calculations.

use thiserror::Error;
use varcontrib_math::MathError;

use crate::config::ValidationError;

/// A specialized Result type for risk calculations.
pub type RiskResult<T> = Result<T, RiskError>;

/// Errors that can occur during risk calculations.
#[derive(Debug, Error)]
pub enum RiskError {
    /// A precondition on the inputs was violated.
    #[error("invalid input for {context}: {reason}")]
    InvalidInput {
        /// Component or parameter that rejected the input.
        context: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// The inputs were valid but the quantity is undefined.
    #[error("degenerate computation in {estimator}: {reason}")]
    DegenerateComputation {
        /// Estimator that hit the degenerate case.
        estimator: &'static str,
        /// Why the result is undefined.
        reason: String,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {}", format_validation(.0))]
    Config(Vec<ValidationError>),

    /// Error from the math crate.
    #[error("math error: {0}")]
    Math(#[from] MathError),
}

impl RiskError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(context: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            context,
            reason: reason.into(),
        }
    }

    /// Creates a degenerate computation error.
    #[must_use]
    pub fn degenerate(estimator: &'static str, reason: impl Into<String>) -> Self {
        Self::DegenerateComputation {
            estimator,
            reason: reason.into(),
        }
    }

    /// Returns true for degenerate computation errors.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateComputation { .. })
    }

    /// Returns true for input validation errors, including config errors.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::Config(_))
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
