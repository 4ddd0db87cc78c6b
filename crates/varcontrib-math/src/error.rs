//! Error types for mathematical operations.

use thiserror::Error;

/// A specialized Result type for mathematical operations.
pub type MathResult<T> = Result<T, MathError>;

/// Errors that can occur during mathematical operations.
#[derive(Error, Debug, Clone)]
pub enum MathError {
    /// Division by zero or near-zero value.
    #[error("Division by zero or near-zero value: {value:.2e}")]
    DivisionByZero {
        /// The near-zero value.
        value: f64,
    },

    /// Matrix is not symmetric positive semi-definite.
    #[error("Matrix is not positive semi-definite: smallest eigenvalue {min_eigenvalue:.4e}")]
    NotPositiveSemiDefinite {
        /// Smallest eigenvalue found.
        min_eigenvalue: f64,
    },

    /// Matrix dimensions are incompatible.
    #[error("Incompatible matrix dimensions: ({rows1}x{cols1}) and ({rows2}x{cols2})")]
    DimensionMismatch {
        /// Rows in first matrix.
        rows1: usize,
        /// Columns in first matrix.
        cols1: usize,
        /// Rows in second matrix.
        rows2: usize,
        /// Columns in second matrix.
        cols2: usize,
    },

    /// Insufficient data points for operation.
    #[error("Insufficient data: need at least {required}, got {actual}")]
    InsufficientData {
        /// Minimum required points.
        required: usize,
        /// Actual number of points.
        actual: usize,
    },

    /// Invalid input parameter.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },

    /// A distribution could not be constructed from its parameters.
    #[error("Invalid {distribution} parameters: {reason}")]
    Distribution {
        /// Name of the distribution.
        distribution: &'static str,
        /// Reason reported by the distribution library.
        reason: String,
    },
}

impl MathError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates an insufficient data error.
    #[must_use]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// Creates a distribution construction error.
    #[must_use]
    pub fn distribution(distribution: &'static str, reason: impl ToString) -> Self {
        Self::Distribution {
            distribution,
            reason: reason.to_string(),
        }
    }

    /// Creates a vector length mismatch error.
    #[must_use]
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            rows1: expected,
            cols1: 1,
            rows2: actual,
            cols2: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::insufficient_data(8, 3);
        assert!(err.to_string().contains("at least 8"));

        let err = MathError::NotPositiveSemiDefinite {
            min_eigenvalue: -0.5,
        };
        assert!(err.to_string().contains("positive semi-definite"));
    }
}
