//! Analysis configuration and validation.
//!
//! [`AnalysisConfig`] is the serializable description of one comparison run.
//! Every field has a default so a partial TOML or JSON document is enough.

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::market::{ConfidenceLevel, MarketModel};
use crate::var::EstimatorConfig;

// =============================================================================
// VALIDATION
// =============================================================================

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
    /// Validation rule that was violated.
    pub rule: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Creates a validation error with a rule name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "{}: {} (rule: {})", self.field, self.message, rule),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Trait for validating configurations.
pub trait Validate {
    /// Returns every validation error, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and returns [`RiskError::Config`] if invalid.
    fn validate_or_error(&self) -> RiskResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RiskError::Config(errors))
        }
    }
}

// =============================================================================
// MARKET SPECIFICATION
// =============================================================================

/// Explicit market parameters, replacing the generated demo market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSpec {
    /// Location vector `μ`.
    pub mean: Vec<f64>,
    /// Dispersion matrix `Σ`, one inner vector per row.
    pub covariance: Vec<Vec<f64>>,
}

impl MarketSpec {
    /// Number of assets.
    pub fn assets(&self) -> usize {
        self.mean.len()
    }

    /// Builds the validated market model.
    pub fn to_model(&self, degrees_of_freedom: f64) -> RiskResult<MarketModel> {
        let n = self.assets();
        if self.covariance.len() != n || self.covariance.iter().any(|row| row.len() != n) {
            return Err(RiskError::invalid_input(
                "market covariance",
                format!("expected {n} rows of {n} entries"),
            ));
        }
        let flat: Vec<f64> = self.covariance.iter().flatten().copied().collect();
        MarketModel::from_slices(&self.mean, &flat, degrees_of_freedom)
    }
}

impl Validate for MarketSpec {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let n = self.assets();

        if n == 0 {
            errors.push(ValidationError::new("market.mean", "Mean vector cannot be empty"));
        }
        if self.mean.iter().any(|v| !v.is_finite()) {
            errors.push(ValidationError::with_rule(
                "market.mean",
                "Mean vector contains non-finite values",
                "finite",
            ));
        }
        if self.covariance.len() != n || self.covariance.iter().any(|row| row.len() != n) {
            errors.push(ValidationError::with_rule(
                "market.covariance",
                format!("Covariance must be {n}x{n} to match the mean vector"),
                "square_matching_mean",
            ));
        } else if self.covariance.iter().flatten().any(|v| !v.is_finite()) {
            errors.push(ValidationError::with_rule(
                "market.covariance",
                "Covariance contains non-finite values",
                "finite",
            ));
        }

        errors
    }
}

// =============================================================================
// ANALYSIS CONFIGURATION
// =============================================================================

/// Parameters of one VaR contribution comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of assets of the generated demo market.
    #[serde(default = "default_assets")]
    pub assets: usize,

    /// Number of simulated scenarios `S`, positive and even.
    #[serde(default = "default_simulations")]
    pub simulations: usize,

    /// Student-t degrees of freedom `ν`.
    #[serde(default = "default_degrees_of_freedom")]
    pub degrees_of_freedom: f64,

    /// Confidence level `c` in `(0, 1)`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// RNG seed; `None` draws one from the OS.
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,

    /// Empirical estimator tuning.
    #[serde(default)]
    pub estimators: EstimatorConfig,

    /// Explicit market; the demo market is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketSpec>,

    /// Explicit allocation; generated with the demo market when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Vec<f64>>,
}

fn default_assets() -> usize {
    40
}

fn default_simulations() -> usize {
    100_000
}

fn default_degrees_of_freedom() -> f64 {
    10.0
}

fn default_confidence() -> f64 {
    0.99
}

#[allow(clippy::unnecessary_wraps)]
fn default_seed() -> Option<u64> {
    Some(42)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            simulations: default_simulations(),
            degrees_of_freedom: default_degrees_of_freedom(),
            confidence: default_confidence(),
            seed: default_seed(),
            estimators: EstimatorConfig::default(),
            market: None,
            allocation: None,
        }
    }
}

impl AnalysisConfig {
    /// Number of assets the run will use.
    ///
    /// An explicit market takes precedence over `assets`.
    pub fn effective_assets(&self) -> usize {
        self.market.as_ref().map_or(self.assets, MarketSpec::assets)
    }

    /// The validated confidence level.
    pub fn confidence_level(&self) -> RiskResult<ConfidenceLevel> {
        ConfidenceLevel::new(self.confidence)
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.market.is_none() && self.assets == 0 {
            errors.push(ValidationError::new("assets", "At least one asset is required"));
        }

        if self.simulations == 0 || self.simulations % 2 != 0 {
            errors.push(ValidationError::with_rule(
                "simulations",
                format!(
                    "Simulation count must be a positive even number, got {}",
                    self.simulations
                ),
                "positive_even",
            ));
        }

        if !(self.degrees_of_freedom > 0.0 && self.degrees_of_freedom.is_finite()) {
            errors.push(ValidationError::with_rule(
                "degrees_of_freedom",
                "Degrees of freedom must be positive and finite",
                "positive",
            ));
        }

        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            errors.push(ValidationError::with_rule(
                "confidence",
                format!("Confidence {} must lie strictly between 0 and 1", self.confidence),
                "open_unit_interval",
            ));
        }

        let eps = self.estimators.perturbation;
        if eps == 0.0 || !eps.is_finite() {
            errors.push(ValidationError::with_rule(
                "estimators.perturbation",
                "Perturbation must be finite and non-zero",
                "non_zero",
            ));
        }

        let divisor = self.estimators.bandwidth_divisor;
        if !(divisor > 0.0 && divisor.is_finite()) {
            errors.push(ValidationError::with_rule(
                "estimators.bandwidth_divisor",
                "Bandwidth divisor must be positive and finite",
                "positive",
            ));
        }

        if let Some(market) = &self.market {
            errors.extend(market.validate());
        }

        if let Some(allocation) = &self.allocation {
            let expected = self.effective_assets();
            if allocation.len() != expected {
                errors.push(ValidationError::with_rule(
                    "allocation",
                    format!("Expected {expected} weights, got {}", allocation.len()),
                    "matches_assets",
                ));
            }
            if allocation.iter().any(|w| !w.is_finite()) {
                errors.push(ValidationError::with_rule(
                    "allocation",
                    "Allocation contains non-finite values",
                    "finite",
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.assets, 40);
        assert_eq!(config.simulations, 100_000);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.estimators.bandwidth_divisor, 700.0);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config = AnalysisConfig {
            simulations: 1001,
            confidence: 1.0,
            degrees_of_freedom: -1.0,
            ..AnalysisConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "simulations"));

        let err = config.validate_or_error().unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_market_spec_shape() {
        let market = MarketSpec {
            mean: vec![0.0, 0.0],
            covariance: vec![vec![1.0, 0.0], vec![0.0]],
        };
        assert!(!market.is_valid());
        assert!(market.to_model(5.0).is_err());

        let market = MarketSpec {
            mean: vec![0.0, 0.0],
            covariance: vec![vec![1.0, 0.2], vec![0.2, 1.0]],
        };
        assert!(market.is_valid());
        assert_eq!(market.to_model(5.0).unwrap().assets(), 2);
    }

    #[test]
    fn test_allocation_must_match_market() {
        let config = AnalysisConfig {
            market: Some(MarketSpec {
                mean: vec![0.0],
                covariance: vec![vec![1.0]],
            }),
            allocation: Some(vec![0.5, 0.5]),
            ..AnalysisConfig::default()
        };
        assert_eq!(config.effective_assets(), 1);
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_deref(), Some("matches_assets"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::with_rule("confidence", "out of range", "open_unit_interval");
        assert_eq!(err.to_string(), "confidence: out of range (rule: open_unit_interval)");
    }
}
