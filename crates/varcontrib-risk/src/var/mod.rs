//! Value at Risk (VaR) and VaR contributions.
//!
//! VaR here is the lower-tail `(1 - c)` quantile of portfolio P&L, so a loss
//! is a negative number. The contribution of asset `n` is
//! `a_n · ∂VaR/∂a_n`; for the analytical and refined estimators the
//! contributions add up to VaR (Euler allocation).

mod analytical;
mod naive;
mod refined;

pub use analytical::*;
pub use naive::*;
pub use refined::*;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};

/// VaR contribution estimation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaRMethod {
    /// Closed form under the Student-t market model
    Analytical,
    /// Empirical percentile with one-sided finite differences
    Naive,
    /// Kernel-smoothed order statistics
    Refined,
}

impl VaRMethod {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analytical => "analytical",
            Self::Naive => "naive",
            Self::Refined => "refined",
        }
    }
}

impl std::fmt::Display for VaRMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// VaR estimate with its gradient and per-asset contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaRContributions {
    /// Method used for the estimate
    pub method: VaRMethod,
    /// VaR (lower-tail quantile of P&L)
    pub var: f64,
    /// `∂VaR/∂a` per asset
    pub gradient: DVector<f64>,
    /// `a ⊙ ∂VaR/∂a` per asset
    pub contributions: DVector<f64>,
}

impl VaRContributions {
    /// Builds the result from a gradient, computing `a ⊙ gradient`.
    pub(crate) fn from_gradient(
        method: VaRMethod,
        var: f64,
        allocation: &DVector<f64>,
        gradient: DVector<f64>,
    ) -> Self {
        let contributions = allocation.component_mul(&gradient);
        Self {
            method,
            var,
            gradient,
            contributions,
        }
    }

    /// Sum of contributions.
    pub fn total_contribution(&self) -> f64 {
        self.contributions.sum()
    }

    /// Difference between the summed contributions and VaR.
    pub fn euler_residual(&self) -> f64 {
        self.total_contribution() - self.var
    }

    /// Number of assets.
    pub fn assets(&self) -> usize {
        self.contributions.len()
    }
}

impl std::fmt::Display for VaRContributions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VaR[{}]: {:.6} (sum of contributions {:.6})",
            self.method,
            self.var,
            self.total_contribution()
        )
    }
}

/// Tuning of the empirical estimators.
///
/// Both values change the naive/refined error materially; the defaults are
/// the reference settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Finite-difference step `ε` of the naive estimator.
    pub perturbation: f64,
    /// Kernel bandwidth is `S / bandwidth_divisor` in the refined estimator.
    pub bandwidth_divisor: f64,
}

impl EstimatorConfig {
    /// Reference finite-difference step.
    pub const DEFAULT_PERTURBATION: f64 = 0.01;
    /// Reference bandwidth divisor.
    pub const DEFAULT_BANDWIDTH_DIVISOR: f64 = 700.0;

    /// Kernel bandwidth for `scenarios` scenarios.
    pub fn bandwidth(&self, scenarios: usize) -> f64 {
        scenarios as f64 / self.bandwidth_divisor
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            perturbation: Self::DEFAULT_PERTURBATION,
            bandwidth_divisor: Self::DEFAULT_BANDWIDTH_DIVISOR,
        }
    }
}

fn ensure_same_assets(
    context: &'static str,
    expected: usize,
    allocation: &DVector<f64>,
) -> RiskResult<()> {
    if allocation.len() != expected {
        return Err(RiskError::invalid_input(
            context,
            format!("expected {expected} weights, got {}", allocation.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contributions_from_gradient() {
        let a = DVector::from_vec(vec![2.0, 0.0, -1.0]);
        let g = DVector::from_vec(vec![0.5, 3.0, 1.0]);
        let result = VaRContributions::from_gradient(VaRMethod::Naive, 0.0, &a, g);
        assert_eq!(result.contributions.as_slice(), &[1.0, 0.0, -1.0]);
        assert_eq!(result.total_contribution(), 0.0);
        assert_eq!(result.assets(), 3);
    }

    #[test]
    fn test_default_estimator_config() {
        let config = EstimatorConfig::default();
        assert_eq!(config.perturbation, 0.01);
        assert_eq!(config.bandwidth(70_000), 100.0);
    }
}
