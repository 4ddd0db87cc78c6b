//! Market model parameters.
//!
//! A [`MarketModel`] is a location vector, a dispersion (covariance) matrix
//! and the degrees of freedom of a multivariate Student-t distribution.
//! All invariants are checked at construction.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use varcontrib_math::linear_algebra::{
    ensure_positive_semi_definite, quadratic_form, DEFAULT_TOLERANCE,
};

use crate::error::{RiskError, RiskResult};

/// Confidence level `c` of a VaR estimate, strictly inside `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    /// Creates a confidence level.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless `0 < c < 1`.
    pub fn new(c: f64) -> RiskResult<Self> {
        if !(c > 0.0 && c < 1.0) {
            return Err(RiskError::invalid_input(
                "confidence level",
                format!("must lie in (0, 1), got {c}"),
            ));
        }
        Ok(Self(c))
    }

    /// The confidence level `c`.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Lower-tail probability `1 - c`.
    pub fn tail_probability(self) -> f64 {
        1.0 - self.0
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = RiskError;

    fn try_from(c: f64) -> RiskResult<Self> {
        Self::new(c)
    }
}

impl From<ConfidenceLevel> for f64 {
    fn from(c: ConfidenceLevel) -> f64 {
        c.0
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.0 * 100.0)
    }
}

/// Multivariate Student-t market model.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketModel {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    degrees_of_freedom: f64,
}

impl MarketModel {
    /// Creates a market model.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if there are no assets, dimensions disagree,
    /// values are non-finite, the covariance is not symmetric PSD, or the
    /// degrees of freedom are not positive.
    pub fn new(
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        degrees_of_freedom: f64,
    ) -> RiskResult<Self> {
        let n = mean.len();
        if n == 0 {
            return Err(RiskError::invalid_input("market model", "no assets"));
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::invalid_input(
                "market mean",
                "contains non-finite values",
            ));
        }
        if covariance.nrows() != n || covariance.ncols() != n {
            return Err(RiskError::invalid_input(
                "market covariance",
                format!(
                    "expected {n}x{n}, got {}x{}",
                    covariance.nrows(),
                    covariance.ncols()
                ),
            ));
        }
        ensure_positive_semi_definite(&covariance, DEFAULT_TOLERANCE)
            .map_err(|e| RiskError::invalid_input("market covariance", e.to_string()))?;
        if !(degrees_of_freedom > 0.0 && degrees_of_freedom.is_finite()) {
            return Err(RiskError::invalid_input(
                "degrees of freedom",
                format!("must be positive and finite, got {degrees_of_freedom}"),
            ));
        }

        Ok(Self {
            mean,
            covariance,
            degrees_of_freedom,
        })
    }

    /// Creates a model from row-major covariance data.
    pub fn from_slices(mean: &[f64], covariance: &[f64], degrees_of_freedom: f64) -> RiskResult<Self> {
        let n = mean.len();
        if covariance.len() != n * n {
            return Err(RiskError::invalid_input(
                "market covariance",
                format!("expected {} entries, got {}", n * n, covariance.len()),
            ));
        }
        Self::new(
            DVector::from_column_slice(mean),
            DMatrix::from_row_slice(n, n, covariance),
            degrees_of_freedom,
        )
    }

    /// Number of assets `N`.
    pub fn assets(&self) -> usize {
        self.mean.len()
    }

    /// Location vector `μ`.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Dispersion matrix `Σ`.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Degrees of freedom `ν`.
    pub fn degrees_of_freedom(&self) -> f64 {
        self.degrees_of_freedom
    }

    /// Checks that an allocation matches the model dimension and is finite.
    pub fn check_allocation(&self, allocation: &DVector<f64>) -> RiskResult<()> {
        if allocation.len() != self.assets() {
            return Err(RiskError::invalid_input(
                "allocation",
                format!("expected {} weights, got {}", self.assets(), allocation.len()),
            ));
        }
        if allocation.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::invalid_input(
                "allocation",
                "contains non-finite values",
            ));
        }
        Ok(())
    }

    /// Portfolio location `μᵗa`.
    pub fn portfolio_mean(&self, allocation: &DVector<f64>) -> RiskResult<f64> {
        self.check_allocation(allocation)?;
        Ok(self.mean.dot(allocation))
    }

    /// Portfolio dispersion `aᵗΣa`.
    pub fn portfolio_variance(&self, allocation: &DVector<f64>) -> RiskResult<f64> {
        self.check_allocation(allocation)?;
        Ok(quadratic_form(&self.covariance, allocation)?)
    }
}

/// Randomly generated market and allocation for demonstration runs.
#[derive(Debug, Clone)]
pub struct DemoMarket {
    /// Generated market model.
    pub model: MarketModel,
    /// Generated allocation, non-negative and summing to one.
    pub allocation: DVector<f64>,
}

impl DemoMarket {
    /// Scale of the loading matrix entries.
    const LOADING_VOL: f64 = 0.1;
    /// Idiosyncratic variance added to the diagonal.
    const IDIOSYNCRATIC_VAR: f64 = 0.01;
    /// Half-width of the uniform mean range.
    const MEAN_RANGE: f64 = 0.01;

    /// Generates a market with `assets` assets from a seed.
    ///
    /// Means are `U(-0.01, 0.01)`, the covariance is `B Bᵗ / N + 0.01 I`
    /// with `B_ij ~ N(0, 0.1²)`, and the allocation is `U(0, 1)`
    /// normalized to sum to one.
    pub fn generate(assets: usize, degrees_of_freedom: f64, seed: u64) -> RiskResult<Self> {
        if assets == 0 {
            return Err(RiskError::invalid_input("demo market", "no assets"));
        }
        let mut rng = StdRng::seed_from_u64(seed);

        let mean = DVector::from_fn(assets, |_, _| {
            rng.gen_range(-Self::MEAN_RANGE..Self::MEAN_RANGE)
        });

        let loading = Normal::new(0.0, Self::LOADING_VOL)
            .map_err(|e| RiskError::invalid_input("demo market", e.to_string()))?;
        let b = DMatrix::from_fn(assets, assets, |_, _| loading.sample(&mut rng));
        let mut covariance = (&b * b.transpose()) / assets as f64;
        for i in 0..assets {
            covariance[(i, i)] += Self::IDIOSYNCRATIC_VAR;
        }
        // Remove rounding asymmetry from the product
        let covariance = (&covariance + covariance.transpose()) * 0.5;

        let raw = DVector::from_fn(assets, |_, _| rng.gen::<f64>());
        let allocation = &raw / raw.sum();

        Ok(Self {
            model: MarketModel::new(mean, covariance, degrees_of_freedom)?,
            allocation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_confidence_level_bounds() {
        assert!(ConfidenceLevel::new(0.95).is_ok());
        assert!(ConfidenceLevel::new(0.0).is_err());
        assert!(ConfidenceLevel::new(1.0).is_err());
        assert!(ConfidenceLevel::new(f64::NAN).is_err());
        assert_relative_eq!(ConfidenceLevel::new(0.99).unwrap().tail_probability(), 0.01, epsilon = 1e-15);
    }

    #[test]
    fn test_market_model_validation() {
        let ok = MarketModel::from_slices(&[0.0, 0.0], &[1.0, 0.5, 0.5, 1.0], 5.0);
        assert!(ok.is_ok());

        let not_psd = MarketModel::from_slices(&[0.0, 0.0], &[1.0, 2.0, 2.0, 1.0], 5.0);
        assert!(not_psd.unwrap_err().is_invalid_input());

        let asym = MarketModel::from_slices(&[0.0, 0.0], &[1.0, 0.5, 0.4, 1.0], 5.0);
        assert!(asym.is_err());

        let bad_dof = MarketModel::from_slices(&[0.0], &[1.0], 0.0);
        assert!(bad_dof.is_err());

        let bad_shape = MarketModel::from_slices(&[0.0, 0.0], &[1.0, 0.0, 1.0], 5.0);
        assert!(bad_shape.is_err());
    }

    #[test]
    fn test_portfolio_moments() {
        let model = MarketModel::from_slices(&[0.1, -0.2], &[1.0, 0.5, 0.5, 2.0], 5.0).unwrap();
        let a = DVector::from_vec(vec![1.0, 1.0]);
        assert_relative_eq!(model.portfolio_mean(&a).unwrap(), -0.1, epsilon = 1e-15);
        assert_relative_eq!(model.portfolio_variance(&a).unwrap(), 4.0);
        assert!(model.portfolio_mean(&DVector::zeros(3)).is_err());
    }

    #[test]
    fn test_demo_market_is_reproducible() {
        let first = DemoMarket::generate(10, 10.0, 42).unwrap();
        let second = DemoMarket::generate(10, 10.0, 42).unwrap();
        assert_eq!(first.model, second.model);
        assert_relative_eq!(first.allocation.sum(), 1.0, epsilon = 1e-12);
        assert!(first.allocation.iter().all(|w| *w >= 0.0));
    }
}
