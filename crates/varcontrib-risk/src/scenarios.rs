//! Scenario generation from the market model.
//!
//! Draws a matrix of joint asset outcomes from a multivariate Student-t
//! market. By default half of the rows are drawn and the other half are
//! their negations, so the sample of standardized shocks has exactly zero
//! mean and no skew.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use tracing::debug;
use varcontrib_math::distributions::MultivariateStudentT;
use varcontrib_math::linear_algebra::covariance_to_correlation;

use crate::error::{RiskError, RiskResult};
use crate::market::MarketModel;

/// Simulated joint asset outcomes, one scenario per row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSet {
    scenarios: DMatrix<f64>,
}

impl ScenarioSet {
    /// Wraps an existing `S × N` matrix of scenarios.
    pub fn from_matrix(scenarios: DMatrix<f64>) -> RiskResult<Self> {
        if scenarios.nrows() == 0 || scenarios.ncols() == 0 {
            return Err(RiskError::invalid_input(
                "scenario set",
                "scenario matrix is empty",
            ));
        }
        Ok(Self { scenarios })
    }

    /// Number of scenarios `S`.
    pub fn count(&self) -> usize {
        self.scenarios.nrows()
    }

    /// Number of assets `N`.
    pub fn assets(&self) -> usize {
        self.scenarios.ncols()
    }

    /// The `S × N` scenario matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.scenarios
    }

    /// Portfolio P&L per scenario, `Ψ = M a`.
    pub fn portfolio_pnl(&self, allocation: &DVector<f64>) -> RiskResult<DVector<f64>> {
        if allocation.len() != self.assets() {
            return Err(RiskError::invalid_input(
                "allocation",
                format!("expected {} weights, got {}", self.assets(), allocation.len()),
            ));
        }
        Ok(&self.scenarios * allocation)
    }

    /// Column means of the scenario matrix.
    pub fn empirical_mean(&self) -> DVector<f64> {
        self.scenarios.row_mean().transpose()
    }
}

/// Draws [`ScenarioSet`]s from a [`MarketModel`].
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    mean: DVector<f64>,
    std_devs: DVector<f64>,
    shocks: MultivariateStudentT,
    count: usize,
    antithetic: bool,
}

impl ScenarioGenerator {
    /// Creates a generator producing `count` scenarios per draw.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `count` is zero or odd: symmetrized
    /// sampling needs an even number of rows and the count is never
    /// rounded silently.
    pub fn new(market: &MarketModel, count: usize) -> RiskResult<Self> {
        if count == 0 || count % 2 != 0 {
            return Err(RiskError::invalid_input(
                "scenario generator",
                format!("scenario count must be a positive even number, got {count}"),
            ));
        }

        let (std_devs, correlation) = covariance_to_correlation(market.covariance())?;
        let shocks = MultivariateStudentT::new(&correlation, market.degrees_of_freedom())?;

        Ok(Self {
            mean: market.mean().clone(),
            std_devs,
            shocks,
            count,
            antithetic: true,
        })
    }

    /// Enables or disables antithetic symmetrization.
    ///
    /// Without it, all `count` rows are independent draws.
    #[must_use]
    pub fn with_antithetic(mut self, antithetic: bool) -> Self {
        self.antithetic = antithetic;
        self
    }

    /// Number of scenarios per draw.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Draws a scenario set, `M = 1 μᵗ + X D`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> ScenarioSet {
        let n = self.mean.len();
        let half = self.count / 2;
        let mut scenarios = DMatrix::zeros(self.count, n);

        if self.antithetic {
            for row in 0..half {
                let x = self.shocks.sample(rng);
                for j in 0..n {
                    let scaled = x[j] * self.std_devs[j];
                    scenarios[(row, j)] = self.mean[j] + scaled;
                    scenarios[(row + half, j)] = self.mean[j] - scaled;
                }
            }
        } else {
            for row in 0..self.count {
                let x = self.shocks.sample(rng);
                for j in 0..n {
                    scenarios[(row, j)] = self.mean[j] + x[j] * self.std_devs[j];
                }
            }
        }

        debug!(
            scenarios = self.count,
            assets = n,
            antithetic = self.antithetic,
            "generated scenario matrix"
        );
        ScenarioSet { scenarios }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn market() -> MarketModel {
        MarketModel::from_slices(&[0.5, -1.0], &[4.0, 0.6, 0.6, 1.0], 6.0).unwrap()
    }

    #[test]
    fn test_odd_count_rejected() {
        let err = ScenarioGenerator::new(&market(), 101).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(ScenarioGenerator::new(&market(), 0).is_err());
    }

    #[test]
    fn test_shape_and_symmetry() {
        let gen = ScenarioGenerator::new(&market(), 1000).unwrap();
        let set = gen.generate(&mut StdRng::seed_from_u64(1));
        assert_eq!(set.count(), 1000);
        assert_eq!(set.assets(), 2);

        let m = set.matrix();
        for row in 0..500 {
            for j in 0..2 {
                let mu = market().mean()[j];
                assert_relative_eq!(m[(row, j)] - mu, -(m[(row + 500, j)] - mu), epsilon = 1e-12);
            }
        }

        let mean = set.empirical_mean();
        assert_relative_eq!(mean[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(mean[1], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_same_seed_same_scenarios() {
        let gen = ScenarioGenerator::new(&market(), 200).unwrap();
        let a = gen.generate(&mut StdRng::seed_from_u64(9));
        let b = gen.generate(&mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_portfolio_pnl() {
        let set = ScenarioSet::from_matrix(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        let pnl = set.portfolio_pnl(&DVector::from_vec(vec![1.0, -1.0])).unwrap();
        assert_eq!(pnl.as_slice(), &[-1.0, -1.0]);
        assert!(set.portfolio_pnl(&DVector::zeros(3)).is_err());
    }
}
