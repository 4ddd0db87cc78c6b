//! End-to-end VaR contribution analysis.
//!
//! [`VaRContributionAnalysis`] turns an [`AnalysisConfig`] into a market and
//! allocation, simulates scenarios, runs the three estimators and scores the
//! empirical ones against the closed form.

use std::time::Instant;

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::comparison::ContributionComparison;
use crate::config::{AnalysisConfig, Validate};
use crate::error::RiskResult;
use crate::market::{ConfidenceLevel, DemoMarket, MarketModel};
use crate::scenarios::ScenarioGenerator;
use crate::var::{analytical_contributions, naive_contributions, refined_contributions, VaRMethod};

/// Offset between the market seed and the scenario seed, so a demo market
/// and its scenarios never share a random stream.
const SCENARIO_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Number of assets `N`.
    pub assets: usize,
    /// Number of scenarios `S`.
    pub simulations: usize,
    /// Student-t degrees of freedom `ν`.
    pub degrees_of_freedom: f64,
    /// Confidence level `c`.
    pub confidence: ConfidenceLevel,
    /// Seed actually used, drawn from the OS when the config had none.
    pub seed: u64,
    /// Finite-difference step of the naive estimator.
    pub perturbation: f64,
    /// Kernel bandwidth of the refined estimator, in ranks.
    pub bandwidth: f64,
    /// Allocation analysed.
    pub allocation: DVector<f64>,
    /// Estimates and their errors.
    pub comparison: ContributionComparison,
}

impl AnalysisReport {
    /// VaR of one estimator.
    pub fn var(&self, method: VaRMethod) -> f64 {
        self.comparison.estimate(method).var
    }

    /// The three methods in reporting order.
    pub fn methods() -> [VaRMethod; 3] {
        [VaRMethod::Analytical, VaRMethod::Naive, VaRMethod::Refined]
    }
}

/// A configured analysis, ready to run.
#[derive(Debug, Clone)]
pub struct VaRContributionAnalysis {
    config: AnalysisConfig,
    confidence: ConfidenceLevel,
    market: MarketModel,
    allocation: DVector<f64>,
    seed: u64,
}

impl VaRContributionAnalysis {
    /// Validates `config` and builds the market and allocation.
    ///
    /// Without an explicit market a [`DemoMarket`] is generated from the
    /// seed. An explicit market without an allocation gets equal weights.
    ///
    /// # Errors
    ///
    /// Returns `Config` with every validation failure, or `InvalidInput`
    /// if the market parameters are rejected by [`MarketModel::new`].
    pub fn new(config: AnalysisConfig) -> RiskResult<Self> {
        config.validate_or_error()?;
        let confidence = config.confidence_level()?;
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());

        let (market, default_allocation) = match &config.market {
            Some(explicit) => {
                let market = explicit.to_model(config.degrees_of_freedom)?;
                let n = market.assets();
                (market, DVector::from_element(n, 1.0 / n as f64))
            }
            None => {
                let demo = DemoMarket::generate(config.assets, config.degrees_of_freedom, seed)?;
                (demo.model, demo.allocation)
            }
        };
        let allocation = config
            .allocation
            .as_ref()
            .map_or(default_allocation, |a| DVector::from_column_slice(a));
        market.check_allocation(&allocation)?;

        debug!(
            assets = market.assets(),
            seed,
            explicit_market = config.market.is_some(),
            "analysis configured"
        );

        Ok(Self {
            config,
            confidence,
            market,
            allocation,
            seed,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Market model of the run.
    pub fn market(&self) -> &MarketModel {
        &self.market
    }

    /// Allocation of the run.
    pub fn allocation(&self) -> &DVector<f64> {
        &self.allocation
    }

    /// Seed of the run.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs the analysis with the scenario stream derived from the seed.
    pub fn run(&self) -> RiskResult<AnalysisReport> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(SCENARIO_STREAM));
        self.run_with_rng(&mut rng)
    }

    /// Runs the analysis drawing scenarios from `rng`.
    pub fn run_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> RiskResult<AnalysisReport> {
        let span = info_span!(
            "var_contribution_analysis",
            assets = self.market.assets(),
            simulations = self.config.simulations
        );
        let _guard = span.enter();
        let estimators = self.config.estimators;

        let started = Instant::now();
        let generator = ScenarioGenerator::new(&self.market, self.config.simulations)?;
        let scenarios = generator.generate(rng);
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "sampler");

        let started = Instant::now();
        let analytical = analytical_contributions(&self.market, &self.allocation, self.confidence)?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "analytical estimator");

        let started = Instant::now();
        let naive = naive_contributions(
            &scenarios,
            &self.allocation,
            self.confidence,
            estimators.perturbation,
        )?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "naive estimator");

        let started = Instant::now();
        let bandwidth = estimators.bandwidth(scenarios.count());
        let refined = refined_contributions(&scenarios, &self.allocation, self.confidence, bandwidth)?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "refined estimator");

        let comparison = ContributionComparison::new(analytical, naive, refined)?;
        info!(
            var = comparison.analytical.var,
            naive_mse = comparison.naive_mse,
            refined_mse = comparison.refined_mse,
            "analysis complete"
        );

        Ok(AnalysisReport {
            assets: self.market.assets(),
            simulations: scenarios.count(),
            degrees_of_freedom: self.market.degrees_of_freedom(),
            confidence: self.confidence,
            seed: self.seed,
            perturbation: estimators.perturbation,
            bandwidth,
            allocation: self.allocation.clone(),
            comparison,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketSpec;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            assets: 5,
            simulations: 4_000,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            simulations: 3,
            ..AnalysisConfig::default()
        };
        assert!(VaRContributionAnalysis::new(config).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_run_is_reproducible() {
        let analysis = VaRContributionAnalysis::new(small_config()).unwrap();
        let first = analysis.run().unwrap();
        let second = analysis.run().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.assets, 5);
        assert_eq!(first.seed, 42);
        assert!((first.bandwidth - 4_000.0 / 700.0).abs() < 1e-12);
    }

    #[test]
    fn test_explicit_market_gets_equal_weights() {
        let config = AnalysisConfig {
            market: Some(MarketSpec {
                mean: vec![0.0, 0.0],
                covariance: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            }),
            ..small_config()
        };
        let analysis = VaRContributionAnalysis::new(config).unwrap();
        assert_eq!(analysis.allocation().as_slice(), &[0.5, 0.5]);

        let report = analysis.run().unwrap();
        let euler = report.comparison.refined.euler_residual();
        assert!(euler.abs() < 1e-12);
    }

    #[test]
    fn test_explicit_market_rejected_when_not_psd() {
        let config = AnalysisConfig {
            market: Some(MarketSpec {
                mean: vec![0.0, 0.0],
                covariance: vec![vec![1.0, 3.0], vec![3.0, 1.0]],
            }),
            ..small_config()
        };
        assert!(VaRContributionAnalysis::new(config).unwrap_err().is_invalid_input());
    }
}
