//! Integration tests for the VaR contribution estimators.
//!
//! Closed-form reference cases, convergence of the empirical estimators and
//! the accuracy ordering of naive against refined contributions.

use approx::assert_relative_eq;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;

use varcontrib_risk::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

fn three_asset_market() -> MarketModel {
    MarketModel::from_slices(
        &[0.01, -0.005, 0.02],
        &[
            0.040, 0.012, -0.004, //
            0.012, 0.090, 0.018, //
            -0.004, 0.018, 0.0225,
        ],
        10.0,
    )
    .unwrap()
}

fn confidence(c: f64) -> ConfidenceLevel {
    ConfidenceLevel::new(c).unwrap()
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_single_allocated_asset_matches_student_t_quantile() {
    let market = MarketModel::from_slices(&[0.0, 0.0], &[1.0, 0.0, 0.0, 1.0], 10.0).unwrap();
    let a = DVector::from_vec(vec![1.0, 0.0]);

    let result = analytical_contributions(&market, &a, confidence(0.95)).unwrap();

    assert_relative_eq!(result.var, -1.812, epsilon = 1e-3);
    assert_relative_eq!(result.contributions[0], -1.812, epsilon = 1e-3);
    assert_relative_eq!(result.contributions[1], 0.0);
}

#[test]
fn test_empty_allocation_has_zero_var_and_no_gradient() {
    let market = MarketModel::from_slices(&[0.0, 0.0], &[1.0, 0.0, 0.0, 1.0], 10.0).unwrap();
    let a = DVector::from_vec(vec![0.0, 0.0]);

    assert_eq!(analytical_var(&market, &a, confidence(0.95)).unwrap(), 0.0);
    let err = analytical_gradient(&market, &a, confidence(0.95)).unwrap_err();
    assert!(matches!(err, RiskError::DegenerateComputation { .. }));
}

#[test]
fn test_analytical_euler_identity() {
    let market = three_asset_market();
    let a = DVector::from_vec(vec![0.3, 0.5, 0.2]);
    let result = analytical_contributions(&market, &a, confidence(0.99)).unwrap();
    assert_relative_eq!(result.total_contribution(), result.var, epsilon = 1e-12);
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_empirical_var_converges_to_analytical() {
    let market = three_asset_market();
    let a = DVector::from_vec(vec![0.3, 0.5, 0.2]);
    let c = confidence(0.99);
    let count = 100_000;

    let reference = analytical_var(&market, &a, c).unwrap();
    let scenarios = ScenarioGenerator::new(&market, count)
        .unwrap()
        .generate(&mut StdRng::seed_from_u64(2024));
    let config = EstimatorConfig::default();

    let naive = naive_contributions(&scenarios, &a, c, config.perturbation).unwrap();
    let refined = refined_contributions(&scenarios, &a, c, config.bandwidth(count)).unwrap();

    assert_relative_eq!(naive.var, reference, max_relative = 0.05);
    assert_relative_eq!(refined.var, reference, max_relative = 0.05);
    assert_relative_eq!(refined.total_contribution(), refined.var, epsilon = 1e-10);
}

#[test]
fn test_refined_contributions_beat_naive() {
    for seed in [1_u64, 2, 3] {
        // Reference setup: 40 assets, 100k scenarios
        let config = AnalysisConfig {
            seed: Some(seed),
            ..AnalysisConfig::default()
        };
        let report = VaRContributionAnalysis::new(config).unwrap().run().unwrap();
        let c = &report.comparison;
        assert!(
            c.refined_mse < c.naive_mse,
            "seed {seed}: refined MSE {:e} should be below naive MSE {:e}",
            c.refined_mse,
            c.naive_mse
        );
        assert_relative_eq!(c.refined.total_contribution(), c.refined.var, epsilon = 1e-10);
    }
}

// ============================================================================
// Sampler
// ============================================================================

#[test]
fn test_symmetrization_reduces_mean_error() {
    let market = three_asset_market();
    let mu = market.mean().clone();
    let seeds = 0..20_u64;

    let mut symmetric = 0.0;
    let mut plain = 0.0;
    for seed in seeds.clone() {
        let generator = ScenarioGenerator::new(&market, 2_000).unwrap();
        let set = generator.generate(&mut StdRng::seed_from_u64(seed));
        symmetric += (set.empirical_mean() - &mu).norm();

        let generator = generator.with_antithetic(false);
        let set = generator.generate(&mut StdRng::seed_from_u64(seed));
        plain += (set.empirical_mean() - &mu).norm();
    }

    let n = seeds.count() as f64;
    assert!(symmetric / n < plain / n);
    assert!(symmetric / n < 1e-12);
}

#[test]
fn test_odd_scenario_count_is_rejected() {
    let err = ScenarioGenerator::new(&three_asset_market(), 9_999).unwrap_err();
    assert!(err.is_invalid_input());
}
