//! Kernel-smoothed empirical VaR.
//!
//! Instead of reading a single order statistic, VaR is a weighted average of
//! all sorted P&L values with Gaussian weights centered on the tail rank
//! `θ = ⌈(1 - c) S⌉`. The same weights applied to the sorted scenario matrix
//! give the gradient, so the contributions add up to VaR exactly.

use nalgebra::DVector;
use tracing::{debug, debug_span, warn};
use varcontrib_math::distributions::NormalDensity;

use super::{ensure_same_assets, VaRContributions, VaRMethod};
use crate::error::{RiskError, RiskResult};
use crate::market::ConfidenceLevel;
use crate::scenarios::ScenarioSet;

const ESTIMATOR: &str = "refined";

/// Truncated kernel mass above which a warning is logged.
const TRUNCATION_WARN: f64 = 0.01;

/// Retained kernel mass below which the kernel is considered empty.
const MIN_RETAINED_MASS: f64 = 1e-12;

/// Slack absorbed before taking the ceiling of the tail rank.
const RANK_ROUNDING: f64 = 1e-9;

/// Tail rank `θ = ⌈(1 - c) S⌉`, clamped into `[1, S]`.
///
/// `1 - 0.99` is not exactly `0.01` in binary, so products that should be
/// integral are nudged down before the ceiling.
pub fn tail_rank(confidence: ConfidenceLevel, scenarios: usize) -> usize {
    let raw = (confidence.tail_probability() * scenarios as f64 - RANK_ROUNDING).ceil();
    (raw.max(0.0) as usize).clamp(1, scenarios.max(1))
}

/// Normalized Gaussian weights over the ranks `1..=S`.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingKernel {
    weights: Vec<f64>,
    theta: usize,
    bandwidth: f64,
    truncated_mass: f64,
}

impl SmoothingKernel {
    /// Builds the kernel `k_i ∝ φ(i; θ, bandwidth)` for `i = 1..=scenarios`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty sample, a rank outside
    /// `[1, scenarios]`, or a bandwidth that is not positive and finite.
    /// Returns `DegenerateComputation` if the weights cannot be normalized.
    pub fn new(scenarios: usize, theta: usize, bandwidth: f64) -> RiskResult<Self> {
        if scenarios == 0 {
            return Err(RiskError::invalid_input("smoothing kernel", "no scenarios"));
        }
        if !(1..=scenarios).contains(&theta) {
            return Err(RiskError::invalid_input(
                "smoothing kernel",
                format!("tail rank {theta} outside [1, {scenarios}]"),
            ));
        }
        if !(bandwidth > 0.0 && bandwidth.is_finite()) {
            return Err(RiskError::invalid_input(
                "kernel bandwidth",
                format!("must be positive and finite, got {bandwidth}"),
            ));
        }

        let density = NormalDensity::new(theta as f64, bandwidth)?;
        let retained = density.cdf(scenarios as f64 + 0.5) - density.cdf(0.5);
        if !(retained >= MIN_RETAINED_MASS) {
            return Err(RiskError::degenerate(
                ESTIMATOR,
                format!("kernel retains mass {retained:e} inside [1, {scenarios}]"),
            ));
        }
        let truncated_mass = (1.0 - retained).max(0.0);

        let mut weights: Vec<f64> = (1..=scenarios).map(|i| density.pdf(i as f64)).collect();
        let total: f64 = weights.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(RiskError::degenerate(
                ESTIMATOR,
                format!("kernel normalizing sum is {total}"),
            ));
        }
        for w in &mut weights {
            *w /= total;
        }

        Ok(Self {
            weights,
            theta,
            bandwidth,
            truncated_mass,
        })
    }

    /// Weight per rank, rank `i` at index `i - 1`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Center rank `θ` (1-based).
    pub fn theta(&self) -> usize {
        self.theta
    }

    /// Standard deviation of the kernel in ranks.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Gaussian mass lying outside the sample ranks before normalization.
    pub fn truncated_mass(&self) -> f64 {
        self.truncated_mass
    }
}

/// Scenario indices ordered by ascending P&L.
///
/// The sort is stable so ties keep their scenario order.
fn rank_order(pnl: &DVector<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pnl.len()).collect();
    order.sort_by(|&i, &j| pnl[i].total_cmp(&pnl[j]));
    order
}

/// Calculate kernel-smoothed VaR contributions.
///
/// With `k` the [`SmoothingKernel`] around `θ` and `Sort_M` the scenario
/// matrix with rows ordered by portfolio P&L:
///
/// - `VaR = Σ_i k_i Ψ_(i)`
/// - `∂VaR/∂a_n = Σ_i k_i Sort_M[i, n]`
///
/// `bandwidth` is in ranks, usually [`EstimatorConfig::bandwidth`].
///
/// [`EstimatorConfig::bandwidth`]: super::EstimatorConfig::bandwidth
pub fn refined_contributions(
    scenarios: &ScenarioSet,
    allocation: &DVector<f64>,
    confidence: ConfidenceLevel,
    bandwidth: f64,
) -> RiskResult<VaRContributions> {
    ensure_same_assets("refined estimator allocation", scenarios.assets(), allocation)?;

    let count = scenarios.count();
    let _span = debug_span!("refined_estimator", scenarios = count, bandwidth).entered();

    let theta = tail_rank(confidence, count);
    let kernel = SmoothingKernel::new(count, theta, bandwidth)?;
    if kernel.truncated_mass() > TRUNCATION_WARN {
        warn!(
            truncated_mass = kernel.truncated_mass(),
            theta,
            bandwidth,
            "smoothing kernel extends well beyond the sample"
        );
    }

    let pnl = scenarios.portfolio_pnl(allocation)?;
    let order = rank_order(&pnl);
    let matrix = scenarios.matrix();

    let mut var = 0.0;
    let mut gradient = DVector::zeros(allocation.len());
    for (&row, &k) in order.iter().zip(kernel.weights()) {
        if k == 0.0 {
            continue;
        }
        var += k * pnl[row];
        gradient.axpy(k, &matrix.row(row).transpose(), 1.0);
    }

    let result = VaRContributions::from_gradient(VaRMethod::Refined, var, allocation, gradient);
    debug!(var = result.var, theta, residual = result.euler_residual(), "refined VaR");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use proptest::prelude::*;

    fn c(c: f64) -> ConfidenceLevel {
        ConfidenceLevel::new(c).unwrap()
    }

    #[test]
    fn test_tail_rank() {
        assert_eq!(tail_rank(c(0.99), 1000), 10);
        assert_eq!(tail_rank(c(0.99), 50), 1);
        assert_eq!(tail_rank(c(0.999), 10), 1);
        assert_eq!(tail_rank(c(0.5), 7), 4);
    }

    #[test]
    fn test_kernel_rejects_bad_bandwidth() {
        assert!(SmoothingKernel::new(10, 1, 0.0).unwrap_err().is_invalid_input());
        assert!(SmoothingKernel::new(10, 1, -1.0).unwrap_err().is_invalid_input());
        assert!(SmoothingKernel::new(10, 1, f64::INFINITY).unwrap_err().is_invalid_input());
        assert!(SmoothingKernel::new(10, 11, 1.0).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_kernel_with_vanishing_support_is_degenerate() {
        let err = SmoothingKernel::new(10, 1, 1e20).unwrap_err();
        assert!(err.is_degenerate());
    }

    #[test]
    fn test_narrow_kernel_picks_order_statistic() {
        let kernel = SmoothingKernel::new(10, 3, 1e-3).unwrap();
        assert_relative_eq!(kernel.weights()[2], 1.0);
        assert_eq!(kernel.weights().iter().filter(|w| **w > 0.0).count(), 1);
        assert!(kernel.truncated_mass() < 1e-12);
    }

    #[test]
    fn test_truncated_mass_at_boundary() {
        // Centered on rank 1 with a wide kernel, about half the mass falls below 0.5
        let kernel = SmoothingKernel::new(100_000, 1, 50.0).unwrap();
        assert!(kernel.truncated_mass() > 0.45 && kernel.truncated_mass() < 0.55);
    }

    #[test]
    fn test_euler_sum_is_exact() {
        let data = [
            0.3, -1.2, 0.8, //
            -0.5, 0.4, -2.0, //
            1.1, 0.9, 0.1, //
            -0.7, -0.3, 0.6, //
            0.2, 1.5, -0.4, //
            -1.8, 0.0, 0.3,
        ];
        let set = ScenarioSet::from_matrix(DMatrix::from_row_slice(6, 3, &data)).unwrap();
        let a = DVector::from_vec(vec![0.5, -1.5, 2.0]);
        let result = refined_contributions(&set, &a, c(0.8), 1.5).unwrap();
        assert_relative_eq!(result.total_contribution(), result.var, epsilon = 1e-12);
    }

    #[test]
    fn test_narrow_kernel_matches_sorted_scenario() {
        // Ψ = x for a = (1, 0); rank θ = ⌈0.25 · 4⌉ = 1 is the worst scenario
        let data = [3.0, 10.0, -4.0, 20.0, 1.0, 30.0, -1.0, 40.0];
        let set = ScenarioSet::from_matrix(DMatrix::from_row_slice(4, 2, &data)).unwrap();
        let a = DVector::from_vec(vec![1.0, 0.0]);
        let result = refined_contributions(&set, &a, c(0.75), 1e-3).unwrap();

        assert_relative_eq!(result.var, -4.0);
        assert_relative_eq!(result.gradient[0], -4.0);
        assert_relative_eq!(result.gradient[1], 20.0);
        assert_eq!(result.contributions[1], 0.0);
    }

    #[test]
    fn test_rejects_mismatched_allocation() {
        let set = ScenarioSet::from_matrix(DMatrix::from_row_slice(2, 1, &[1.0, -1.0])).unwrap();
        assert!(refined_contributions(&set, &DVector::zeros(2), c(0.9), 1.0).is_err());
    }

    proptest! {
        #[test]
        fn prop_kernel_weights_sum_to_one(
            scenarios in 1usize..5_000,
            tail in 0.0f64..1.0,
            bandwidth in 0.01f64..500.0,
        ) {
            let theta = ((tail * scenarios as f64).ceil() as usize).clamp(1, scenarios);
            let kernel = SmoothingKernel::new(scenarios, theta, bandwidth).unwrap();
            let total: f64 = kernel.weights().iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9);
            prop_assert!(kernel.weights().iter().all(|w| *w >= 0.0));
            prop_assert!((0.0..=1.0).contains(&kernel.truncated_mass()));
        }
    }
}
