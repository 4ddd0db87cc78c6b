//! Empirical VaR with finite-difference contributions.
//!
//! VaR is the `(1 - c)` percentile of simulated P&L (linear interpolation
//! between order statistics). Each partial derivative is a one-sided
//! difference of that percentile after bumping one allocation weight by
//! `ε`. The empirical percentile is a step function of the allocation, so
//! these gradients are noisy; the estimator is kept as a baseline for the
//! refined one and its error is measured, not suppressed.

use nalgebra::DVector;
use tracing::{debug, debug_span};
use varcontrib_math::statistics::{percentile, percentile_of_sorted, total_cmp};

use super::{ensure_same_assets, VaRContributions, VaRMethod};
use crate::error::{RiskError, RiskResult};
use crate::market::ConfidenceLevel;
use crate::scenarios::ScenarioSet;

/// Calculate empirical VaR as the `(1 - c)` percentile of P&L.
pub fn empirical_var(pnl: &DVector<f64>, confidence: ConfidenceLevel) -> RiskResult<f64> {
    Ok(percentile(pnl.as_slice(), confidence.tail_probability() * 100.0)?)
}

/// Calculate naive empirical VaR contributions.
///
/// For each asset `n`, `∂VaR/∂a_n ≈ (VaR(a + ε e_n) - VaR(a)) / ε`.
///
/// # Errors
///
/// Returns `InvalidInput` if the allocation length does not match the
/// scenarios or `ε` is zero or non-finite.
pub fn naive_contributions(
    scenarios: &ScenarioSet,
    allocation: &DVector<f64>,
    confidence: ConfidenceLevel,
    perturbation: f64,
) -> RiskResult<VaRContributions> {
    ensure_same_assets("naive estimator allocation", scenarios.assets(), allocation)?;
    if perturbation == 0.0 || !perturbation.is_finite() {
        return Err(RiskError::invalid_input(
            "naive estimator perturbation",
            format!("must be finite and non-zero, got {perturbation}"),
        ));
    }

    let _span = debug_span!("naive_estimator", assets = allocation.len()).entered();
    let percent = confidence.tail_probability() * 100.0;
    let pnl = scenarios.portfolio_pnl(allocation)?;
    let var = empirical_var(&pnl, confidence)?;

    let matrix = scenarios.matrix();
    let mut bumped = vec![0.0; pnl.len()];
    let mut gradient = DVector::zeros(allocation.len());
    for n in 0..allocation.len() {
        // Ψ_up = M (a + ε e_n) = Ψ + ε M[:, n]
        for (slot, (base, x)) in bumped.iter_mut().zip(pnl.iter().zip(matrix.column(n).iter())) {
            *slot = base + perturbation * x;
        }
        bumped.sort_unstable_by(total_cmp);
        let var_up = percentile_of_sorted(&bumped, percent)?;
        gradient[n] = (var_up - var) / perturbation;
    }

    let result = VaRContributions::from_gradient(VaRMethod::Naive, var, allocation, gradient);
    debug!(var = result.var, residual = result.euler_residual(), "naive VaR");
    Ok(result)
}
