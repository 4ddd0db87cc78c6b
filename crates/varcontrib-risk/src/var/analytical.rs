//! Closed-form VaR under the multivariate Student-t market.

use nalgebra::DVector;
use tracing::debug;
use varcontrib_math::distributions::student_t_quantile;

use super::{VaRContributions, VaRMethod};
use crate::error::{RiskError, RiskResult};
use crate::market::{ConfidenceLevel, MarketModel};

const ESTIMATOR: &str = "analytical";

/// Student-t quantile `t⁻¹(1 - c; ν)` for the market's degrees of freedom.
fn tail_quantile(market: &MarketModel, confidence: ConfidenceLevel) -> RiskResult<f64> {
    Ok(student_t_quantile(
        confidence.tail_probability(),
        market.degrees_of_freedom(),
    )?)
}

/// Calculate analytical VaR.
///
/// `VaR = μᵗa + t⁻¹(1 - c; ν) · sqrt(aᵗΣa)`
///
/// A zero-variance portfolio is well defined here and returns `μᵗa`.
///
/// # Example
///
/// ```rust
/// use nalgebra::DVector;
/// use varcontrib_risk::market::{ConfidenceLevel, MarketModel};
/// use varcontrib_risk::var::analytical_var;
///
/// let market = MarketModel::from_slices(&[0.0, 0.0], &[1.0, 0.0, 0.0, 1.0], 10.0).unwrap();
/// let a = DVector::from_vec(vec![1.0, 0.0]);
/// let var = analytical_var(&market, &a, ConfidenceLevel::new(0.95).unwrap()).unwrap();
/// assert!((var + 1.8125).abs() < 1e-3);
/// ```
pub fn analytical_var(
    market: &MarketModel,
    allocation: &DVector<f64>,
    confidence: ConfidenceLevel,
) -> RiskResult<f64> {
    let location = market.portfolio_mean(allocation)?;
    let variance = market.portfolio_variance(allocation)?;
    let q = tail_quantile(market, confidence)?;
    Ok(location + q * variance.max(0.0).sqrt())
}

/// Calculate the analytical VaR gradient.
///
/// `∇VaR = μ + t⁻¹(1 - c; ν) · Σa / sqrt(aᵗΣa)`
///
/// # Errors
///
/// Returns `DegenerateComputation` when `aᵗΣa ≤ 0`: the gradient divides
/// by the portfolio standard deviation.
pub fn analytical_gradient(
    market: &MarketModel,
    allocation: &DVector<f64>,
    confidence: ConfidenceLevel,
) -> RiskResult<DVector<f64>> {
    let variance = market.portfolio_variance(allocation)?;
    if !(variance > 0.0) {
        return Err(RiskError::degenerate(
            ESTIMATOR,
            format!("portfolio variance aᵗΣa = {variance:e}, gradient divides by zero"),
        ));
    }
    let q = tail_quantile(market, confidence)?;
    let sigma_a = market.covariance() * allocation;
    Ok(market.mean() + sigma_a * (q / variance.sqrt()))
}

/// Calculate analytical VaR and its contributions `a ⊙ ∇VaR`.
///
/// The contributions sum to VaR exactly (up to rounding).
pub fn analytical_contributions(
    market: &MarketModel,
    allocation: &DVector<f64>,
    confidence: ConfidenceLevel,
) -> RiskResult<VaRContributions> {
    let var = analytical_var(market, allocation, confidence)?;
    let gradient = analytical_gradient(market, allocation, confidence)?;
    let result = VaRContributions::from_gradient(VaRMethod::Analytical, var, allocation, gradient);
    debug!(var = result.var, residual = result.euler_residual(), "analytical VaR");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const T_05_10: f64 = -1.812_461_122_8;

    fn identity_market() -> MarketModel {
        MarketModel::from_slices(&[0.0, 0.0], &[1.0, 0.0, 0.0, 1.0], 10.0).unwrap()
    }

    fn c95() -> ConfidenceLevel {
        ConfidenceLevel::new(0.95).unwrap()
    }

    #[test]
    fn test_single_unallocated_uncorrelated_asset() {
        let a = DVector::from_vec(vec![1.0, 0.0]);
        let result = analytical_contributions(&identity_market(), &a, c95()).unwrap();

        assert_relative_eq!(result.var, T_05_10, epsilon = 1e-4);
        assert_relative_eq!(result.contributions[0], T_05_10, epsilon = 1e-4);
        assert_eq!(result.contributions[1], 0.0);
    }

    #[test]
    fn test_zero_allocation_is_degenerate() {
        let a = DVector::from_vec(vec![0.0, 0.0]);
        let market = identity_market();

        assert_eq!(analytical_var(&market, &a, c95()).unwrap(), 0.0);

        let err = analytical_gradient(&market, &a, c95()).unwrap_err();
        assert!(err.is_degenerate());
        assert!(analytical_contributions(&market, &a, c95()).unwrap_err().is_degenerate());
    }

    #[test]
    fn test_zero_variance_through_singular_covariance() {
        // Long/short the same perfectly correlated risk
        let market = MarketModel::from_slices(&[0.1, 0.1], &[1.0, 1.0, 1.0, 1.0], 5.0).unwrap();
        let a = DVector::from_vec(vec![1.0, -1.0]);
        assert!(analytical_gradient(&market, &a, c95()).unwrap_err().is_degenerate());
    }

    #[test]
    fn test_euler_identity() {
        let market = MarketModel::from_slices(
            &[0.01, -0.02, 0.005],
            &[0.04, 0.01, -0.006, 0.01, 0.09, 0.012, -0.006, 0.012, 0.0225],
            4.5,
        )
        .unwrap();
        for a in [
            vec![0.2, 0.5, 0.3],
            vec![1.0, -2.0, 0.5],
            vec![-0.3, 0.0, 4.0],
        ] {
            let a = DVector::from_vec(a);
            let result =
                analytical_contributions(&market, &a, ConfidenceLevel::new(0.99).unwrap()).unwrap();
            assert_relative_eq!(result.total_contribution(), result.var, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let market =
            MarketModel::from_slices(&[0.01, 0.02], &[0.04, 0.012, 0.012, 0.09], 7.0).unwrap();
        let a = DVector::from_vec(vec![0.6, 0.4]);
        let c = ConfidenceLevel::new(0.99).unwrap();
        let gradient = analytical_gradient(&market, &a, c).unwrap();

        let h = 1e-6;
        for n in 0..2 {
            let mut up = a.clone();
            let mut down = a.clone();
            up[n] += h;
            down[n] -= h;
            let fd = (analytical_var(&market, &up, c).unwrap()
                - analytical_var(&market, &down, c).unwrap())
                / (2.0 * h);
            assert_relative_eq!(gradient[n], fd, epsilon = 1e-6);
        }
    }
}
