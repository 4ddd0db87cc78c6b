//! Probability distributions.
//!
//! Thin, validated wrappers over `statrs` (densities, CDFs, quantiles) and
//! `rand_distr` (sampling). The multivariate Student-t sampler combines a
//! correlated Gaussian draw with an independent chi-squared mixing variable.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{ChiSquared, Distribution, StandardNormal};
use statrs::distribution::{
    ChiSquared as ChiSquaredLaw, Continuous, ContinuousCDF, Normal, StudentsT,
};

use crate::error::{MathError, MathResult};
use crate::linear_algebra::psd_factor;

fn ensure_probability(p: f64) -> MathResult<()> {
    if !(p > 0.0 && p < 1.0) {
        return Err(MathError::invalid_input(format!(
            "probability must lie in (0, 1), got {p}"
        )));
    }
    Ok(())
}

/// Quantile function of the standard Student-t distribution.
///
/// # Example
///
/// ```rust
/// use varcontrib_math::distributions::student_t_quantile;
///
/// let q = student_t_quantile(0.05, 10.0).unwrap();
/// assert!((q + 1.8125).abs() < 1e-3);
/// ```
pub fn student_t_quantile(p: f64, degrees_of_freedom: f64) -> MathResult<f64> {
    ensure_probability(p)?;
    let law = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map_err(|e| MathError::distribution("Student-t", e))?;
    Ok(law.inverse_cdf(p))
}

/// Gaussian density with a fixed location and scale.
///
/// Built once and evaluated many times, e.g. for every rank of a
/// smoothing kernel.
#[derive(Debug, Clone, Copy)]
pub struct NormalDensity {
    law: Normal,
}

impl NormalDensity {
    /// Creates a normal density with the given mean and standard deviation.
    pub fn new(mean: f64, std_dev: f64) -> MathResult<Self> {
        let law = Normal::new(mean, std_dev).map_err(|e| MathError::distribution("normal", e))?;
        Ok(Self { law })
    }

    /// Density at `x`.
    pub fn pdf(&self, x: f64) -> f64 {
        self.law.pdf(x)
    }

    /// Cumulative probability at `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        self.law.cdf(x)
    }
}

/// Density of `N(mean, std_dev²)` at `x`.
pub fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> MathResult<f64> {
    Ok(NormalDensity::new(mean, std_dev)?.pdf(x))
}

/// Upper-tail probability `P(X > x)` of a chi-squared distribution.
pub fn chi_squared_sf(x: f64, degrees_of_freedom: f64) -> MathResult<f64> {
    let law = ChiSquaredLaw::new(degrees_of_freedom)
        .map_err(|e| MathError::distribution("chi-squared", e))?;
    Ok(law.sf(x))
}

/// Standard multivariate Student-t distribution with a correlation (scale)
/// matrix `C` and `ν` degrees of freedom.
///
/// A draw is `L z · sqrt(ν / w)` with `L Lᵗ = C`, `z ~ N(0, I)` and
/// `w ~ χ²(ν)`. Every marginal is a standard Student-t(ν).
#[derive(Debug, Clone)]
pub struct MultivariateStudentT {
    factor: DMatrix<f64>,
    degrees_of_freedom: f64,
    mixing: ChiSquared<f64>,
}

impl MultivariateStudentT {
    /// Creates the distribution from a correlation matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix has no PSD square-root factor or the
    /// degrees of freedom are not positive and finite.
    pub fn new(correlation: &DMatrix<f64>, degrees_of_freedom: f64) -> MathResult<Self> {
        if !(degrees_of_freedom > 0.0 && degrees_of_freedom.is_finite()) {
            return Err(MathError::invalid_input(format!(
                "degrees of freedom must be positive and finite, got {degrees_of_freedom}"
            )));
        }
        let factor = psd_factor(correlation)?;
        let mixing = ChiSquared::new(degrees_of_freedom)
            .map_err(|e| MathError::distribution("chi-squared", e))?;
        Ok(Self {
            factor,
            degrees_of_freedom,
            mixing,
        })
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.factor.nrows()
    }

    /// Degrees of freedom.
    pub fn degrees_of_freedom(&self) -> f64 {
        self.degrees_of_freedom
    }

    /// Draws one vector.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let n = self.dimension();
        let gaussian: DVector<f64> = DVector::from_fn(n, |_, _| StandardNormal.sample(rng));
        let w: f64 = self.mixing.sample(rng);
        let scale = (self.degrees_of_freedom / w).sqrt();
        (&self.factor * gaussian) * scale
    }
}
