//! Descriptive statistics.
//!
//! Empirical quantiles, sample moments, error metrics and autocorrelation
//! used by the VaR estimators and the time-series diagnostics.

use std::cmp::Ordering;

use crate::error::{MathError, MathResult};

/// Total order on `f64` used for every sort in this crate.
///
/// NaN sorts after all numbers so it can never be picked as a lower-tail
/// quantile by accident.
pub fn total_cmp(a: &f64, b: &f64) -> Ordering {
    a.total_cmp(b)
}

/// Percentile of a sample with linear interpolation between order
/// statistics.
///
/// `percent` is in `[0, 100]`. With the sample sorted ascending as
/// `x[0..n]`, the rank is `h = percent / 100 * (n - 1)` and the result is
/// `x[⌊h⌋] + (h - ⌊h⌋) * (x[⌊h⌋ + 1] - x[⌊h⌋])`.
///
/// # Example
///
/// ```rust
/// use varcontrib_math::statistics::percentile;
///
/// let p = percentile(&[4.0, 1.0, 3.0, 2.0, 5.0], 25.0).unwrap();
/// assert_eq!(p, 2.0);
/// ```
pub fn percentile(values: &[f64], percent: f64) -> MathResult<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(total_cmp);
    percentile_of_sorted(&sorted, percent)
}

/// Same as [`percentile`] for data that is already sorted ascending.
pub fn percentile_of_sorted(sorted: &[f64], percent: f64) -> MathResult<f64> {
    if sorted.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    if !(0.0..=100.0).contains(&percent) {
        return Err(MathError::invalid_input(format!(
            "percentile must lie in [0, 100], got {percent}"
        )));
    }

    let h = percent / 100.0 * (sorted.len() - 1) as f64;
    let lower = h.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = h - lower as f64;
    Ok(sorted[lower] + frac * (sorted[upper] - sorted[lower]))
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> MathResult<f64> {
    if values.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean squared error between two equally long vectors.
///
/// # Example
///
/// ```rust
/// use varcontrib_math::statistics::mean_squared_error;
///
/// let mse = mean_squared_error(&[1.0, 2.0], &[1.0, 4.0]).unwrap();
/// assert_eq!(mse, 2.0);
/// ```
pub fn mean_squared_error(estimate: &[f64], reference: &[f64]) -> MathResult<f64> {
    if estimate.len() != reference.len() {
        return Err(MathError::length_mismatch(reference.len(), estimate.len()));
    }
    if estimate.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    let sse: f64 = estimate
        .iter()
        .zip(reference)
        .map(|(e, r)| (e - r).powi(2))
        .sum();
    Ok(sse / estimate.len() as f64)
}

/// First four sample moments plus range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    /// Number of observations.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std_dev: f64,
    /// Sample skewness (population moment ratio).
    pub skewness: f64,
    /// Excess kurtosis (population moment ratio minus 3).
    pub excess_kurtosis: f64,
    /// Smallest observation.
    pub min: f64,
    /// Largest observation.
    pub max: f64,
}

impl Moments {
    /// Computes the moments of a sample of at least two points.
    ///
    /// Skewness and kurtosis are NaN for a constant sample.
    pub fn from_sample(values: &[f64]) -> MathResult<Self> {
        if values.len() < 2 {
            return Err(MathError::insufficient_data(2, values.len()));
        }
        let n = values.len() as f64;
        let m = mean(values)?;

        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values {
            let d = v - m;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
            min = min.min(v);
            max = max.max(v);
        }
        m2 /= n;
        m3 /= n;
        m4 /= n;

        Ok(Self {
            count: values.len(),
            mean: m,
            std_dev: (m2 * n / (n - 1.0)).sqrt(),
            skewness: m3 / m2.powf(1.5),
            excess_kurtosis: m4 / (m2 * m2) - 3.0,
            min,
            max,
        })
    }
}

/// Sample autocorrelation at `lag`.
///
/// Uses the standard biased estimator
/// `Σ (x_t - m)(x_{t+lag} - m) / Σ (x_t - m)²`.
pub fn autocorrelation(values: &[f64], lag: usize) -> MathResult<f64> {
    if lag >= values.len() {
        return Err(MathError::insufficient_data(lag + 1, values.len()));
    }
    let m = mean(values)?;
    let denom: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denom == 0.0 {
        return Err(MathError::DivisionByZero { value: denom });
    }
    let num: f64 = values
        .iter()
        .zip(&values[lag..])
        .map(|(a, b)| (a - m) * (b - m))
        .sum();
    Ok(num / denom)
}

/// Ljung-Box statistic `Q = n(n + 2) Σ ρ_k² / (n - k)` for autocorrelations
/// `ρ_1..ρ_h` of a series of length `n`.
pub fn ljung_box_statistic(autocorrelations: &[f64], n: usize) -> MathResult<f64> {
    if autocorrelations.len() >= n {
        return Err(MathError::insufficient_data(autocorrelations.len() + 1, n));
    }
    let nf = n as f64;
    let sum: f64 = autocorrelations
        .iter()
        .enumerate()
        .map(|(i, rho)| rho * rho / (nf - (i + 1) as f64))
        .sum();
    Ok(nf * (nf + 2.0) * sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentile_linear_interpolation() {
        let data = [10.0, 20.0, 30.0, 40.0];
        assert_relative_eq!(percentile(&data, 0.0).unwrap(), 10.0);
        assert_relative_eq!(percentile(&data, 100.0).unwrap(), 40.0);
        // h = 0.5 * 3 = 1.5
        assert_relative_eq!(percentile(&data, 50.0).unwrap(), 25.0);
        // h = 0.05 * 3 = 0.15
        assert_relative_eq!(percentile(&data, 5.0).unwrap(), 11.5);
    }

    #[test]
    fn test_percentile_errors() {
        assert!(percentile(&[], 5.0).is_err());
        assert!(percentile(&[1.0], 101.0).is_err());
        assert_relative_eq!(percentile(&[3.0], 5.0).unwrap(), 3.0);
    }

    #[test]
    fn test_mse_length_mismatch() {
        assert!(mean_squared_error(&[1.0], &[1.0, 2.0]).is_err());
        assert!(mean_squared_error(&[], &[]).is_err());
    }

    #[test]
    fn test_moments_symmetric_sample() {
        let data = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let m = Moments::from_sample(&data).unwrap();
        assert_relative_eq!(m.mean, 0.0);
        assert_relative_eq!(m.std_dev, 2.5_f64.sqrt());
        assert_relative_eq!(m.skewness, 0.0);
        // m2 = 2, m4 = 6.8 → 6.8 / 4 - 3
        assert_relative_eq!(m.excess_kurtosis, -1.3, epsilon = 1e-12);
        assert_eq!(m.min, -2.0);
        assert_eq!(m.max, 2.0);
    }

    #[test]
    fn test_autocorrelation_alternating() {
        let data: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_relative_eq!(autocorrelation(&data, 1).unwrap(), -0.99, epsilon = 1e-12);
        assert_relative_eq!(autocorrelation(&data, 2).unwrap(), 0.98, epsilon = 1e-12);
        assert!(autocorrelation(&[1.0, 1.0, 1.0], 1).is_err());
    }

    #[test]
    fn test_ljung_box() {
        let q = ljung_box_statistic(&[0.5], 10).unwrap();
        assert_relative_eq!(q, 10.0 * 12.0 * 0.25 / 9.0);
        assert!(ljung_box_statistic(&[0.1; 5], 5).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn percentile_is_monotone_and_bounded(
                data in proptest::collection::vec(-1e3f64..1e3, 1..50),
                p in 0.0f64..100.0,
                q in 0.0f64..100.0,
            ) {
                let (lo, hi) = if p <= q { (p, q) } else { (q, p) };
                let a = percentile(&data, lo).unwrap();
                let b = percentile(&data, hi).unwrap();
                prop_assert!(a <= b + 1e-9);

                let min = data.iter().copied().fold(f64::INFINITY, f64::min);
                let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(a >= min - 1e-9 && b <= max + 1e-9);
            }
        }
    }
}
