//! Accuracy comparison of the empirical estimators.
//!
//! The analytical contributions are the reference; the naive and refined
//! contributions are scored by their mean squared error over the assets.

use serde::{Deserialize, Serialize};
use varcontrib_math::statistics::mean_squared_error;

use crate::error::{RiskError, RiskResult};
use crate::var::{VaRContributions, VaRMethod};

/// Value range shared by all contribution charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    /// Lower bound, never above zero.
    pub min: f64,
    /// Upper bound, never below zero.
    pub max: f64,
}

impl AxisRange {
    /// Relative padding added on both sides.
    pub const PADDING: f64 = 0.05;

    /// Range covering `values` and zero, padded by 5% of its span.
    ///
    /// Falls back to `[-1, 1]` when every value is zero or none is finite.
    pub fn auto(values: &[f64]) -> Self {
        let (lo, hi) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let span = hi - lo;
        if span == 0.0 {
            return Self { min: -1.0, max: 1.0 };
        }
        let pad = span * Self::PADDING;
        Self {
            min: if lo < 0.0 { lo - pad } else { 0.0 },
            max: if hi > 0.0 { hi + pad } else { 0.0 },
        }
    }

    /// Width of the range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Clamps `value` into the range, flagging values that were cut.
    pub fn clip(&self, value: f64) -> (f64, bool) {
        if value < self.min {
            (self.min, true)
        } else if value > self.max {
            (self.max, true)
        } else {
            (value, false)
        }
    }
}

/// The three contribution estimates of one run and their errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionComparison {
    /// Reference contributions.
    pub analytical: VaRContributions,
    /// Finite-difference contributions.
    pub naive: VaRContributions,
    /// Kernel-smoothed contributions.
    pub refined: VaRContributions,
    /// MSE of naive against analytical contributions.
    pub naive_mse: f64,
    /// MSE of refined against analytical contributions.
    pub refined_mse: f64,
}

impl ContributionComparison {
    /// Scores the empirical estimates against the analytical one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the estimates cover different numbers of
    /// assets.
    pub fn new(
        analytical: VaRContributions,
        naive: VaRContributions,
        refined: VaRContributions,
    ) -> RiskResult<Self> {
        let n = analytical.assets();
        if naive.assets() != n || refined.assets() != n {
            return Err(RiskError::invalid_input(
                "contribution comparison",
                format!(
                    "asset counts differ: analytical {n}, naive {}, refined {}",
                    naive.assets(),
                    refined.assets()
                ),
            ));
        }

        let reference = analytical.contributions.as_slice();
        let naive_mse = mean_squared_error(naive.contributions.as_slice(), reference)?;
        let refined_mse = mean_squared_error(refined.contributions.as_slice(), reference)?;

        Ok(Self {
            analytical,
            naive,
            refined,
            naive_mse,
            refined_mse,
        })
    }

    /// Chart range derived from the analytical contributions.
    pub fn axis_range(&self) -> AxisRange {
        AxisRange::auto(self.analytical.contributions.as_slice())
    }

    /// Estimate produced by `method`.
    pub fn estimate(&self, method: VaRMethod) -> &VaRContributions {
        match method {
            VaRMethod::Analytical => &self.analytical,
            VaRMethod::Naive => &self.naive,
            VaRMethod::Refined => &self.refined,
        }
    }

    /// MSE of `method` against the reference; zero for the reference itself.
    pub fn mse(&self, method: VaRMethod) -> f64 {
        match method {
            VaRMethod::Analytical => 0.0,
            VaRMethod::Naive => self.naive_mse,
            VaRMethod::Refined => self.refined_mse,
        }
    }

    /// Ratio `naive_mse / refined_mse`; above one when smoothing helps.
    pub fn improvement(&self) -> f64 {
        self.naive_mse / self.refined_mse
    }
}
