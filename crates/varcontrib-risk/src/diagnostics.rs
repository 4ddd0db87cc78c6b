//! Exploratory diagnostics for a univariate time series.
//!
//! Answers two questions about a series such as daily P&L or returns: is
//! its distribution stable over time, and are the observations independent?
//! Stability compares contiguous windows against the whole sample.
//! Independence looks at the autocorrelation of the values and of their
//! squares (volatility clustering) with a Ljung-Box portmanteau test.

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};
use varcontrib_math::distributions::chi_squared_sf;
use varcontrib_math::statistics::{autocorrelation, ljung_box_statistic, Moments};

use crate::error::{RiskError, RiskResult};

const CONTEXT: &str = "series diagnostics";

/// Two-sided 95% normal quantile used for the autocorrelation band.
const BAND_Z: f64 = 1.96;

/// Diagnostic settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Number of contiguous windows for the stability check.
    pub windows: usize,
    /// Highest autocorrelation lag.
    pub max_lag: usize,
}

impl DiagnosticsConfig {
    /// Shortest series accepted.
    pub const MIN_OBSERVATIONS: usize = 8;
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            windows: 2,
            max_lag: 10,
        }
    }
}

/// Descriptive statistics of the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of observations.
    pub count: usize,
    /// Mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Skewness.
    pub skewness: f64,
    /// Excess kurtosis.
    pub excess_kurtosis: f64,
    /// Minimum.
    pub min: f64,
    /// Maximum.
    pub max: f64,
}

impl From<Moments> for SummaryStatistics {
    fn from(m: Moments) -> Self {
        Self {
            count: m.count,
            mean: m.mean,
            std_dev: m.std_dev,
            skewness: m.skewness,
            excess_kurtosis: m.excess_kurtosis,
            min: m.min,
            max: m.max,
        }
    }
}

/// Statistics of one contiguous window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    /// Index of the first observation.
    pub start: usize,
    /// Number of observations.
    pub len: usize,
    /// Window mean.
    pub mean: f64,
    /// Window sample standard deviation.
    pub std_dev: f64,
}

/// Distributional stability across windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityCheck {
    /// Per-window statistics in time order.
    pub windows: Vec<WindowStatistics>,
    /// Largest `|window mean - mean| / std_dev` over the windows.
    pub max_mean_shift: f64,
    /// Largest over smallest window standard deviation; infinite when a
    /// window is constant.
    pub std_dev_ratio: f64,
}

/// Autocorrelations and Ljung-Box test of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndependenceTest {
    /// Autocorrelation at lags `1..=max_lag`.
    pub autocorrelations: Vec<f64>,
    /// Ljung-Box `Q` over all lags.
    pub ljung_box: f64,
    /// Upper-tail `χ²(max_lag)` probability of `Q`.
    pub p_value: f64,
    /// Lags whose autocorrelation falls outside the 95% band.
    pub significant_lags: Vec<usize>,
}

impl IndependenceTest {
    fn run(values: &[f64], max_lag: usize, band: f64) -> RiskResult<Self> {
        let autocorrelations = (1..=max_lag)
            .map(|lag| autocorrelation(values, lag))
            .collect::<Result<Vec<_>, _>>()?;
        let ljung_box = ljung_box_statistic(&autocorrelations, values.len())?;
        let p_value = chi_squared_sf(ljung_box, max_lag as f64)?;
        let significant_lags = autocorrelations
            .iter()
            .enumerate()
            .filter(|(_, rho)| rho.abs() > band)
            .map(|(i, _)| i + 1)
            .collect();

        Ok(Self {
            autocorrelations,
            ljung_box,
            p_value,
            significant_lags,
        })
    }

    /// True when the Ljung-Box test rejects independence at `alpha`.
    pub fn rejects_independence(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Full diagnostic report of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDiagnostics {
    /// Settings used.
    pub config: DiagnosticsConfig,
    /// Whole-sample statistics.
    pub summary: SummaryStatistics,
    /// Window comparison.
    pub stability: StabilityCheck,
    /// Independence of the values.
    pub levels: IndependenceTest,
    /// Independence of the squared values; `None` when the squares are
    /// constant (e.g. a series of `±1`).
    pub squares: Option<IndependenceTest>,
    /// Half-width `1.96 / sqrt(T)` of the autocorrelation band.
    pub confidence_band: f64,
}

fn validate(values: &[f64], config: &DiagnosticsConfig) -> RiskResult<()> {
    let t = values.len();
    if t < DiagnosticsConfig::MIN_OBSERVATIONS {
        return Err(RiskError::invalid_input(
            CONTEXT,
            format!(
                "need at least {} observations, got {t}",
                DiagnosticsConfig::MIN_OBSERVATIONS
            ),
        ));
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(RiskError::invalid_input(
            CONTEXT,
            format!("non-finite value {} at position {i}", values[i]),
        ));
    }
    if config.windows < 1 || config.windows > t / 2 {
        return Err(RiskError::invalid_input(
            CONTEXT,
            format!("windows must lie in [1, {}], got {}", t / 2, config.windows),
        ));
    }
    if config.max_lag < 1 || config.max_lag >= t {
        return Err(RiskError::invalid_input(
            CONTEXT,
            format!("max lag must lie in [1, {}], got {}", t - 1, config.max_lag),
        ));
    }
    Ok(())
}

fn stability(
    values: &[f64],
    windows: usize,
    summary: &SummaryStatistics,
) -> RiskResult<StabilityCheck> {
    let size = values.len() / windows;
    let mut stats = Vec::with_capacity(windows);
    for w in 0..windows {
        let start = w * size;
        // Last window absorbs the remainder
        let end = if w + 1 == windows { values.len() } else { start + size };
        let m = Moments::from_sample(&values[start..end])?;
        stats.push(WindowStatistics {
            start,
            len: end - start,
            mean: m.mean,
            std_dev: m.std_dev,
        });
    }

    let max_mean_shift = stats
        .iter()
        .map(|w| (w.mean - summary.mean).abs() / summary.std_dev)
        .fold(0.0, f64::max);
    let (lo, hi) = stats
        .iter()
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), w| (lo.min(w.std_dev), hi.max(w.std_dev)));
    let std_dev_ratio = if lo > 0.0 { hi / lo } else { f64::INFINITY };

    Ok(StabilityCheck {
        windows: stats,
        max_mean_shift,
        std_dev_ratio,
    })
}

/// Runs all diagnostics on `values`.
///
/// # Errors
///
/// Returns `InvalidInput` for fewer than 8 observations, non-finite values,
/// `windows` outside `[1, T/2]` or `max_lag` outside `[1, T)`, and
/// `DegenerateComputation` for a constant series.
pub fn diagnose(values: &[f64], config: &DiagnosticsConfig) -> RiskResult<SeriesDiagnostics> {
    validate(values, config)?;
    let _span = debug_span!("diagnose", observations = values.len()).entered();

    let summary = SummaryStatistics::from(Moments::from_sample(values)?);
    if !(summary.std_dev > 0.0) {
        return Err(RiskError::degenerate(CONTEXT, "series has zero variance"));
    }

    let band = BAND_Z / (values.len() as f64).sqrt();
    let stability = stability(values, config.windows, &summary)?;
    let levels = IndependenceTest::run(values, config.max_lag, band)?;

    let squared: Vec<f64> = values.iter().map(|v| v * v).collect();
    let squares = match IndependenceTest::run(&squared, config.max_lag, band) {
        Ok(test) => Some(test),
        Err(RiskError::Math(varcontrib_math::MathError::DivisionByZero { .. })) => {
            debug!("squared series is constant, skipping its independence test");
            None
        }
        Err(e) => return Err(e),
    };

    debug!(
        ljung_box = levels.ljung_box,
        p_value = levels.p_value,
        max_mean_shift = stability.max_mean_shift,
        "series diagnostics"
    );

    Ok(SeriesDiagnostics {
        config: *config,
        summary,
        stability,
        levels,
        squares,
        confidence_band: band,
    })
}
