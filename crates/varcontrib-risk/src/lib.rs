//! # varcontrib-risk
//!
//! Value-at-Risk contributions under a multivariate Student-t market.
//!
//! This crate provides:
//!
//! - **Market**: Validated market model, confidence level, demo market generator
//! - **Scenarios**: Antithetic multivariate Student-t scenario sampler
//! - **VaR**: Analytical, naive finite-difference and kernel-smoothed contribution estimators
//! - **Comparison**: MSE of the empirical estimators against the closed form
//! - **Diagnostics**: Stability and independence checks for a time series
//! - **Analysis**: Configured end-to-end runs
//!
//! ## Example
//!
//! ```rust
//! use varcontrib_risk::prelude::*;
//!
//! let config = AnalysisConfig {
//!     assets: 4,
//!     simulations: 2_000,
//!     ..AnalysisConfig::default()
//! };
//! let report = VaRContributionAnalysis::new(config)?.run()?;
//!
//! let refined = &report.comparison.refined;
//! assert!((refined.total_contribution() - refined.var).abs() < 1e-10);
//! # Ok::<(), RiskError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod analysis;
pub mod comparison;
pub mod config;
pub mod diagnostics;
mod error;
pub mod market;
pub mod scenarios;
pub mod var;

pub use error::{RiskError, RiskResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{AnalysisReport, VaRContributionAnalysis};
    pub use crate::comparison::{AxisRange, ContributionComparison};
    pub use crate::config::{AnalysisConfig, MarketSpec, Validate, ValidationError};
    pub use crate::diagnostics::{diagnose, DiagnosticsConfig, SeriesDiagnostics};
    pub use crate::market::{ConfidenceLevel, DemoMarket, MarketModel};
    pub use crate::scenarios::{ScenarioGenerator, ScenarioSet};
    pub use crate::var::*;
    pub use crate::{RiskError, RiskResult};
}
