//! # VarContrib Math
//!
//! Mathematical utilities for the VarContrib risk library.
//!
//! This crate provides:
//!
//! - **Linear Algebra**: Covariance validation, correlation split, PSD factors
//! - **Distributions**: Student-t quantiles, normal densities, multivariate Student-t sampling
//! - **Statistics**: Empirical percentiles, moments, MSE, autocorrelation
//!
//! ## Design Philosophy
//!
//! - **Trusted Primitives**: Densities, quantiles and samplers come from `statrs` and `rand_distr`
//! - **Numerical Stability**: Careful handling of singular and degenerate inputs
//! - **Dense `f64`**: All matrices are `nalgebra::DMatrix<f64>`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::uninlined_format_args)]

pub mod distributions;
pub mod error;
pub mod linear_algebra;
pub mod statistics;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::distributions::{
        chi_squared_sf, normal_pdf, student_t_quantile, MultivariateStudentT, NormalDensity,
    };
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{
        covariance_to_correlation, ensure_positive_semi_definite, psd_factor, quadratic_form,
    };
    pub use crate::statistics::{
        autocorrelation, mean, mean_squared_error, percentile, percentile_of_sorted, Moments,
    };
}

pub use error::{MathError, MathResult};
