//! models — user-facing predictive-recursion estimators.
//!
//! Purpose
//! -------
//! Wire the recursion core to the log-likelihood optimizer. Each model owns
//! its fit permutations, evaluates the permutation-averaged prequential
//! objective and its exact gradient, fits correlations with `maximize`, and
//! predicts from a stored bank of permutation histories.
//!
//! Key behaviors
//! -------------
//! - [`DensityModel`]: multivariate density estimation with a shared or
//!   per-coordinate correlation and a joint or joint-conditional target.
//! - [`RegressionModel`]: conditional density of a scalar response with
//!   covariate-localized mixing weights.
//! - Both implement [`LogLikelihood`](crate::optimization::loglik_optimizer::LogLikelihood)
//!   with `ℓ(h) = −loss(h)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Samples are validated containers whose size matches the permutations
//!   the model was built with; this is re-checked on every evaluation.
//! - Hyperparameters are unconstrained; `ρ = 1 / (1 + exp(h))`.
//!
//! Conventions
//! -----------
//! - `fit` returns `OptResult<()>` and stores `results` and `fitted`;
//!   `predict` returns `RecursionResult`.
//! - `tracing` events: `debug` per objective evaluation, `info` at fit and
//!   predict boundaries.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`density`] and [`regression`] cover reference values,
//!   gradients against central differences, the flat-kernel reduction, and
//!   fit → predict on small samples.

pub mod density;
pub mod regression;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::density::{DensityModel, DensityPrediction, FittedDensity};
pub use self::regression::{FittedRegression, RegressionModel, RegressionPrediction};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use copula_recursion::recursion::models::prelude::*;
//
// to import the model surface in a single line.

pub mod prelude {
    pub use super::density::{DensityModel, DensityPrediction};
    pub use super::regression::{RegressionModel, RegressionPrediction};
}
