//! loglik_optimizer — L-BFGS maximization of model log-likelihoods.
//!
//! Purpose
//! -------
//! Fit the copula correlation hyperparameters `h` by maximizing the
//! prequential log-likelihood. A model implements [`LogLikelihood`] and calls
//! [`maximize`]; everything argmin-specific stays inside this module.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(h)` into the cost `−ℓ(h)`.
//! - [`builders`] pairs L-BFGS with the requested [`LineSearcher`] and the
//!   tolerances in [`MLEOptions`].
//! - [`run::run_lbfgs`] executes the solver and produces an
//!   [`OptimOutcome`] expressed in terms of `ℓ`, not the cost.
//! - [`finite_diff`] supplies numerical gradients for models that have no
//!   analytic one, and reference gradients for tests.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models never see the cost; they report `ℓ(h)` and `∇ℓ(h)`.
//! - Bad inputs come back as [`OptError`](crate::optimization::errors::OptError)
//!   values, never panics.
//!
//! Testing notes
//! -------------
//! - Each submodule tests its own piece on toy objectives; [`api`] runs a
//!   full solve on a concave quadratic for both line searches.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use copula_recursion::optimization::loglik_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
