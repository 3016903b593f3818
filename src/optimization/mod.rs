//! optimization — hyperparameter fitting and log-space numerics.
//!
//! Purpose
//! -------
//! Everything the recursion models need that is not the recursion itself:
//! the L-BFGS log-likelihood maximizer (`loglik_optimizer`), log-domain and
//! standard-normal helpers used in every inner loop (`numerical_stability`),
//! and the optimizer error type (`errors::OptError`).
//!
//! Conventions
//! -----------
//! - Hyperparameters live in unconstrained space and map to correlations
//!   through `ρ = 1 / (1 + exp(h))`.
//! - For the recursion models the maximized `ℓ(h)` is the
//!   permutation-averaged prequential log-likelihood per observation, the
//!   negated training loss.
//! - Fallible entry points return `OptResult<T>`; raw argmin errors and
//!   recursion errors are converted at the boundary.
//! - Per-iteration solver output is opt-in through the `obs_slog` feature.
//!
//! Testing notes
//! -------------
//! - Unit tests sit in each submodule; end-to-end fits of the models are in
//!   `tests/integration_pr_pipeline.rs`.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// `use copula_recursion::optimization::prelude::*;` imports the common surface.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
