//! core — building blocks of the copula predictive recursion.
//!
//! Purpose
//! -------
//! Collect the numerical pieces the density and regression models are built
//! from: validated sample containers, the standard-normal marginal seed, the
//! bivariate Gaussian copula link, the single-step update with its tangent
//! recursion, covariate localization, permutation handling, the sequential
//! chains, permutation averaging, and run-time options.
//!
//! Key behaviors
//! -------------
//! - Seed every observation's state from a standard-normal marginal
//!   ([`init_marginals`]) and absorb observations one at a time with
//!   [`copula_step`] under the fixed schedule [`log_mixing_weight`].
//! - Thread the step through one permutation ([`DensityChain`],
//!   [`RegressionChain`]), recording the history buffer needed for
//!   prediction and the prequential trace needed for fitting.
//! - Average traces arithmetically for training and combine replays as a
//!   mixture for prediction ([`averaging`], [`PermutationBank`]).
//! - Carry forward-mode sensitivities with respect to every correlation
//!   alongside the values, so the objective gradient is exact.
//!
//! Invariants & assumptions
//! ------------------------
//! - Log conditional CDFs stay inside `[ln ε, ln(1 − ε)]`, `ε = 1e-6`, and
//!   localized weights inside `[ln 1e-5, ln(1 − 1e-5)]`. The recursion only
//!   clips; it never reports numerical degeneracy as an error.
//! - Correlations passed to the core are already mapped into `(0, 1)`.
//! - Malformed inputs are rejected by [`DensityData`], [`RegressionData`]
//!   and [`validation`] before any chain runs.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; step `i` uses `α_i = (2 − 1/(i+1)) / (i+2)`.
//! - All probabilities are carried in log space.
//! - This module does no logging; models own the `tracing` events.
//!
//! Testing notes
//! -------------
//! - Unit tests in each submodule cover reference runs, clipping bounds
//!   (`proptest`), tangent recursions against central differences, and the
//!   flat-kernel reduction of regression to density estimation.

pub mod accumulator;
pub mod averaging;
pub mod copula;
pub mod data;
pub mod localizer;
pub mod marginals;
pub mod options;
pub mod permutations;
pub mod update;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::accumulator::{ChainOutput, DensityChain, RegressionChain};
pub use self::averaging::{
    PermutationBank, average_density_trace, average_density_trace_with_tangents,
    average_regression_trace, average_regression_trace_with_tangents, mixture_average,
    mixture_average_scalar, prequential_loss,
};
pub use self::copula::{CopulaLink, GaussianCopula, LinkPartials};
pub use self::data::{DensityData, RegressionData};
pub use self::localizer::{CovariateLocalizer, KernelChoice, log_kernel};
pub use self::marginals::{init_marginals, init_marginals_rows};
pub use self::options::{DEFAULT_RHO_INIT, DensityTarget, RecursionOptions, RhoLayout};
pub use self::permutations::PermutationSet;
pub use self::update::{StepInput, copula_step, log_mixing_weight};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use copula_recursion::recursion::core::prelude::*;
//
// to import the main recursion core surface in a single line.

pub mod prelude {
    pub use super::copula::{CopulaLink, GaussianCopula};
    pub use super::data::{DensityData, RegressionData};
    pub use super::localizer::KernelChoice;
    pub use super::options::{DensityTarget, RecursionOptions, RhoLayout};
    pub use super::permutations::PermutationSet;
}
