//! recursion — copula predictive recursion for densities and regression.
//!
//! Purpose
//! -------
//! Estimate predictive densities by absorbing observations one at a time:
//! every observation seeds a standard-normal marginal, and each new point
//! mixes the current estimate with its bivariate Gaussian copula correction
//! under the weight `α_i = (2 − 1/(i+1)) / (i+2)`. Averaging over random
//! orders removes most of the order dependence, and the copula correlations
//! are fit by maximizing the prequential log-likelihood.
//!
//! Key behaviors
//! -------------
//! - [`core`]: marginals, copula link, step update and tangents, chains,
//!   permutation averaging, covariate localization, data and options.
//! - [`models`]: [`DensityModel`] and [`RegressionModel`] with objective,
//!   gradient, fit and predict.
//! - [`errors`]: [`RecursionError`] and [`RecursionResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite and on a standardized scale.
//! - Within one permutation the recursion is strictly sequential;
//!   permutations and test points are independent and run in parallel.
//!
//! Downstream usage
//! ----------------
//! - Build [`DensityData`] / [`RegressionData`], choose [`RecursionOptions`],
//!   construct a model, `fit`, then `predict` on validated test inputs.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    DensityData, DensityTarget, GaussianCopula, KernelChoice, PermutationSet, RecursionOptions,
    RegressionData, RhoLayout,
};
pub use self::errors::{RecursionError, RecursionResult};
pub use self::models::{DensityModel, DensityPrediction, RegressionModel, RegressionPrediction};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use copula_recursion::recursion::prelude::*;
//
// to import the main recursion surface in a single line.

pub mod prelude {
    pub use super::{
        DensityData, DensityModel, DensityPrediction, DensityTarget, KernelChoice,
        PermutationSet, RecursionError, RecursionOptions, RecursionResult, RegressionData,
        RegressionModel, RegressionPrediction, RhoLayout,
    };
}
