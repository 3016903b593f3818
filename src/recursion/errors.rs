//! Errors for the copula predictive-recursion models.
//!
//! This module defines [`RecursionError`], raised at the boundary where
//! samples, hyperparameters, permutation orders and options enter the
//! recursion. The recursion itself never raises on numerical degeneracy; it
//! only clips.
//!
//! ## Conventions
//! - **Indices are 0-based**; `row` is the observation index and `col` the
//!   coordinate within an observation.
//! - Optimizer failures are not represented here; `fit` returns
//!   `OptError`, which absorbs these errors through `From`.

/// Result alias for recursion operations that may produce [`RecursionError`].
pub type RecursionResult<T> = Result<T, RecursionError>;

/// Unified error type for the predictive-recursion models.
#[derive(Debug, Clone, PartialEq)]
pub enum RecursionError {
    // ---- Input/data validation ----
    /// Sample has no observations.
    EmptySample,

    /// Observations have zero coordinates.
    ZeroDimension,

    /// An observation entry is NaN/±inf.
    NonFiniteObservation { row: usize, col: usize, value: f64 },

    /// A covariate entry is NaN/±inf.
    NonFiniteCovariate { row: usize, col: usize, value: f64 },

    /// Responses and covariates disagree on the number of rows.
    RowCountMismatch { responses: usize, covariates: usize },

    /// Test inputs do not have the training dimension.
    DimensionMismatch { expected: usize, actual: usize },

    /// Sample size differs from the one the model was built for.
    SampleSizeMismatch { expected: usize, actual: usize },

    // ---- Hyperparameters ----
    /// Hyperparameter vector has the wrong length.
    HyperLengthMismatch { expected: usize, actual: usize },

    /// A hyperparameter is NaN/±inf.
    NonFiniteHyper { index: usize, value: f64 },

    /// Initial correlation must lie strictly inside (0, 1).
    InvalidRhoInit { value: f64 },

    // ---- Permutations / options ----
    /// Permutation counts must be at least one.
    InvalidPermutationCount { count: usize, reason: &'static str },

    /// An explicit permutation is not a reordering of `0..n`.
    InvalidPermutation { index: usize, reason: &'static str },

    /// The joint-conditional target needs at least two coordinates.
    TargetNeedsTwoDims { d: usize },

    // ---- Estimation ----
    /// `predict` was called before `fit`.
    ModelNotFitted,
}

impl std::error::Error for RecursionError {}

impl std::fmt::Display for RecursionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            RecursionError::EmptySample => {
                write!(f, "Sample contains no observations.")
            }
            RecursionError::ZeroDimension => {
                write!(f, "Observations must have at least one coordinate.")
            }
            RecursionError::NonFiniteObservation { row, col, value } => {
                write!(f, "Observation at row {row}, column {col} is non-finite: {value}")
            }
            RecursionError::NonFiniteCovariate { row, col, value } => {
                write!(f, "Covariate at row {row}, column {col} is non-finite: {value}")
            }
            RecursionError::RowCountMismatch { responses, covariates } => {
                write!(
                    f,
                    "Responses and covariates must have the same number of rows: {responses} vs {covariates}"
                )
            }
            RecursionError::DimensionMismatch { expected, actual } => {
                write!(f, "Test inputs have dimension {actual}; the model was fitted with {expected}")
            }
            RecursionError::SampleSizeMismatch { expected, actual } => {
                write!(f, "Model was built for n = {expected} observations; got {actual}")
            }
            // ---- Hyperparameters ----
            RecursionError::HyperLengthMismatch { expected, actual } => {
                write!(f, "Hyperparameter vector must have length {expected}; got {actual}")
            }
            RecursionError::NonFiniteHyper { index, value } => {
                write!(f, "Hyperparameter at index {index} is non-finite: {value}")
            }
            RecursionError::InvalidRhoInit { value } => {
                write!(f, "Initial correlation must lie in (0, 1); got: {value}")
            }
            // ---- Permutations / options ----
            RecursionError::InvalidPermutationCount { count, reason } => {
                write!(f, "Invalid permutation count {count}: {reason}")
            }
            RecursionError::InvalidPermutation { index, reason } => {
                write!(f, "Permutation {index} is invalid: {reason}")
            }
            RecursionError::TargetNeedsTwoDims { d } => {
                write!(f, "Joint-conditional target needs at least 2 coordinates; got {d}")
            }
            // ---- Estimation ----
            RecursionError::ModelNotFitted => {
                write!(f, "Model hasn't been fitted yet.")
            }
        }
    }
}
