//! Validation helpers for recursion inputs.
//!
//! Each helper scans its input once and reports the first offending entry
//! through a specific [`RecursionError`] variant, so malformed values are
//! rejected before any chain starts.
use crate::recursion::errors::{RecursionError, RecursionResult};
use ndarray::{ArrayView1, ArrayView2};

/// Reject non-finite response entries.
///
/// # Errors
/// - [`RecursionError::NonFiniteObservation`] with the first offending
///   `(row, col)` in row-major order.
pub fn validate_observations(y: ArrayView2<f64>) -> RecursionResult<()> {
    for ((row, col), &value) in y.indexed_iter() {
        if !value.is_finite() {
            return Err(RecursionError::NonFiniteObservation { row, col, value });
        }
    }
    Ok(())
}

/// Reject non-finite covariate entries.
///
/// # Errors
/// - [`RecursionError::NonFiniteCovariate`] with the first offending
///   `(row, col)` in row-major order.
pub fn validate_covariates(x: ArrayView2<f64>) -> RecursionResult<()> {
    for ((row, col), &value) in x.indexed_iter() {
        if !value.is_finite() {
            return Err(RecursionError::NonFiniteCovariate { row, col, value });
        }
    }
    Ok(())
}

/// Check a hyperparameter vector's length and finiteness.
///
/// # Errors
/// - [`RecursionError::HyperLengthMismatch`] when `h.len() != expected`.
/// - [`RecursionError::NonFiniteHyper`] for the first NaN/±inf entry.
pub fn validate_hyper(h: ArrayView1<f64>, expected: usize) -> RecursionResult<()> {
    if h.len() != expected {
        return Err(RecursionError::HyperLengthMismatch { expected, actual: h.len() });
    }
    if let Some((index, &value)) = h.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(RecursionError::NonFiniteHyper { index, value });
    }
    Ok(())
}

/// Check that a sample has the size a model was built for.
///
/// # Errors
/// - [`RecursionError::SampleSizeMismatch`] when `actual != expected`.
pub fn validate_sample_size(expected: usize, actual: usize) -> RecursionResult<()> {
    if expected != actual {
        return Err(RecursionError::SampleSizeMismatch { expected, actual });
    }
    Ok(())
}
