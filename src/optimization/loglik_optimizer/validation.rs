//! Validation helpers for the hyperparameter optimizer.
//!
//! Checks shared by the optimizer configuration and the outcome builder:
//! tolerances must be finite and positive when set, gradients must match the
//! hyperparameter length and be finite, and a finished run must report a
//! finite `h` and a finite prequential log-likelihood. The first offending
//! entry is reported through a specific [`OptError`] variant.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta},
};

/// Index and value of the first NaN/±inf entry, if any.
fn first_non_finite<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Option<(usize, f64)> {
    values.into_iter().copied().enumerate().find(|(_, v)| !v.is_finite())
}

/// Reason a set tolerance is unusable, if any.
fn tolerance_problem(tol: f64) -> Option<&'static str> {
    if !tol.is_finite() {
        Some("Tolerance must be finite.")
    } else if tol <= 0.0 {
        Some("Tolerance must be positive.")
    } else {
        None
    }
}

/// Validate the optional gradient-norm stopping tolerance.
///
/// # Errors
/// [`OptError::InvalidTolGrad`] for a non-finite or non-positive value.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tolerance_problem(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolGrad { tol, reason }),
        None => Ok(()),
    }
}

/// Validate the optional cost-change stopping tolerance.
///
/// # Errors
/// [`OptError::InvalidTolCost`] for a non-finite or non-positive value.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tolerance_problem(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolCost { tol, reason }),
        None => Ok(()),
    }
}

/// Validate a gradient of `ℓ(h)` against the hyperparameter length.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] on a length mismatch.
/// - [`OptError::InvalidGradient`] for the first non-finite component.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    if let Some((index, value)) = first_non_finite(grad) {
        return Err(OptError::InvalidGradient {
            index,
            value,
            reason: "Gradient elements must be finite.",
        });
    }
    Ok(())
}

/// Unwrap the best hyperparameters reported by the solver.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if the solver kept no parameters.
/// - [`OptError::InvalidThetaHat`] for the first non-finite entry.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some((index, value)) = first_non_finite(&theta) {
        return Err(OptError::InvalidThetaHat {
            index,
            value,
            reason: "Parameter estimates must be finite.",
        });
    }
    Ok(theta)
}

/// Reject a non-finite log-likelihood.
///
/// # Errors
/// [`OptError::NonFiniteCost`] for NaN/±inf.
pub fn validate_value(value: f64) -> OptResult<()> {
    if value.is_finite() { Ok(()) } else { Err(OptError::NonFiniteCost { value }) }
}
