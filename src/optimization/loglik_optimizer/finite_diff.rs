//! loglik_optimizer::finite_diff — numerical gradients of the solver cost.
//!
//! Purpose
//! -------
//! Differentiate objectives numerically for models that do not provide an
//! analytic gradient, and give the recursion models a reference gradient to
//! check their forward-mode tangents against.
//!
//! Key behaviors
//! -------------
//! - [`fd_cost_gradient`]: central differences of a fallible cost, retried
//!   with forward differences when the central stencil hits a failure or a
//!   non-finite value.
//! - [`central_fd_grad`]: central differences of an infallible objective.
//!
//! Invariants & assumptions
//! ------------------------
//! - The first error raised by the cost during a stencil is kept and
//!   returned; later ones are dropped.
//! - Returned gradients satisfy [`validate_grad`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{Grad, Theta, validation::validate_grad},
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Numerical gradient of a fallible cost at `theta`.
///
/// # Errors
/// - The first error raised by `cost` during the forward stencil, converted
///   into `OptError`.
/// - [`validate_grad`] failures of the forward-difference gradient.
pub fn fd_cost_gradient<C>(theta: &Theta, cost: C) -> OptResult<Grad>
where
    C: Fn(&Theta) -> Result<f64, Error>,
{
    let failure: RefCell<Option<Error>> = RefCell::new(None);
    let guarded = |point: &Theta| match cost(point) {
        Ok(value) => value,
        Err(err) => {
            failure.borrow_mut().get_or_insert(err);
            f64::NAN
        }
    };

    let central = theta.central_diff(&guarded);
    if failure.borrow().is_none() && validate_grad(&central, theta.len()).is_ok() {
        return Ok(central);
    }

    failure.replace(None);
    let forward = theta.forward_diff(&guarded);
    if let Some(err) = failure.take() {
        return Err(err.into());
    }
    validate_grad(&forward, theta.len())?;
    Ok(forward)
}

/// Validated central-difference gradient of an infallible objective.
///
/// # Errors
/// `OptError::InvalidGradient` if any component is non-finite.
pub fn central_fd_grad<G: Fn(&Theta) -> f64>(theta: &Theta, func: &G) -> OptResult<Grad> {
    let grad = theta.central_diff(func);
    validate_grad(&grad, theta.len())?;
    Ok(grad)
}
