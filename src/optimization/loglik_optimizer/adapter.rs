//! Bridge from [`LogLikelihood`] to argmin's problem traits.
//!
//! argmin minimizes, so the adapter hands it `−ℓ(h)` and `−∇ℓ(h)`. Models
//! without an analytic gradient are differenced numerically on the cost
//! itself, which already carries the sign.
use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::fd_cost_gradient,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// A model and the sample it is evaluated on, seen as an argmin problem.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<F: LogLikelihood> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// `−ℓ(h)`; a non-finite log-likelihood is an `OptError::NonFiniteCost`.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let loglik = self.f.value(theta, self.data)?;
        if loglik.is_finite() {
            Ok(-loglik)
        } else {
            Err(OptError::NonFiniteCost { value: loglik }.into())
        }
    }
}

impl<F: LogLikelihood> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// `−∇ℓ(h)`, or [`fd_cost_gradient`] when the model reports
    /// `GradientNotImplemented`. Any other model error is returned as is.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(grad) => {
                validate_grad(&grad, theta.len())?;
                Ok(-grad)
            }
            Err(OptError::GradientNotImplemented) => {
                Ok(fd_cost_gradient(theta, |point: &Theta| self.cost(point))?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The sign flip between `ℓ` and the cost, for values and gradients.
    // - The finite-difference fallback when no analytic gradient exists.
    // - Propagation of model errors.
    //
    // They intentionally DO NOT cover:
    // - Solver behavior (see `api`).
    // -------------------------------------------------------------------------

    /// ℓ(θ) = -Σ (θ_k - 1)², optionally with an analytic gradient.
    struct Bowl {
        analytic: bool,
    }

    impl LogLikelihood for Bowl {
        type Data = usize;

        fn value(&self, theta: &Theta, data: &usize) -> OptResult<Cost> {
            if theta.len() != *data {
                return Err(OptError::HyperLengthMismatch { expected: *data, actual: theta.len() });
            }
            Ok(-theta.iter().map(|t| (t - 1.0).powi(2)).sum::<f64>())
        }

        fn check(&self, _theta: &Theta, _data: &usize) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, _data: &usize) -> OptResult<Grad> {
            if self.analytic {
                Ok(theta.mapv(|t| -2.0 * (t - 1.0)))
            } else {
                Err(OptError::GradientNotImplemented)
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Cost and analytic gradient are the negated log-likelihood quantities.
    //
    // Given
    // -----
    // - `θ = [0, 3]` on the bowl.
    //
    // Expect
    // ------
    // - `cost = 1 + 4 = 5` and `∇c = 2(θ - 1) = [-2, 4]`.
    fn analytic_branch_flips_signs() {
        let model = Bowl { analytic: true };
        let adapter = ArgMinAdapter::new(&model, &2);
        let theta = array![0.0, 3.0];

        assert_relative_eq!(adapter.cost(&theta).unwrap(), 5.0);
        let g = adapter.gradient(&theta).unwrap();
        assert_relative_eq!(g[0], -2.0);
        assert_relative_eq!(g[1], 4.0);
    }

    #[test]
    // Purpose
    // -------
    // Without an analytic gradient the finite-difference cost gradient is used.
    //
    // Given
    // -----
    // - The same point with `analytic = false`.
    //
    // Expect
    // ------
    // - Gradient within 1e-5 of `[-2, 4]`.
    fn finite_difference_fallback_matches_analytic() {
        let model = Bowl { analytic: false };
        let adapter = ArgMinAdapter::new(&model, &2);
        let g = adapter.gradient(&array![0.0, 3.0]).unwrap();
        assert_relative_eq!(g[0], -2.0, epsilon = 1e-5);
        assert_relative_eq!(g[1], 4.0, epsilon = 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // A model error raised inside `value` reaches the caller intact.
    //
    // Given
    // -----
    // - A 3-vector where the model expects length 2.
    //
    // Expect
    // ------
    // - The cost error converts back to `OptError::HyperLengthMismatch`.
    fn model_errors_survive_the_argmin_boundary() {
        let model = Bowl { analytic: true };
        let adapter = ArgMinAdapter::new(&model, &2);
        let err = adapter.cost(&array![0.0, 0.0, 0.0]).unwrap_err();
        assert_eq!(
            OptError::from(err),
            OptError::HyperLengthMismatch { expected: 2, actual: 3 }
        );
    }
}
