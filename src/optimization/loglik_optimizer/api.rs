//! Entry point for maximizing a [`LogLikelihood`].
//!
//! Picks the L-BFGS line search from [`MLEOptions`], wraps the model in an
//! [`ArgMinAdapter`] (which minimizes `-ℓ(θ)`), and hands off to
//! [`run_lbfgs`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` with L-BFGS.
///
/// # Behavior
/// - Validates the starting point via `f.check(&theta0, data)`.
/// - Builds the solver for `opts.line_searcher` and runs it.
///
/// # Errors
/// - Anything returned by `f.check`.
/// - Builder and runtime errors from the solver layer.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use copula_recursion::optimization::errors::OptResult;
/// use copula_recursion::optimization::loglik_optimizer::{
///     maximize, LineSearcher, LogLikelihood, MLEOptions, Theta, Tolerances,
/// };
///
/// struct Concave;
/// impl LogLikelihood for Concave {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let tols = Tolerances::new(Some(1e-8), None, Some(200))?;
/// let opts = MLEOptions::new(tols, LineSearcher::HagerZhang, false, None)?;
/// let out = maximize(&Concave, array![0.1, -0.2], &(), &opts)?;
/// println!("theta_hat = {:?}", out.theta_hat);
/// # Ok::<(), copula_recursion::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
