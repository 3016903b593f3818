//! Executes a configured L-BFGS solver and summarizes its final state.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin_math::ArgminL2Norm;
use tracing::{debug, info};

/// Drive `solver` on `problem` from `theta0` and validate the result.
///
/// `opts.tols.max_iter` caps the run. `opts.verbose` logs the starting
/// log-likelihood and gradient norm at `debug`, and with the `obs_slog`
/// feature also streams every iteration to the terminal.
///
/// # Errors
/// - Solver failures, including model errors raised inside the cost, as
///   `OptError`.
/// - [`OptimOutcome::new`] validation failures.
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut executor = Executor::new(problem, solver).configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        executor = executor.add_observer(
            argmin_observer_slog::SlogLogger::term_noblock(),
            argmin::core::observers::ObserverMode::Always,
        );
    }
    if let Some(cap) = opts.tols.max_iter {
        executor = executor.configure(|state| state.max_iters(cap as u64));
    }

    let mut state = executor.run()?.state().clone();
    let best_loglik = -state.get_best_cost();
    let outcome = OptimOutcome::new(
        state.take_best_param(),
        best_loglik,
        state.get_termination_status().clone(),
        state.get_iter(),
        state.get_func_counts().clone(),
        state.take_gradient(),
    )?;
    info!(
        iterations = outcome.iterations,
        value = outcome.value,
        status = %outcome.status,
        "l-bfgs finished"
    );
    Ok(outcome)
}

fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let start = -problem.cost(theta0)?;
    let grad_norm = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    debug!(loglik = start, grad_norm = ?grad_norm, "l-bfgs starting point");
    Ok(())
}
