//! loglik_optimizer::builders — L-BFGS solver construction.
//!
//! Purpose
//! -------
//! Turn an [`MLEOptions`] into a configured L-BFGS solver for the
//! hyperparameter search, hiding Argmin's generic wiring from the model
//! layer.
//!
//! Key behaviors
//! -------------
//! - One builder per supported line search.
//! - [`configure_lbfgs`] applies the optional gradient and cost tolerances
//!   shared by both builders.
//!
//! Conventions
//! -----------
//! - Builders never set `theta0` or `max_iters`; those belong to the runner
//!   ([`run_lbfgs`](super::run::run_lbfgs)).
//! - The L-BFGS history size is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
//! - Argmin configuration errors surface as `OptError` through `OptResult`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// build_optimizer_hager_zhang — L-BFGS paired with a Hager–Zhang line search.
///
/// Errors
/// ------
/// - `OptError` when Argmin rejects a configured tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// build_optimizer_more_thuente — L-BFGS paired with a More–Thuente line search.
///
/// Errors
/// ------
/// - `OptError` when Argmin rejects a configured tolerance.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// configure_lbfgs — apply the optional tolerances in `opts.tols`.
///
/// Parameters
/// ----------
/// - `solver`: freshly constructed L-BFGS instance with any line search `L`.
/// - `opts`: source of `tol_grad` and `tol_cost`. A `None` tolerance keeps
///   Argmin's default.
///
/// Errors
/// ------
/// - `OptError` (via `From<argmin::core::Error>`) when a tolerance is
///   rejected by `with_tolerance_grad` / `with_tolerance_cost`.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
