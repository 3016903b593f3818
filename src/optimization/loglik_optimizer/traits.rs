//! Types shared by the prequential-likelihood maximizer.
//!
//! Models expose their objective through [`LogLikelihood`]; callers configure
//! the solver with [`MLEOptions`] (stopping rules in [`Tolerances`], the line
//! search in [`LineSearcher`]) and receive an [`OptimOutcome`].
//!
//! Sign convention: models report the log-likelihood `ℓ(h)` and its gradient
//! `∇ℓ(h)`. The solver minimizes `−ℓ(h)`, so the argmin adapter negates both.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Objective a model hands to [`maximize`](super::maximize).
///
/// `Data` is whatever the model evaluates against (a sample container for the
/// recursion models). `check` runs once before the first iteration and should
/// reject hyperparameter/sample combinations the model cannot evaluate.
/// Models without an analytic gradient keep the default `grad`, which makes
/// the adapter fall back to central differences.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search run inside each L-BFGS iteration.
///
/// Parsed from its name, ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("morethuente") {
            Ok(LineSearcher::MoreThuente)
        } else if s.eq_ignore_ascii_case("hagerzhang") {
            Ok(LineSearcher::HagerZhang)
        } else {
            Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "expected 'MoreThuente' or 'HagerZhang'",
            })
        }
    }
}

/// Solver configuration.
///
/// `verbose` attaches the slog observer when the crate is built with
/// `obs_slog`; otherwise it only raises the `tracing` level of the run
/// summary. `lbfgs_mem = None` means [`DEFAULT_LBFGS_MEM`](super::DEFAULT_LBFGS_MEM).
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// # Errors
    /// [`OptError::InvalidLBFGSMem`] for `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(OptError::InvalidLBFGSMem { mem: 0, reason: "must be positive" });
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    /// Gradient tolerance `1e-6`, at most 300 iterations, More–Thuente.
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(300) },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules. The solver stops at whichever active rule fires first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Gradient-norm threshold.
    pub tol_grad: Option<f64>,
    /// Threshold on the change in `−ℓ(h)` between iterations.
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Validate and bundle the stopping rules.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] when every rule is `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for a
    ///   threshold that is not finite and positive.
    /// - [`OptError::InvalidMaxIter`] for `max_iter == Some(0)`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_grad(tol_grad)?;
        verify_tol_cost(tol_cost)?;
        if max_iter == Some(0) {
            return Err(OptError::InvalidMaxIter { max_iter: 0, reason: "must be positive" });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Validated summary of a finished solve.
///
/// `value` is the best log-likelihood `ℓ(ĥ)`, not the solver cost.
/// `converged` is `false` only when the solver stopped without a termination
/// reason. `grad_norm` is the L2 norm of the last gradient the solver kept.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// # Errors
    /// Missing or non-finite `theta_hat`, or a non-finite `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argmin::core::TerminationReason;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `LineSearcher` parsing.
    // - Validation in `Tolerances::new` and `MLEOptions::new`.
    // - Status mapping and validation in `OptimOutcome::new`.
    //
    // They intentionally DO NOT cover:
    // - Solver execution (see `api` and `builders`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Line-search names parse case-insensitively; unknown names are rejected.
    //
    // Given
    // -----
    // - "morethuente", "HAGERZHANG", and "bisection".
    //
    // Expect
    // ------
    // - The first two parse; the last yields `InvalidLineSearch`.
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("morethuente".parse::<LineSearcher>(), Ok(LineSearcher::MoreThuente));
        assert_eq!("HAGERZHANG".parse::<LineSearcher>(), Ok(LineSearcher::HagerZhang));
        assert!(matches!(
            "bisection".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `Tolerances::new` enforces its construction rules.
    //
    // Given
    // -----
    // - All-`None`, a negative gradient tolerance, and `max_iter = 0`.
    //
    // Expect
    // ------
    // - `NoTolerancesProvided`, `InvalidTolGrad`, `InvalidMaxIter` respectively.
    fn tolerances_new_rejects_invalid_configurations() {
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(Some(-1.0), None, None),
            Err(OptError::InvalidTolGrad { .. })
        ));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `MLEOptions::new` rejects a zero L-BFGS memory and the default is valid.
    //
    // Given
    // -----
    // - `lbfgs_mem = Some(0)`; `MLEOptions::default()`.
    //
    // Expect
    // ------
    // - `InvalidLBFGSMem` for the former; documented defaults for the latter.
    fn mle_options_validates_memory_and_default_is_sane() {
        let tols = Tolerances::new(Some(1e-6), None, Some(10)).unwrap();
        assert!(matches!(
            MLEOptions::new(tols, LineSearcher::MoreThuente, false, Some(0)),
            Err(OptError::InvalidLBFGSMem { .. })
        ));
        let default = MLEOptions::default();
        assert_eq!(default.tols, Tolerances::new(Some(1e-6), None, Some(300)).unwrap());
        assert_eq!(default.line_searcher, LineSearcher::MoreThuente);
        assert!(default.lbfgs_mem.is_none());
    }

    #[test]
    // Purpose
    // -------
    // `OptimOutcome::new` maps termination status and rejects bad estimates.
    //
    // Given
    // -----
    // - A solver-converged status with a finite `theta_hat`.
    // - A missing `theta_hat`.
    //
    // Expect
    // ------
    // - `converged = true` and the gradient norm is computed.
    // - `MissingThetaHat` for the missing estimate.
    fn optim_outcome_new_maps_status_and_validates() {
        let out = OptimOutcome::new(
            Some(array![0.1, 0.2]),
            -1.5,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            4,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
        )
        .unwrap();
        assert!(out.converged);
        assert_eq!(out.iterations, 4);
        assert_eq!(out.grad_norm, Some(5.0));

        let missing = OptimOutcome::new(
            None,
            0.0,
            TerminationStatus::NotTerminated,
            0,
            FnEvalMap::new(),
            None,
        );
        assert_eq!(missing, Err(OptError::MissingThetaHat));
    }
}
