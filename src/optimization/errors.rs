//! Errors for the hyperparameter optimizer.
//!
//! [`OptError`] is the single error surface of `optimization`: invalid
//! configuration, invalid gradients or outcomes, failures raised by argmin,
//! and recursion-model errors surfaced while the solver evaluates `ℓ(h)`.
//!
//! ## Conventions
//! - Argmin's own error kinds collapse into [`OptError::Solver`], tagged
//!   with the kind; an `OptError` that travelled through argmin's boxed error
//!   is recovered unchanged.
//! - Structured recursion errors that describe a bad `h` or sample keep
//!   their payload; everything else becomes [`OptError::ModelFailure`].
use argmin::core::{ArgminError, Error};

use crate::recursion::errors::RecursionError;

/// Result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// The model has no analytic gradient; finite differences are used.
    GradientNotImplemented,

    /// Gradient length differs from the hyperparameter length.
    GradientDimMismatch { expected: usize, found: usize },

    /// A gradient component is NaN/±inf.
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- Configuration ----
    InvalidTolGrad { tol: f64, reason: &'static str },
    InvalidTolCost { tol: f64, reason: &'static str },
    InvalidMaxIter { max_iter: usize, reason: &'static str },
    /// None of `tol_grad`, `tol_cost`, `max_iter` was set.
    NoTolerancesProvided,
    InvalidLineSearch { name: String, reason: &'static str },
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Evaluation and outcome ----
    /// The log-likelihood evaluated to NaN/±inf.
    NonFiniteCost { value: f64 },
    /// The best hyperparameters contain NaN/±inf.
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },
    /// The solver finished without best hyperparameters.
    MissingThetaHat,

    // ---- Argmin ----
    /// An argmin error; `kind` names the argmin error kind.
    Solver { kind: &'static str, text: String },

    // ---- Recursion model ----
    /// Hyperparameter vector has the wrong length for the model.
    HyperLengthMismatch { expected: usize, actual: usize },
    /// A hyperparameter is NaN/±inf.
    NonFiniteHyper { index: usize, value: f64 },
    /// Sample size differs from the one the permutations were drawn for.
    SampleSizeMismatch { expected: usize, actual: usize },
    /// Any other recursion-model failure, carried as its message.
    ModelFailure { text: String },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::GradientNotImplemented => write!(f, "Analytic gradient not implemented"),
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient has length {found}; expected {expected}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Gradient component {index} is {value}: {reason}")
            }
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost-change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid iteration cap {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "At least one stopping rule must be provided")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Unknown line search '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }
            OptError::NonFiniteCost { value } => {
                write!(f, "Log-likelihood evaluated to a non-finite value: {value}")
            }
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Fitted hyperparameter {index} is {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Solver returned no best hyperparameters"),
            OptError::Solver { kind, text } => write!(f, "Solver error ({kind}): {text}"),
            OptError::HyperLengthMismatch { expected, actual } => {
                write!(f, "Hyperparameter vector has length {actual}; expected {expected}")
            }
            OptError::NonFiniteHyper { index, value } => {
                write!(f, "Hyperparameter at index {index} must be finite, got {value}")
            }
            OptError::SampleSizeMismatch { expected, actual } => {
                write!(f, "Sample size mismatch: model expects {expected} rows, data has {actual}")
            }
            OptError::ModelFailure { text } => write!(f, "Model failure: {text}"),
        }
    }
}

fn argmin_kind(err: &ArgminError) -> &'static str {
    match err {
        ArgminError::InvalidParameter { .. } => "invalid parameter",
        ArgminError::NotImplemented { .. } => "not implemented",
        ArgminError::NotInitialized { .. } => "not initialized",
        ArgminError::ConditionViolated { .. } => "condition violated",
        ArgminError::CheckpointNotFound { .. } => "checkpoint not found",
        ArgminError::PotentialBug { .. } => "potential bug",
        ArgminError::ImpossibleError { .. } => "impossible error",
        _ => "unknown",
    }
}

impl From<Error> for OptError {
    fn from(err: Error) -> Self {
        let err = match err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match err.downcast::<ArgminError>() {
            Ok(argmin_err) => {
                OptError::Solver { kind: argmin_kind(&argmin_err), text: argmin_err.to_string() }
            }
            Err(other) => OptError::Solver { kind: "backend", text: other.to_string() },
        }
    }
}

impl From<RecursionError> for OptError {
    fn from(err: RecursionError) -> Self {
        match err {
            RecursionError::HyperLengthMismatch { expected, actual } => {
                OptError::HyperLengthMismatch { expected, actual }
            }
            RecursionError::NonFiniteHyper { index, value } => {
                OptError::NonFiniteHyper { index, value }
            }
            RecursionError::SampleSizeMismatch { expected, actual } => {
                OptError::SampleSizeMismatch { expected, actual }
            }
            other => OptError::ModelFailure { text: other.to_string() },
        }
    }
}
