//! Numeric aliases for the hyperparameter search and the argmin solver types
//! built from them.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

/// Unconstrained hyperparameters `h`; correlations are `ρ = 1/(1 + eʰ)`.
pub type Theta = Array1<f64>;

/// Gradient with respect to `h`, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// argmin's evaluation counters, keyed by counter name.
pub type FnEvalMap = HashMap<String, u64>;

/// L-BFGS history size used when `MLEOptions::lbfgs_mem` is `None`.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
