//! numerical_stability — guarded log-space arithmetic and normal primitives.
//!
//! Purpose
//! -------
//! Collect the small numerical building blocks the copula recursion leans on
//! in its inner loops: log-domain sums, the standard-normal CDF / density /
//! quantile, the correlation reparameterization, and the clipping margins that
//! keep every probability-like quantity strictly inside (0, 1).
//!
//! Key behaviors
//! -------------
//! - Stable scalar helpers (`log_add_exp`, `log_sum_exp`, `log1m_exp`,
//!   `safe_logistic`) that never overflow for finite inputs.
//! - Standard-normal primitives built on `statrs`' `erfc` / `erfc_inv`.
//! - The `ρ = 1 / (1 + exp(h))` transform, its inverse, and `dρ/dh`.
//! - Shared clipping constants `CLIP_EPS` (1e-6) and `LOCAL_ALPHA_EPS`
//!   (1e-5).
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite `f64` unless a helper documents `-∞` handling.
//! - Shape and domain validation happens upstream in the recursion layer.
//!
//! Conventions
//! -----------
//! - Pure functions only; no logging, allocation, or global state.
//!
//! Downstream usage
//! ----------------
//! - The recursion core uses these helpers for marginal seeding, the copula
//!   link, step updates, and permutation averaging.
//! - Models use the ρ transform to move between optimizer space and
//!   correlation space.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] compare each helper with its naïve
//!   formula on safe grids and check the ρ-transform Jacobian by finite
//!   differences.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    CLIP_EPS, LOCAL_ALPHA_EPS, clip_with_flag, hyper_from_rho, log_add_exp, log_sum_exp,
    log1m_exp, rho_from_hyper, rho_jacobian, safe_logistic, std_normal_inv_cdf,
    std_normal_log_cdf, std_normal_log_pdf,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use copula_recursion::optimization::numerical_stability::prelude::*;
//
// to import the main numerical-stability surface in a single line.

pub mod prelude {
    pub use super::transformations::{
        CLIP_EPS, LOCAL_ALPHA_EPS, hyper_from_rho, log_add_exp, log_sum_exp, rho_from_hyper,
    };
}
