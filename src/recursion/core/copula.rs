//! Bivariate copula link used by the recursion update.
//!
//! Purpose
//! -------
//! Supply the conditional copula distribution `C(u | v; ρ)` (the h-function)
//! and the copula density `c(u, v; ρ)`, both in log space, together with
//! their partial derivatives. The update rule only ever sees a link through
//! the [`CopulaLink`] trait.
//!
//! Key behaviors
//! -------------
//! - [`GaussianCopula`] implements the bivariate Gaussian copula:
//!   with `a = Φ⁻¹(u)`, `b = Φ⁻¹(v)` and `D = 1 − ρ²`,
//!   `ln C = ln Φ((a − ρb)/√D)` and
//!   `ln c = −½ ln D − (ρ²(a² + b²) − 2ρab) / (2D)`.
//! - [`CopulaLink::partials`] returns the derivatives with respect to
//!   `ln u`, `ln v` and `ρ`, which drive the sensitivity recursion.
//!
//! Invariants & assumptions
//! ------------------------
//! - `u` and `v` are clipped to `[ε, 1 − ε]` before the normal quantile, and
//!   `ln C` is clipped to `[ln ε, ln(1 − ε)]`; a clipped input or output has
//!   zero derivative.
//! - `ρ` is clamped to `[0, 1 − ε]`, so `1 − ρ²` never reaches zero even when
//!   `ρ = 1 / (1 + exp(h))` rounds to one; a clamped `ρ` has zero derivative.
//! - As `ρ → 0` the link tends to `ln C = ln u`, `ln c = 0`.
use crate::optimization::numerical_stability::transformations::{
    CLIP_EPS, clip_with_flag, std_normal_inv_cdf, std_normal_log_cdf, std_normal_log_pdf,
};

/// Log copula values and their partial derivatives at one `(u, v, ρ)`.
///
/// Derivatives are taken with respect to `ln u`, `ln v` and `ρ`, matching the
/// log-space state of the recursion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPartials {
    pub log_cdf: f64,
    pub log_density: f64,
    pub dcdf_dlogu: f64,
    pub dcdf_dlogv: f64,
    pub dcdf_drho: f64,
    pub ddens_dlogu: f64,
    pub ddens_dlogv: f64,
    pub ddens_drho: f64,
}

/// A bivariate copula usable by the recursion update.
///
/// Implementations must be pure: the same `(u, v, ρ)` always gives the same
/// output, so independent chains can share one link across threads.
pub trait CopulaLink: Send + Sync {
    /// `(ln C(u | v; ρ), ln c(u, v; ρ))`.
    fn log_cdf_density(&self, u: f64, v: f64, rho: f64) -> (f64, f64);

    /// Values plus derivatives with respect to `ln u`, `ln v` and `ρ`.
    fn partials(&self, u: f64, v: f64, rho: f64) -> LinkPartials;
}

/// Bivariate Gaussian copula with clipping margin `eps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianCopula {
    pub eps: f64,
}

impl Default for GaussianCopula {
    fn default() -> Self {
        GaussianCopula { eps: CLIP_EPS }
    }
}

impl GaussianCopula {
    /// Normal score of a clipped probability and its derivative in log space.
    fn score(&self, p: f64) -> (f64, f64) {
        let (p, clipped) = clip_with_flag(p, self.eps, 1.0 - self.eps);
        let q = std_normal_inv_cdf(p);
        // dq / d ln p = p / φ(q)
        let dq_dlogp = if clipped { 0.0 } else { (p.ln() - std_normal_log_pdf(q)).exp() };
        (q, dq_dlogp)
    }

    fn correlation(&self, rho: f64) -> (f64, bool) {
        clip_with_flag(rho, 0.0, 1.0 - self.eps)
    }
}

impl CopulaLink for GaussianCopula {
    fn log_cdf_density(&self, u: f64, v: f64, rho: f64) -> (f64, f64) {
        let (a, _) = self.score(u);
        let (b, _) = self.score(v);
        let (rho, _) = self.correlation(rho);
        let det = 1.0 - rho * rho;
        let z = (a - rho * b) / det.sqrt();
        let log_cdf = std_normal_log_cdf(z).clamp(self.eps.ln(), (-self.eps).ln_1p());
        let quad = -rho * rho * (a * a + b * b) + 2.0 * rho * a * b;
        (log_cdf, -0.5 * det.ln() + quad / (2.0 * det))
    }

    fn partials(&self, u: f64, v: f64, rho: f64) -> LinkPartials {
        let (a, da) = self.score(u);
        let (b, db) = self.score(v);
        let (rho, rho_clipped) = self.correlation(rho);
        let live = if rho_clipped { 0.0 } else { 1.0 };
        let det = 1.0 - rho * rho;
        let s = det.sqrt();
        let z = (a - rho * b) / s;

        let raw_log_cdf = std_normal_log_cdf(z);
        let (log_cdf, clipped) = clip_with_flag(raw_log_cdf, self.eps.ln(), (-self.eps).ln_1p());
        // d ln Φ(z) / dz = φ(z) / Φ(z)
        let mills = if clipped { 0.0 } else { (std_normal_log_pdf(z) - raw_log_cdf).exp() };

        let quad = -rho * rho * (a * a + b * b) + 2.0 * rho * a * b;
        let dquad_drho = -2.0 * rho * (a * a + b * b) + 2.0 * a * b;
        let log_density = -0.5 * det.ln() + quad / (2.0 * det);

        LinkPartials {
            log_cdf,
            log_density,
            dcdf_dlogu: mills / s * da,
            dcdf_dlogv: -mills * rho / s * db,
            dcdf_drho: live * mills * (rho * a - b) / (s * det),
            ddens_dlogu: rho * (b - rho * a) / det * da,
            ddens_dlogv: rho * (a - rho * b) / det * db,
            ddens_drho: live
                * (rho / det + dquad_drho / (2.0 * det) + quad * rho / (det * det)),
        }
    }
}
