//! localizer — covariate-dependent mixing weights for regression.
//!
//! Purpose
//! -------
//! Rescale the base mixing weight `α_i` per stored point according to how
//! close that point's covariates are to the covariates of the observation
//! being absorbed (training) or evaluated (prediction).
//!
//! Key behaviors
//! -------------
//! - [`log_kernel`]: Gaussian-copula-type similarity
//!   `ln k(x, x') = −½ Σ ln(1 − ρ_m²) − Σ (ρ_m²(x_m² + x'_m²) − 2ρ_m x_m x'_m) / (2(1 − ρ_m²))`.
//! - [`CovariateLocalizer::localize`]: `ln α_x = ln(α k) − lae(ln(1 − α), ln(α k))`,
//!   clipped to `[ln 1e-5, ln(1 − 1e-5)]`, optionally with its gradient with
//!   respect to `ρ_x`.
//! - [`KernelChoice::Flat`] fixes `k = 1`, which turns localization off.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ρ_m` is clamped to `[0, 1 − ε]` (ε = [`CLIP_EPS`]) so `1 − ρ_m²` stays
//!   positive; a clamped `ρ_m` has zero sensitivity.
//! - The clip margin is [`LOCAL_ALPHA_EPS`], looser than the marginal one;
//!   a clipped weight has zero sensitivity.
use crate::optimization::numerical_stability::transformations::{
    CLIP_EPS, LOCAL_ALPHA_EPS, clip_with_flag, log_add_exp, log1m_exp,
};
use ndarray::{ArrayView1, ArrayViewMut1, Zip};

/// Covariate kernel used by the regression model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelChoice {
    /// Gaussian similarity with per-covariate correlations `ρ_x`.
    #[default]
    Gaussian,
    /// Constant `k = 1`; every stored point gets the base weight.
    Flat,
}

fn kernel_correlation(r: f64) -> (f64, bool) {
    clip_with_flag(r, 0.0, 1.0 - CLIP_EPS)
}

/// `ln k(x, x')` for the Gaussian kernel.
pub fn log_kernel(x: ArrayView1<f64>, x_new: ArrayView1<f64>, rho_x: ArrayView1<f64>) -> f64 {
    Zip::from(&x).and(&x_new).and(&rho_x).fold(0.0, |acc, &a, &b, &r| {
        let (r, _) = kernel_correlation(r);
        let det = 1.0 - r * r;
        acc - 0.5 * det.ln() - (r * r * (a * a + b * b) - 2.0 * r * a * b) / (2.0 * det)
    })
}

/// `ln k(x, x')` plus `∂ ln k / ∂ρ_m` written into `grad`.
pub fn log_kernel_grad(
    x: ArrayView1<f64>, x_new: ArrayView1<f64>, rho_x: ArrayView1<f64>,
    mut grad: ArrayViewMut1<f64>,
) -> f64 {
    let mut value = 0.0;
    Zip::from(&x).and(&x_new).and(&rho_x).and(&mut grad).for_each(|&a, &b, &r, g| {
        let (r, clamped) = kernel_correlation(r);
        let det = 1.0 - r * r;
        let sq = a * a + b * b;
        let cross = a * b;
        let quad = r * r * sq - 2.0 * r * cross;
        value += -0.5 * det.ln() - quad / (2.0 * det);
        *g = if clamped {
            0.0
        } else {
            r / det - ((r * sq - cross) * det + r * quad) / (det * det)
        };
    });
    value
}

/// Maps base mixing weights to covariate-localized ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CovariateLocalizer {
    pub kernel: KernelChoice,
}

impl CovariateLocalizer {
    pub fn new(kernel: KernelChoice) -> Self {
        CovariateLocalizer { kernel }
    }

    /// `ln α_x` for a stored point `x` against the point `x_new`.
    pub fn localize(
        &self, log_alpha: f64, x: ArrayView1<f64>, x_new: ArrayView1<f64>,
        rho_x: ArrayView1<f64>,
    ) -> f64 {
        let log_k = match self.kernel {
            KernelChoice::Gaussian => log_kernel(x, x_new, rho_x),
            KernelChoice::Flat => 0.0,
        };
        localized_weight(log_alpha, log_k).0
    }

    /// Like [`localize`](Self::localize), also writing `∂ ln α_x / ∂ρ_x`
    /// into `grad`.
    pub fn localize_grad(
        &self, log_alpha: f64, x: ArrayView1<f64>, x_new: ArrayView1<f64>,
        rho_x: ArrayView1<f64>, mut grad: ArrayViewMut1<f64>,
    ) -> f64 {
        let log_k = match self.kernel {
            KernelChoice::Gaussian => log_kernel_grad(x, x_new, rho_x, grad.view_mut()),
            KernelChoice::Flat => {
                grad.fill(0.0);
                0.0
            }
        };
        let (value, slope) = localized_weight(log_alpha, log_k);
        grad.mapv_inplace(|g| g * slope);
        value
    }
}

/// Clipped `ln α_x` and its derivative with respect to `ln k`.
///
/// `∂ ln α_x / ∂ ln k = (1 − α) / (1 − α + α k)`, or zero when clipped.
fn localized_weight(log_alpha: f64, log_k: f64) -> (f64, f64) {
    let l1a = log1m_exp(log_alpha);
    let lak = log_alpha + log_k;
    let norm = log_add_exp(l1a, lak);
    let (value, clipped) =
        clip_with_flag(lak - norm, LOCAL_ALPHA_EPS.ln(), (-LOCAL_ALPHA_EPS).ln_1p());
    let slope = if clipped { 0.0 } else { (l1a - norm).exp() };
    (value, slope)
}
