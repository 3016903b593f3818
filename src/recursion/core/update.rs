//! update — the single-observation copula update and its sensitivities.
//!
//! Purpose
//! -------
//! Advance one state row `(ln P_k(y_k | y_{<k}), ln p(y_{≤k}))` by absorbing
//! one observation, summarized by its reference CDF values `v`, with mixing
//! weight `α` and per-coordinate correlations `ρ`.
//!
//! Key behaviors
//! -------------
//! - [`log_mixing_weight`]: the fixed schedule
//!   `α_i = (2 − 1/(i + 1)) / (i + 2)` in log space.
//! - [`copula_step`]: value-only update used by the objective and by
//!   test-time replay.
//! - [`copula_step_tangent`]: the same update plus forward-mode tangents of
//!   the state with respect to the correlation parameters.
//!
//! Update rule
//! -----------
//! For coordinate `j`, with `(ln C_j, ln c_j)` from the copula link at
//! `(u_j, v_j, ρ_j)`, `S_j = Σ_{m ≤ j} ln c_m` and `S'_j = S_{j−1}` (`S'_0 = 0`):
//!
//! ```text
//! ln P'_j = lae(ln(1−α) + ln P_j, ln α + S'_j + ln C_j) − lae(ln(1−α), ln α + S'_j)
//! ln p'_j = ln p_j + lae(ln(1−α), ln α + S_j)
//! ```
//!
//! where `lae` is [`log_add_exp`]. The staggered sum `S'_j` makes coordinate
//! `j` depend only on the coordinates before it.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ln α < 0`; the new log CDF is a convex combination of the old one and
//!   the copula h-function, so it stays in `[ln ε, ln(1 − ε)]`.
//! - Tangent arrays are `d × k`, column `q` holding derivatives with respect
//!   to correlation parameter `q`; `rho_param[j]` names the parameter that
//!   drives `ρ_j`.
use crate::optimization::numerical_stability::transformations::{log_add_exp, log1m_exp};
use crate::recursion::core::copula::CopulaLink;
use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

/// `ln α_i` for step index `i` (0-based).
pub fn log_mixing_weight(i: usize) -> f64 {
    let i = i as f64;
    (2.0 - 1.0 / (i + 1.0)).ln() - (i + 2.0).ln()
}

/// Inputs shared by every coordinate of one update.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    /// Reference CDF values of the absorbed observation (length d).
    pub v: ArrayView1<'a, f64>,
    /// `ln α` for this row.
    pub log_alpha: f64,
    /// Per-coordinate correlations (length d).
    pub rho: ArrayView1<'a, f64>,
}

/// Tangents of the step inputs with respect to the `k` correlation parameters.
#[derive(Debug, Clone, Copy)]
pub struct StepSeed<'a> {
    /// `∂ ln v / ∂θ`, shape `d × k`.
    pub dlogv: ArrayView2<'a, f64>,
    /// `∂ ln α / ∂θ`, length `k`.
    pub dlog_alpha: ArrayView1<'a, f64>,
    /// Parameter index driving `ρ_j`, length `d`.
    pub rho_param: &'a [usize],
}

/// Log-domain pieces of the update for one coordinate.
struct Blend {
    num: f64,
    den: f64,
    inc: f64,
}

fn blend(l1a: f64, la: f64, log_cdf: f64, stag: f64, cum: f64, log_cop_cdf: f64) -> Blend {
    Blend {
        num: log_add_exp(l1a + log_cdf, la + stag + log_cop_cdf),
        den: log_add_exp(l1a, la + stag),
        inc: log_add_exp(l1a, la + cum),
    }
}

/// Absorb one observation into a state row in place.
pub fn copula_step<C: CopulaLink>(
    link: &C, input: &StepInput<'_>, mut logcdf: ArrayViewMut1<f64>,
    mut logpdf: ArrayViewMut1<f64>,
) {
    let la = input.log_alpha;
    let l1a = log1m_exp(la);
    let mut cum = 0.0;
    for j in 0..logcdf.len() {
        let (log_cop_cdf, log_cop_dens) =
            link.log_cdf_density(logcdf[j].exp(), input.v[j], input.rho[j]);
        let stag = cum;
        cum += log_cop_dens;
        let b = blend(l1a, la, logcdf[j], stag, cum, log_cop_cdf);
        logcdf[j] = b.num - b.den;
        logpdf[j] += b.inc;
    }
}

/// Absorb one observation and propagate the state tangents.
///
/// Values are identical to [`copula_step`]. Each log-sum-exp is
/// differentiated through its softmax weights, e.g.
/// `d lae(a, b) = w·da + (1 − w)·db` with `w = exp(a − lae(a, b))`.
pub fn copula_step_tangent<C: CopulaLink>(
    link: &C, input: &StepInput<'_>, seed: &StepSeed<'_>, mut logcdf: ArrayViewMut1<f64>,
    mut logpdf: ArrayViewMut1<f64>, mut dlogcdf: ArrayViewMut2<f64>,
    mut dlogpdf: ArrayViewMut2<f64>,
) {
    let la = input.log_alpha;
    let l1a = log1m_exp(la);
    // d ln(1 − α) = −α / (1 − α) · d ln α
    let l1a_slope = -(la - l1a).exp();
    let k = dlogcdf.ncols();
    let mut dcum = vec![0.0; k];
    let mut cum = 0.0;
    for j in 0..logcdf.len() {
        let old = logcdf[j];
        let p = link.partials(old.exp(), input.v[j], input.rho[j]);
        let stag = cum;
        cum += p.log_density;
        let b = blend(l1a, la, old, stag, cum, p.log_cdf);

        let keep_num = (l1a + old - b.num).exp();
        let new_num = (la + stag + p.log_cdf - b.num).exp();
        let keep_den = (l1a - b.den).exp();
        let new_den = (la + stag - b.den).exp();
        let keep_inc = (l1a - b.inc).exp();
        let new_inc = (la + cum - b.inc).exp();

        for q in 0..k {
            let drho = if seed.rho_param[j] == q { 1.0 } else { 0.0 };
            let dl = dlogcdf[[j, q]];
            let dv = seed.dlogv[[j, q]];
            let dcop_cdf = p.dcdf_dlogu * dl + p.dcdf_dlogv * dv + p.dcdf_drho * drho;
            let dcop_dens = p.ddens_dlogu * dl + p.ddens_dlogv * dv + p.ddens_drho * drho;
            let dla = seed.dlog_alpha[q];
            let dl1a = l1a_slope * dla;
            let dstag = dcum[q];
            dcum[q] += dcop_dens;

            dlogcdf[[j, q]] = keep_num * (dl1a + dl) + new_num * (dla + dstag + dcop_cdf)
                - keep_den * dl1a
                - new_den * (dla + dstag);
            dlogpdf[[j, q]] += keep_inc * dl1a + new_inc * (dla + dcum[q]);
        }
        logcdf[j] = b.num - b.den;
        logpdf[j] += b.inc;
    }
}
