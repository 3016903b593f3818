//! Numerical stability utilities.
//!
//! Provides guarded log-space arithmetic, standard-normal primitives, and the
//! correlation transform used by the copula recursion. Naïve forms of these
//! expressions overflow or lose precision at the extremes the recursion
//! routinely visits (CDF values within 1e-6 of 0 or 1, mixing weights close
//! to zero after thousands of steps).
//!
//! # Provided items
//! - [`CLIP_EPS`] / [`LOCAL_ALPHA_EPS`]: clipping margins for probability-like
//!   quantities (1e-6) and for localized mixing weights (1e-5).
//! - [`log_add_exp`], [`log_sum_exp`], [`log1m_exp`]: stable log-domain sums.
//! - [`safe_logistic`]: overflow-free logistic map.
//! - [`rho_from_hyper`], [`hyper_from_rho`], [`rho_jacobian`]: the
//!   `ρ = 1 / (1 + exp(h))` reparameterization and its derivative.
//! - [`std_normal_log_cdf`], [`std_normal_log_pdf`], [`std_normal_inv_cdf`]:
//!   standard-normal primitives built on `statrs`' `erfc` / `erfc_inv`.
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{LN_2, SQRT_2};

/// Clipping margin for CDF values at initialization and inside the copula
/// link: every probability-like scalar is kept in `[ε, 1 − ε]`.
pub const CLIP_EPS: f64 = 1e-6;

/// Clipping margin for covariate-localized mixing weights.
///
/// Looser than [`CLIP_EPS`]; tightening it to 1e-6 makes the regression
/// objective's gradient unstable under L-BFGS.
pub const LOCAL_ALPHA_EPS: f64 = 1e-5;

/// `0.5 · ln(2π)`.
const HALF_LN_2PI: f64 = 0.918_938_533_204_672_8;

/// Numerically stable `ln(exp(a) + exp(b))`.
///
/// Returns `-∞` when both arguments are `-∞`; otherwise factors out the
/// larger argument so the remaining exponential is at most one.
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let lo = a.min(b);
    hi + (lo - hi).exp().ln_1p()
}

/// Numerically stable `ln Σ exp(xᵢ)` over an iterator.
///
/// An empty iterator returns `-∞` (log of an empty sum).
pub fn log_sum_exp<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let hi = iter.clone().fold(f64::NEG_INFINITY, f64::max);
    if hi == f64::NEG_INFINITY || !hi.is_finite() {
        return hi;
    }
    hi + iter.map(|x| (x - hi).exp()).sum::<f64>().ln()
}

/// Stable `ln(1 − exp(x))` for `x ≤ 0`.
///
/// Uses `ln(−expm1(x))` near zero and `ln1p(−exp(x))` in the tail (Mächler's
/// split at `−ln 2`).
pub fn log1m_exp(x: f64) -> f64 {
    if x > -LN_2 { (-x.exp_m1()).ln() } else { (-x.exp()).ln_1p() }
}

/// Numerically stable logistic `σ(x) = 1 / (1 + exp(−x))`.
///
/// Evaluates `exp` only on non-positive arguments so neither branch
/// overflows.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Map an unconstrained hyperparameter `h` to a correlation `ρ ∈ (0, 1)`.
///
/// `ρ = 1 / (1 + exp(h)) = σ(−h)`, so `h = 0` gives `ρ = 0.5` and large
/// positive `h` pushes `ρ` toward zero.
pub fn rho_from_hyper(h: f64) -> f64 {
    safe_logistic(-h)
}

/// Inverse of [`rho_from_hyper`]: `h = ln((1 − ρ) / ρ)` for `ρ ∈ (0, 1)`.
pub fn hyper_from_rho(rho: f64) -> f64 {
    (1.0 - rho).ln() - rho.ln()
}

/// Derivative `dρ/dh` of [`rho_from_hyper`] expressed through `ρ`.
pub fn rho_jacobian(rho: f64) -> f64 {
    -rho * (1.0 - rho)
}

/// `ln Φ(x)` for the standard normal CDF.
///
/// Computed as `ln(½ · erfc(−x / √2))`, which keeps relative precision in the
/// lower tail where `Φ(x)` itself underflows toward zero.
pub fn std_normal_log_cdf(x: f64) -> f64 {
    (0.5 * erfc(-x / SQRT_2)).ln()
}

/// `ln φ(x)` for the standard normal density.
pub fn std_normal_log_pdf(x: f64) -> f64 {
    -0.5 * x * x - HALF_LN_2PI
}

/// Standard normal quantile `Φ⁻¹(p)` for `p ∈ (0, 1)`.
///
/// Uses `Φ⁻¹(p) = −√2 · erfc⁻¹(2p)`.
pub fn std_normal_inv_cdf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Clamp `x` into `[lo, hi]`, reporting whether the clamp was active.
///
/// The flag lets derivative code zero out the sensitivity of clipped values.
pub fn clip_with_flag(x: f64, lo: f64, hi: f64) -> (f64, bool) {
    if x < lo {
        (lo, true)
    } else if x > hi {
        (hi, true)
    } else {
        (x, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of the stable log-space helpers with naïve formulas on safe
    //   grids, plus their behavior at -∞.
    // - The ρ ↔ h reparameterization and its derivative.
    // - Standard-normal primitives against known values.
    //
    // They intentionally DO NOT cover:
    // - Higher-level recursion behavior built on these helpers.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `log_add_exp` matches the direct formula and handles -∞ operands.
    //
    // Given
    // -----
    // - Moderate inputs (-1.3, 0.4) and the pairs (-∞, 2.0), (-∞, -∞).
    //
    // Expect
    // ------
    // - Agreement with `ln(eᵃ + eᵇ)` to 1e-14.
    // - `(-∞, b)` returns `b`; `(-∞, -∞)` returns `-∞`.
    fn log_add_exp_matches_naive_and_handles_neg_infinity() {
        let naive = ((-1.3f64).exp() + 0.4f64.exp()).ln();
        assert_relative_eq!(log_add_exp(-1.3, 0.4), naive, epsilon = 1e-14);
        assert_eq!(log_add_exp(f64::NEG_INFINITY, 2.0), 2.0);
        assert_eq!(log_add_exp(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    // Purpose
    // -------
    // `log_sum_exp` is stable for large magnitudes.
    //
    // Given
    // -----
    // - Three equal entries of 1000.0.
    //
    // Expect
    // ------
    // - Result equals `1000 + ln 3` without overflow.
    fn log_sum_exp_is_shift_stable() {
        let out = log_sum_exp([1000.0, 1000.0, 1000.0]);
        assert_relative_eq!(out, 1000.0 + 3.0f64.ln(), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // `log1m_exp` agrees with `ln(1 − eˣ)` on both sides of the split.
    //
    // Given
    // -----
    // - x = -0.1 (near-zero branch) and x = -5.0 (tail branch).
    //
    // Expect
    // ------
    // - Agreement with the naïve formula to 1e-13.
    fn log1m_exp_matches_naive_on_both_branches() {
        for &x in &[-0.1f64, -5.0] {
            assert_relative_eq!(log1m_exp(x), (1.0 - x.exp()).ln(), epsilon = 1e-13);
        }
    }

    #[test]
    // Purpose
    // -------
    // The correlation transform is invertible and its Jacobian matches a
    // central difference.
    //
    // Given
    // -----
    // - h ∈ {-3, 0, 2.5}.
    //
    // Expect
    // ------
    // - `hyper_from_rho(rho_from_hyper(h)) ≈ h`.
    // - `rho_from_hyper(0) = 0.5`.
    // - `rho_jacobian` matches the finite difference to 1e-7.
    fn rho_transform_round_trips_and_has_correct_jacobian() {
        assert_eq!(rho_from_hyper(0.0), 0.5);
        for &h in &[-3.0f64, 0.0, 2.5] {
            let rho = rho_from_hyper(h);
            assert!(rho > 0.0 && rho < 1.0);
            assert_relative_eq!(hyper_from_rho(rho), h, epsilon = 1e-12);
            let step = 1e-6;
            let fd = (rho_from_hyper(h + step) - rho_from_hyper(h - step)) / (2.0 * step);
            assert_relative_eq!(rho_jacobian(rho), fd, epsilon = 1e-7);
        }
    }

    #[test]
    // Purpose
    // -------
    // Standard-normal helpers agree with reference values.
    //
    // Given
    // -----
    // - Φ(0) = 0.5, Φ(1.959963984540054) = 0.975, ln φ(0) = −½ ln 2π.
    //
    // Expect
    // ------
    // - log-CDF, quantile and log-density match to 1e-9.
    fn std_normal_helpers_match_reference_values() {
        assert_relative_eq!(std_normal_log_cdf(0.0), 0.5f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(std_normal_log_cdf(1.959963984540054), 0.975f64.ln(), epsilon = 1e-9);
        assert_relative_eq!(std_normal_inv_cdf(0.975), 1.959963984540054, epsilon = 1e-9);
        assert_relative_eq!(std_normal_log_pdf(0.0), -HALF_LN_2PI, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // `clip_with_flag` reports when the bound was applied.
    //
    // Given
    // -----
    // - Values below, inside, and above `[0, 1]`.
    //
    // Expect
    // ------
    // - Clamped value plus `true` outside, untouched value plus `false` inside.
    fn clip_with_flag_reports_active_bounds() {
        assert_eq!(clip_with_flag(-0.5, 0.0, 1.0), (0.0, true));
        assert_eq!(clip_with_flag(0.5, 0.0, 1.0), (0.5, false));
        assert_eq!(clip_with_flag(1.5, 0.0, 1.0), (1.0, true));
    }
}
