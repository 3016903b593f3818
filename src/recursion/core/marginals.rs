//! Standard-normal seeding of the recursion state.
//!
//! Every chain starts from independent standard-normal marginals: the log
//! conditional CDF of coordinate `k` is `ln Φ(y_k)` and the log joint density
//! of the first `k + 1` coordinates is `Σ_{m ≤ k} ln φ(y_m)`. Both are clipped
//! so the state starts strictly inside the unit interval.
use crate::optimization::numerical_stability::transformations::{
    CLIP_EPS, std_normal_log_cdf, std_normal_log_pdf,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};

/// Seed `(logcdf, logpdf)` for one observation.
///
/// - `logcdf[k] = clip(ln Φ(y[k]), ln ε, ln(1 − ε))`
/// - `logpdf[k] = Σ_{m ≤ k} max(ln φ(y[m]), ln ε)`
///
/// with `ε = `[`CLIP_EPS`].
pub fn init_marginals(y: ArrayView1<f64>) -> (Array1<f64>, Array1<f64>) {
    let lo = CLIP_EPS.ln();
    let hi = (-CLIP_EPS).ln_1p();
    let logcdf = y.mapv(|v| std_normal_log_cdf(v).clamp(lo, hi));
    let mut running = 0.0;
    let logpdf = y.mapv(|v| {
        running += std_normal_log_pdf(v).max(lo);
        running
    });
    (logcdf, logpdf)
}

/// Row-wise [`init_marginals`] for an n × d sample.
pub fn init_marginals_rows(y: ArrayView2<f64>) -> (Array2<f64>, Array2<f64>) {
    let mut logcdf = Array2::zeros(y.raw_dim());
    let mut logpdf = Array2::zeros(y.raw_dim());
    Zip::from(logcdf.rows_mut()).and(logpdf.rows_mut()).and(y.rows()).for_each(
        |mut cdf_row, mut pdf_row, y_row| {
            let (cdf, pdf) = init_marginals(y_row);
            cdf_row.assign(&cdf);
            pdf_row.assign(&pdf);
        },
    );
    (logcdf, logpdf)
}
