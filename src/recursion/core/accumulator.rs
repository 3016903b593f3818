//! accumulator — sequential chains over one ordering of the sample.
//!
//! Purpose
//! -------
//! Thread the copula update across the `n` observations of one permutation,
//! recording what fitting and prediction need: the reference CDF values `v`
//! (history) and the prequential log densities (trace). The same engines
//! replay a stored history for a test input.
//!
//! Key behaviors
//! -------------
//! - [`DensityChain`]: density estimation with one `ρ` per coordinate.
//!   At step `i` the reference is the chain's own current CDF of
//!   observation `i`, `v = exp(ln P[i])`; the trace records the joint log
//!   density of observation `i` over its last two prefixes before the
//!   update; then every state row absorbs `v` with weight `α_i`.
//! - [`RegressionChain`]: scalar response with covariate-localized weights,
//!   `α_x` computed per stored row against the covariates of observation `i`.
//! - `run_with_tangents` carries `∂/∂θ` of the state for rows not yet
//!   observed (`j > i`); earlier rows never feed the trace again.
//!
//! Invariants & assumptions
//! ------------------------
//! - Step `i + 1` consumes the state left by step `i`; chains are strictly
//!   sequential and share nothing, so callers may run many in parallel.
//! - Inputs have already been validated and permuted by the caller.
//!
//! Conventions
//! -----------
//! - Density traces are `n × 2`: columns hold `ln p(y_{i,≤d−1})` and
//!   `ln p(y_{i,≤d})`. For `d = 1` both columns hold the one joint value.
//! - Regression traces are `n × 1`.
//! - Tangent arrays are indexed `[row, column, parameter]`.
use crate::recursion::core::{
    copula::CopulaLink,
    localizer::CovariateLocalizer,
    marginals::{init_marginals, init_marginals_rows},
    update::{StepInput, StepSeed, copula_step, copula_step_tangent, log_mixing_weight},
};
use ndarray::{
    Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip, array, s,
};

/// Terminal outputs of one training chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutput {
    /// Reference CDF values absorbed at each step (`n × d`).
    pub history: Array2<f64>,
    /// Prequential log densities recorded before each step.
    pub trace: Array2<f64>,
    /// Final log conditional CDFs of every observation.
    pub logcdf: Array2<f64>,
    /// Final cumulative joint log densities of every observation.
    pub logpdf: Array2<f64>,
}

fn record_density_trace(logpdf_row: ArrayView1<f64>, mut trace_row: ArrayViewMut1<f64>) {
    let d = logpdf_row.len();
    trace_row[0] = logpdf_row[d.saturating_sub(2)];
    trace_row[1] = logpdf_row[d - 1];
}

/// Density-estimation chain engine.
#[derive(Debug, Clone, Copy)]
pub struct DensityChain<'a, C: CopulaLink> {
    pub link: &'a C,
    /// Correlation of each coordinate (length d).
    pub rho: ArrayView1<'a, f64>,
}

impl<'a, C: CopulaLink> DensityChain<'a, C> {
    pub fn new(link: &'a C, rho: ArrayView1<'a, f64>) -> Self {
        DensityChain { link, rho }
    }

    /// Run the chain over the rows of `y` in order.
    pub fn run(&self, y: ArrayView2<f64>) -> ChainOutput {
        let (n, d) = y.dim();
        let (mut logcdf, mut logpdf) = init_marginals_rows(y);
        let mut history = Array2::zeros((n, d));
        let mut trace = Array2::zeros((n, 2));
        for i in 0..n {
            let v = logcdf.row(i).mapv(f64::exp);
            history.row_mut(i).assign(&v);
            record_density_trace(logpdf.row(i), trace.row_mut(i));
            let input =
                StepInput { v: v.view(), log_alpha: log_mixing_weight(i), rho: self.rho.view() };
            Zip::from(logcdf.rows_mut())
                .and(logpdf.rows_mut())
                .for_each(|cdf_row, pdf_row| copula_step(self.link, &input, cdf_row, pdf_row));
        }
        ChainOutput { history, trace, logcdf, logpdf }
    }

    /// Run the chain and return trace tangents (`n × 2 × k`).
    ///
    /// `rho_param[j]` is the parameter index of coordinate `j`'s correlation;
    /// `k` is the number of parameters.
    pub fn run_with_tangents(
        &self, y: ArrayView2<f64>, rho_param: &[usize], k: usize,
    ) -> (ChainOutput, Array3<f64>) {
        let (n, d) = y.dim();
        let (mut logcdf, mut logpdf) = init_marginals_rows(y);
        let mut dlogcdf = Array3::zeros((n, d, k));
        let mut dlogpdf = Array3::zeros((n, d, k));
        let mut history = Array2::zeros((n, d));
        let mut trace = Array2::zeros((n, 2));
        let mut dtrace = Array3::zeros((n, 2, k));
        let dlog_alpha = Array1::zeros(k);
        for i in 0..n {
            let v = logcdf.row(i).mapv(f64::exp);
            let dlogv = dlogcdf.index_axis(Axis(0), i).to_owned();
            history.row_mut(i).assign(&v);
            record_density_trace(logpdf.row(i), trace.row_mut(i));
            let pdf_tangent = dlogpdf.index_axis(Axis(0), i);
            dtrace.slice_mut(s![i, 0, ..]).assign(&pdf_tangent.row(d.saturating_sub(2)));
            dtrace.slice_mut(s![i, 1, ..]).assign(&pdf_tangent.row(d - 1));

            let input =
                StepInput { v: v.view(), log_alpha: log_mixing_weight(i), rho: self.rho.view() };
            let seed = StepSeed { dlogv: dlogv.view(), dlog_alpha: dlog_alpha.view(), rho_param };
            for j in 0..n {
                if j > i {
                    copula_step_tangent(
                        self.link,
                        &input,
                        &seed,
                        logcdf.row_mut(j),
                        logpdf.row_mut(j),
                        dlogcdf.index_axis_mut(Axis(0), j),
                        dlogpdf.index_axis_mut(Axis(0), j),
                    );
                } else {
                    copula_step(self.link, &input, logcdf.row_mut(j), logpdf.row_mut(j));
                }
            }
        }
        (ChainOutput { history, trace, logcdf, logpdf }, dtrace)
    }

    /// Replay a stored history for one test observation.
    ///
    /// Returns the final `(ln P, ln p)` of `y_test` after absorbing every
    /// stored reference in order.
    pub fn replay(
        &self, y_test: ArrayView1<f64>, history: ArrayView2<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let (mut logcdf, mut logpdf) = init_marginals(y_test);
        for (i, v) in history.rows().into_iter().enumerate() {
            let input = StepInput { v, log_alpha: log_mixing_weight(i), rho: self.rho.view() };
            copula_step(self.link, &input, logcdf.view_mut(), logpdf.view_mut());
        }
        (logcdf, logpdf)
    }
}

/// Covariate-localized regression chain engine.
#[derive(Debug, Clone, Copy)]
pub struct RegressionChain<'a, C: CopulaLink> {
    pub link: &'a C,
    pub localizer: CovariateLocalizer,
    /// Copula correlation of the response.
    pub rho_y: f64,
    /// Kernel correlations of the covariates (length d_x).
    pub rho_x: ArrayView1<'a, f64>,
}

impl<'a, C: CopulaLink> RegressionChain<'a, C> {
    pub fn new(
        link: &'a C, localizer: CovariateLocalizer, rho_y: f64, rho_x: ArrayView1<'a, f64>,
    ) -> Self {
        RegressionChain { link, localizer, rho_y, rho_x }
    }

    /// Run the chain over `(y, x)` in row order.
    pub fn run(&self, y: ArrayView1<f64>, x: ArrayView2<f64>) -> ChainOutput {
        let n = y.len();
        let rho = array![self.rho_y];
        let (mut logcdf, mut logpdf) = init_marginals_rows(y.insert_axis(Axis(1)));
        let mut history = Array2::zeros((n, 1));
        let mut trace = Array2::zeros((n, 1));
        for i in 0..n {
            let la = log_mixing_weight(i);
            let x_new = x.row(i);
            let v = logcdf.row(i).mapv(f64::exp);
            history.row_mut(i).assign(&v);
            trace[[i, 0]] = logpdf[[i, 0]];
            for j in 0..n {
                let log_alpha = self.localizer.localize(la, x.row(j), x_new, self.rho_x);
                let input = StepInput { v: v.view(), log_alpha, rho: rho.view() };
                copula_step(self.link, &input, logcdf.row_mut(j), logpdf.row_mut(j));
            }
        }
        ChainOutput { history, trace, logcdf, logpdf }
    }

    /// Run the chain and return trace tangents (`n × 1 × (1 + d_x)`).
    ///
    /// Parameter 0 is `ρ_y`; parameters `1..` are `ρ_x`.
    pub fn run_with_tangents(
        &self, y: ArrayView1<f64>, x: ArrayView2<f64>,
    ) -> (ChainOutput, Array3<f64>) {
        let n = y.len();
        let k = 1 + self.rho_x.len();
        let rho = array![self.rho_y];
        let rho_param = [0usize];
        let (mut logcdf, mut logpdf) = init_marginals_rows(y.insert_axis(Axis(1)));
        let mut dlogcdf = Array3::zeros((n, 1, k));
        let mut dlogpdf = Array3::zeros((n, 1, k));
        let mut history = Array2::zeros((n, 1));
        let mut trace = Array2::zeros((n, 1));
        let mut dtrace = Array3::zeros((n, 1, k));
        let mut dlog_alpha = Array1::zeros(k);
        for i in 0..n {
            let la = log_mixing_weight(i);
            let x_new = x.row(i);
            let v = logcdf.row(i).mapv(f64::exp);
            let dlogv = dlogcdf.index_axis(Axis(0), i).to_owned();
            history.row_mut(i).assign(&v);
            trace[[i, 0]] = logpdf[[i, 0]];
            dtrace.slice_mut(s![i, 0, ..]).assign(&dlogpdf.slice(s![i, 0, ..]));
            for j in 0..n {
                if j > i {
                    let log_alpha = self.localizer.localize_grad(
                        la,
                        x.row(j),
                        x_new,
                        self.rho_x,
                        dlog_alpha.slice_mut(s![1..]),
                    );
                    let input = StepInput { v: v.view(), log_alpha, rho: rho.view() };
                    let seed = StepSeed {
                        dlogv: dlogv.view(),
                        dlog_alpha: dlog_alpha.view(),
                        rho_param: &rho_param,
                    };
                    copula_step_tangent(
                        self.link,
                        &input,
                        &seed,
                        logcdf.row_mut(j),
                        logpdf.row_mut(j),
                        dlogcdf.index_axis_mut(Axis(0), j),
                        dlogpdf.index_axis_mut(Axis(0), j),
                    );
                } else {
                    let log_alpha = self.localizer.localize(la, x.row(j), x_new, self.rho_x);
                    let input = StepInput { v: v.view(), log_alpha, rho: rho.view() };
                    copula_step(self.link, &input, logcdf.row_mut(j), logpdf.row_mut(j));
                }
            }
        }
        (ChainOutput { history, trace, logcdf, logpdf }, dtrace)
    }

    /// Replay a stored history for one test pair `(y_test, x_test)`.
    ///
    /// `x_ordered` holds the training covariates in the order the history
    /// was recorded. Returns the final `(ln P, ln p)` of `y_test`.
    pub fn replay(
        &self, y_test: f64, x_test: ArrayView1<f64>, x_ordered: ArrayView2<f64>,
        history: ArrayView2<f64>,
    ) -> (f64, f64) {
        let rho = array![self.rho_y];
        let (mut logcdf, mut logpdf) = init_marginals(array![y_test].view());
        for (i, (v, x_new)) in history.rows().into_iter().zip(x_ordered.rows()).enumerate() {
            let log_alpha =
                self.localizer.localize(log_mixing_weight(i), x_test, x_new, self.rho_x);
            let input = StepInput { v, log_alpha, rho: rho.view() };
            copula_step(self.link, &input, logcdf.view_mut(), logpdf.view_mut());
        }
        (logcdf[0], logpdf[0])
    }
}
