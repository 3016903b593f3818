//! Density model: prequential objective, exact gradient, fit and predict.
//!
//! This module wires the permutation-averaged density recursion to the
//! `LogLikelihood` trait. Hyperparameters `h` live in unconstrained space and
//! map to correlations through `ρ = 1 / (1 + exp(h))`, either one shared `ρ`
//! or one per coordinate ([`RhoLayout`]).
//!
//! Key ideas:
//! - The training loss is `−(1/n) Σ_i mean_perm trace[i]`, where the trace
//!   column is the joint log density ([`DensityTarget::Joint`]) or the
//!   conditional log density of the last coordinate
//!   ([`DensityTarget::JointConditional`]).
//! - The gradient comes from forward-mode tangents carried through every
//!   chain, then mapped to `h` with `dρ/dh = −ρ(1 − ρ)`.
//! - After fitting, a bank of `n_perm_predict` fresh permutation histories is
//!   stored; prediction replays test points against it and mixes the
//!   per-permutation densities.
use crate::{
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Grad, LogLikelihood, OptimOutcome, Theta, maximize},
        numerical_stability::transformations::{hyper_from_rho, rho_from_hyper, rho_jacobian},
    },
    recursion::{
        core::{
            accumulator::DensityChain,
            averaging::{
                PermutationBank, average_density_trace, average_density_trace_with_tangents,
                prequential_loss,
            },
            copula::GaussianCopula,
            data::DensityData,
            options::{DensityTarget, RecursionOptions, RhoLayout},
            permutations::PermutationSet,
            validation::{validate_hyper, validate_sample_size},
        },
        errors::{RecursionError, RecursionResult},
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use rayon::prelude::*;
use tracing::{debug, info};

/// Correlations and history bank produced by [`DensityModel::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedDensity {
    /// Fitted correlation of each coordinate (length d).
    pub rho: Array1<f64>,
    /// Prediction histories.
    pub bank: PermutationBank,
}

/// Predictive output for a batch of test observations.
///
/// Row `t` belongs to test observation `t`; column `j` to coordinate `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityPrediction {
    /// Mixture-averaged log conditional CDFs `ln P(y_j | y_{<j})`.
    pub logcdf: Array2<f64>,
    /// Mixture-averaged cumulative log densities `ln p(y_{≤j})`.
    pub logpdf: Array2<f64>,
}

impl DensityPrediction {
    /// `ln p(y)` of every test observation.
    pub fn joint_log_density(&self) -> Array1<f64> {
        self.logpdf.column(self.logpdf.ncols() - 1).to_owned()
    }

    /// `ln p(y_d | y_{<d})` of every test observation.
    ///
    /// For one coordinate this is the joint log density.
    pub fn conditional_log_density(&self) -> Array1<f64> {
        let d = self.logpdf.ncols();
        if d == 1 {
            return self.joint_log_density();
        }
        &self.logpdf.column(d - 1) - &self.logpdf.column(d - 2)
    }
}

/// Copula predictive-recursion density estimator.
///
/// # Notes
/// - The fit permutations are drawn once at construction, so the objective
///   is a deterministic function of `h`.
/// - Chains over permutations and test points run on the `rayon` pool.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityModel {
    /// Run-time options.
    pub options: RecursionOptions,
    /// Prequential objective.
    pub target: DensityTarget,
    /// Correlation layout.
    pub layout: RhoLayout,
    /// Bivariate copula used in every step.
    pub link: GaussianCopula,
    /// Observation dimension d.
    pub dim: usize,
    /// Orders averaged in the training objective.
    pub permutations: PermutationSet,
    /// Fit results (populated after `fit`).
    pub results: Option<OptimOutcome>,
    /// Fitted correlations and history bank (populated after `fit`).
    pub fitted: Option<FittedDensity>,
}

impl DensityModel {
    /// Construct a model for `n` observations of dimension `dim`, drawing
    /// `options.n_perm_fit` permutations from `options.seed`.
    ///
    /// # Errors
    /// - [`RecursionError::ZeroDimension`] for `dim == 0`.
    /// - [`RecursionError::TargetNeedsTwoDims`] for the joint-conditional
    ///   target with `dim < 2`.
    /// - Permutation errors from [`PermutationSet::random`].
    pub fn new(
        options: RecursionOptions, target: DensityTarget, layout: RhoLayout, n: usize, dim: usize,
    ) -> RecursionResult<DensityModel> {
        let permutations = PermutationSet::random(n, options.n_perm_fit, options.seed)?;
        DensityModel::with_permutations(options, target, layout, dim, permutations)
    }

    /// Construct a model that averages over caller-supplied permutations.
    pub fn with_permutations(
        options: RecursionOptions, target: DensityTarget, layout: RhoLayout, dim: usize,
        permutations: PermutationSet,
    ) -> RecursionResult<DensityModel> {
        if dim == 0 {
            return Err(RecursionError::ZeroDimension);
        }
        if target == DensityTarget::JointConditional && dim < 2 {
            return Err(RecursionError::TargetNeedsTwoDims { d: dim });
        }
        Ok(DensityModel {
            options,
            target,
            layout,
            link: GaussianCopula::default(),
            dim,
            permutations,
            results: None,
            fitted: None,
        })
    }

    /// Number of hyperparameters.
    pub fn n_params(&self) -> usize {
        self.layout.n_params(self.dim)
    }

    /// Starting point `h0` built from `options.rho_init`.
    pub fn initial_hyper(&self) -> Array1<f64> {
        Array1::from_elem(self.n_params(), hyper_from_rho(self.options.rho_init))
    }

    /// Map `h` to one correlation per coordinate.
    pub fn rho_from_hyper(&self, h: ArrayView1<f64>) -> Array1<f64> {
        self.layout.param_index(self.dim).into_iter().map(|q| rho_from_hyper(h[q])).collect()
    }

    /// Fitted correlations, if the model has been fitted.
    pub fn fitted_rho(&self) -> Option<ArrayView1<'_, f64>> {
        self.fitted.as_ref().map(|f| f.rho.view())
    }

    fn check_inputs(&self, h: ArrayView1<f64>, data: &DensityData) -> RecursionResult<()> {
        validate_hyper(h, self.n_params())?;
        validate_sample_size(self.permutations.n(), data.n())?;
        if data.dim() != self.dim {
            return Err(RecursionError::DimensionMismatch { expected: self.dim, actual: data.dim() });
        }
        Ok(())
    }

    fn target_column(&self, trace: ArrayView2<f64>) -> Array1<f64> {
        match self.target {
            DensityTarget::Joint => trace.column(1).to_owned(),
            DensityTarget::JointConditional => &trace.column(1) - &trace.column(0),
        }
    }

    /// Permutation-averaged prequential trace (`n × 2`) at `h`.
    ///
    /// Column 0 holds `ln p(y_{i,≤d−1})`, column 1 `ln p(y_{i,≤d})`.
    pub fn prequential_trace(&self, h: &Array1<f64>, data: &DensityData) -> RecursionResult<Array2<f64>> {
        self.check_inputs(h.view(), data)?;
        let rho = self.rho_from_hyper(h.view());
        let chain = DensityChain::new(&self.link, rho.view());
        Ok(average_density_trace(&chain, data.y.view(), &self.permutations))
    }

    /// Training loss `−(1/n) Σ_i mean_perm trace[i]` at `h`.
    pub fn objective(&self, h: &Array1<f64>, data: &DensityData) -> RecursionResult<f64> {
        let trace = self.prequential_trace(h, data)?;
        let loss = prequential_loss(self.target_column(trace.view()).view());
        debug!(loss, h = ?h, "density objective");
        Ok(loss)
    }

    /// Training loss and its gradient with respect to `h`.
    pub fn objective_with_grad(
        &self, h: &Array1<f64>, data: &DensityData,
    ) -> RecursionResult<(f64, Array1<f64>)> {
        self.check_inputs(h.view(), data)?;
        let rho = self.rho_from_hyper(h.view());
        let chain = DensityChain::new(&self.link, rho.view());
        let k = self.n_params();
        let (trace, dtrace) = average_density_trace_with_tangents(
            &chain,
            data.y.view(),
            &self.permutations,
            &self.layout.param_index(self.dim),
            k,
        );
        let loss = prequential_loss(self.target_column(trace.view()).view());
        let dcolumn = match self.target {
            DensityTarget::Joint => dtrace.slice(s![.., 1, ..]).to_owned(),
            DensityTarget::JointConditional => {
                &dtrace.slice(s![.., 1, ..]) - &dtrace.slice(s![.., 0, ..])
            }
        };
        let n = data.n() as f64;
        let grad = Array1::from_shape_fn(k, |q| {
            -dcolumn.index_axis(Axis(1), q).sum() / n * rho_jacobian(rho_from_hyper(h[q]))
        });
        debug!(loss, h = ?h, grad = ?grad, "density objective and gradient");
        Ok((loss, grad))
    }

    /// Fit the correlations by maximizing the prequential log-likelihood,
    /// then record the prediction bank.
    ///
    /// ## Steps
    /// 1. Start from `h0`, or from `options.rho_init` when `None`.
    /// 2. Run L-BFGS per `options.mle_opts` and store the outcome in
    ///    `self.results`.
    /// 3. Draw `n_perm_predict` permutations from `options.predict_seed()`
    ///    and store their histories at the fitted correlations.
    ///
    /// ## Errors
    /// - Validation and optimizer failures as [`OptError`](crate::optimization::errors::OptError).
    pub fn fit(&mut self, h0: Option<Array1<f64>>, data: &DensityData) -> OptResult<()> {
        let h0 = h0.unwrap_or_else(|| self.initial_hyper());
        info!(
            n = data.n(),
            d = self.dim,
            n_perm_fit = self.permutations.n_perm(),
            target = ?self.target,
            "fitting density model"
        );
        let outcome = maximize(self, h0, data, &self.options.mle_opts)?;
        let rho = self.rho_from_hyper(outcome.theta_hat.view());
        let predict_perms = PermutationSet::random(
            data.n(),
            self.options.n_perm_predict,
            self.options.predict_seed(),
        )?;
        let chain = DensityChain::new(&self.link, rho.view());
        let bank = PermutationBank::density(&chain, data.y.view(), predict_perms);
        info!(rho = ?rho, converged = outcome.converged, n_perm_predict = bank.n_perm(), "density model fitted");
        self.results = Some(outcome);
        self.fitted = Some(FittedDensity { rho, bank });
        Ok(())
    }

    /// Predictive log CDFs and log densities for each row of `test`.
    ///
    /// ## Errors
    /// - [`RecursionError::ModelNotFitted`] before `fit`.
    /// - [`RecursionError::DimensionMismatch`] if `test` has another
    ///   dimension.
    pub fn predict(&self, test: &DensityData) -> RecursionResult<DensityPrediction> {
        let fitted = self.fitted.as_ref().ok_or(RecursionError::ModelNotFitted)?;
        if test.dim() != self.dim {
            return Err(RecursionError::DimensionMismatch { expected: self.dim, actual: test.dim() });
        }
        let chain = DensityChain::new(&self.link, fitted.rho.view());
        let rows: Vec<(Array1<f64>, Array1<f64>)> = (0..test.n())
            .into_par_iter()
            .map(|t| fitted.bank.replay_density(&chain, test.y.row(t)))
            .collect();
        let mut logcdf = Array2::zeros((test.n(), self.dim));
        let mut logpdf = Array2::zeros((test.n(), self.dim));
        for (t, (cdf, pdf)) in rows.into_iter().enumerate() {
            logcdf.row_mut(t).assign(&cdf);
            logpdf.row_mut(t).assign(&pdf);
        }
        info!(m = test.n(), n_perm = fitted.bank.n_perm(), "density prediction");
        Ok(DensityPrediction { logcdf, logpdf })
    }
}

impl LogLikelihood for DensityModel {
    type Data = DensityData;

    /// Mean prequential log-likelihood `ℓ(h) = −loss(h)`.
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<f64> {
        Ok(-self.objective(theta, data)?)
    }

    /// Validate `h` length and finiteness, the sample size the permutations
    /// were drawn for, and the dimension.
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()> {
        self.check_inputs(theta.view(), data)?;
        Ok(())
    }

    /// `∇ℓ(h)` from the tangent recursion.
    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        let (_, grad) = self.objective_with_grad(theta, data)?;
        Ok(-grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        loglik_optimizer::{LineSearcher, MLEOptions, Tolerances, finite_diff::central_fd_grad},
    };
    use approx::assert_relative_eq;
    use ndarray::{Array, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The objective and gradient on recorded reference runs.
    // - Gradients against central differences for every layout and target.
    // - `LogLikelihood` sign conventions and input checks.
    // - fit → predict on a small sample, and prediction errors.
    //
    // They intentionally DO NOT cover:
    // - Optimizer internals (see `optimization::loglik_optimizer`).
    // -------------------------------------------------------------------------

    fn options(n_perm: usize) -> RecursionOptions {
        let tols = Tolerances::new(Some(1e-6), None, Some(60)).unwrap();
        let mle = MLEOptions::new(tols, LineSearcher::MoreThuente, false, None).unwrap();
        RecursionOptions::new(n_perm, n_perm, 5, 0.9, mle).unwrap()
    }

    fn reference_sample() -> DensityData {
        DensityData::new(array![[0.1], [-0.3], [0.5], [0.2], [-0.1]]).unwrap()
    }

    fn sample_2d() -> DensityData {
        DensityData::new(array![
            [0.1, 0.4],
            [-0.3, 0.2],
            [0.5, -1.0],
            [0.2, 0.3],
            [-0.1, 0.9],
            [1.2, -0.4]
        ])
        .unwrap()
    }

    fn identity_model(target: DensityTarget, layout: RhoLayout, n: usize, d: usize) -> DensityModel {
        DensityModel::with_permutations(
            options(1),
            target,
            layout,
            d,
            PermutationSet::identity(n).unwrap(),
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Loss and gradient reproduce recorded reference values.
    //
    // Given
    // -----
    // - The five-point sample at `h = 0`, identity order.
    // - The six-point 2-d sample at shared `h = −0.7`.
    //
    // Expect
    // ------
    // - Loss 0.8561548368060861 and gradient 0.11418191215425326 for the
    //   first; gradient −0.0863724328347264 for the second.
    fn objective_matches_reference_values() {
        let model = identity_model(DensityTarget::Joint, RhoLayout::Shared, 5, 1);
        let data = reference_sample();
        let h = array![0.0];
        let (loss, grad) = model.objective_with_grad(&h, &data).unwrap();
        assert_relative_eq!(loss, 0.8561548368060861, epsilon = 1e-9);
        assert_relative_eq!(model.objective(&h, &data).unwrap(), loss, epsilon = 1e-14);
        assert_relative_eq!(grad[0], 0.11418191215425326, epsilon = 1e-9);

        let model = identity_model(DensityTarget::Joint, RhoLayout::Shared, 6, 2);
        let (_, grad) = model.objective_with_grad(&array![-0.7], &sample_2d()).unwrap();
        assert_relative_eq!(grad[0], -0.0863724328347264, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Hyperparameters whose correlation rounds to one still give a finite
    // objective and gradient.
    //
    // Given
    // -----
    // - The five-point sample at `h = −40` (`ρ` is exactly 1.0 in `f64`) and
    //   `h = −20` (`ρ ≈ 1 − 2e-9`), identity order.
    //
    // Expect
    // ------
    // - Finite, equal losses: both correlations sit beyond the `1 − ε` clamp.
    // - A zero gradient, since a clamped correlation has no sensitivity.
    fn saturated_correlation_keeps_objective_finite() {
        let model = identity_model(DensityTarget::Joint, RhoLayout::Shared, 5, 1);
        let data = reference_sample();
        let (far, far_grad) = model.objective_with_grad(&array![-40.0], &data).unwrap();
        let (near, near_grad) = model.objective_with_grad(&array![-20.0], &data).unwrap();

        assert!(far.is_finite());
        assert_eq!(far, near);
        assert_eq!(far_grad[0], 0.0);
        assert_eq!(near_grad[0], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Tangent gradients agree with central differences for shared and
    // per-coordinate correlations, under both targets, with several
    // permutations.
    //
    // Given
    // -----
    // - A 3-d sample of 10 points and 3 seeded permutations.
    //
    // Expect
    // ------
    // - Each gradient component within 1e-6 of central differences.
    fn gradient_matches_central_differences() {
        let y = Array2::from_shape_fn((10, 3), |(i, j)| ((i * 5 + j * 11) as f64 * 0.29).cos());
        let data = DensityData::new(y).unwrap();
        let cases = [
            (DensityTarget::Joint, RhoLayout::Shared, array![0.4]),
            (DensityTarget::Joint, RhoLayout::PerDimension, array![-0.3, 0.8, 0.1]),
            (DensityTarget::JointConditional, RhoLayout::Shared, array![-1.1]),
            (DensityTarget::JointConditional, RhoLayout::PerDimension, array![0.5, -0.6, 1.2]),
        ];
        for (target, layout, h) in cases {
            let model = DensityModel::new(options(3), target, layout, 10, 3).unwrap();
            let (_, grad) = model.objective_with_grad(&h, &data).unwrap();
            let fd = central_fd_grad(&h, &|theta: &Array1<f64>| {
                model.objective(theta, &data).unwrap()
            })
            .unwrap();
            for q in 0..h.len() {
                assert_relative_eq!(grad[q], fd[q], epsilon = 1e-6);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // The `LogLikelihood` surface is the negated loss and rejects malformed
    // inputs.
    //
    // Given
    // -----
    // - The reference model; `h` of the wrong length, a NaN entry, a sample
    //   of another size.
    //
    // Expect
    // ------
    // - `value = −loss`, `grad = −∇loss`, and structured `OptError`s.
    fn loglikelihood_negates_loss_and_checks_inputs() {
        let model = identity_model(DensityTarget::Joint, RhoLayout::Shared, 5, 1);
        let data = reference_sample();
        let h = array![0.3];
        let (loss, dloss) = model.objective_with_grad(&h, &data).unwrap();
        assert_relative_eq!(model.value(&h, &data).unwrap(), -loss, epsilon = 1e-14);
        assert_relative_eq!(model.grad(&h, &data).unwrap()[0], -dloss[0], epsilon = 1e-14);

        assert_eq!(
            model.check(&array![0.1, 0.2], &data),
            Err(OptError::HyperLengthMismatch { expected: 1, actual: 2 })
        );
        assert!(matches!(
            model.check(&array![f64::NAN], &data),
            Err(OptError::NonFiniteHyper { index: 0, .. })
        ));
        let bigger = DensityData::new(Array2::zeros((6, 1))).unwrap();
        assert_eq!(
            model.check(&h, &bigger),
            Err(OptError::SampleSizeMismatch { expected: 5, actual: 6 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Construction rejects a conditional target for one coordinate.
    //
    // Given
    // -----
    // - `JointConditional` with `dim = 1`.
    //
    // Expect
    // ------
    // - `TargetNeedsTwoDims { d: 1 }`.
    fn conditional_target_needs_two_coordinates() {
        let err = DensityModel::new(options(2), DensityTarget::JointConditional, RhoLayout::Shared, 5, 1);
        assert_eq!(err, Err(RecursionError::TargetNeedsTwoDims { d: 1 }));
    }

    #[test]
    // Purpose
    // -------
    // A fit improves the objective and predictions form a density.
    //
    // Given
    // -----
    // - 40 points from a smooth wave, shared ρ, 4 permutations, a grid of
    //   test points on [−6, 6].
    //
    // Expect
    // ------
    // - The fitted log-likelihood is at least the starting one, ρ ∈ (0, 1),
    //   the predictive density integrates to ≈ 1, and log CDFs are ≤ 0.
    fn fit_then_predict_yields_a_density() {
        let y = Array::linspace(-2.0, 2.0, 40).mapv(|t: f64| (2.0 * t).sin() + 0.2 * t);
        let data = DensityData::new(y.insert_axis(Axis(1))).unwrap();
        let mut model = DensityModel::new(options(4), DensityTarget::Joint, RhoLayout::Shared, 40, 1).unwrap();
        let h0 = model.initial_hyper();
        let start = model.value(&h0, &data).unwrap();
        model.fit(None, &data).unwrap();
        let outcome = model.results.as_ref().unwrap();
        assert!(outcome.value >= start - 1e-9);
        let rho = model.fitted_rho().unwrap()[0];
        assert!(rho > 0.0 && rho < 1.0);

        let grid = Array::linspace(-6.0, 6.0, 601);
        let step = 12.0 / 600.0;
        let test = DensityData::new(grid.insert_axis(Axis(1))).unwrap();
        let pred = model.predict(&test).unwrap();
        let mass: f64 = pred.joint_log_density().mapv(f64::exp).sum() * step;
        assert_relative_eq!(mass, 1.0, epsilon = 2e-2);
        assert!(pred.logcdf.iter().all(|&c| c <= 0.0));
        assert_eq!(pred.conditional_log_density(), pred.joint_log_density());
    }

    #[test]
    // Purpose
    // -------
    // Prediction reports missing fits and dimension mismatches.
    //
    // Given
    // -----
    // - An unfitted model; then a model with a stored bank queried with 2-d
    //   rows.
    //
    // Expect
    // ------
    // - `ModelNotFitted`, then `DimensionMismatch { expected: 1, actual: 2 }`.
    fn predict_checks_state_and_dimension() {
        let data = reference_sample();
        let mut model = identity_model(DensityTarget::Joint, RhoLayout::Shared, 5, 1);
        assert_eq!(model.predict(&data), Err(RecursionError::ModelNotFitted));
        let rho = array![0.5];
        let bank = PermutationBank::density(
            &DensityChain::new(&model.link, rho.view()),
            data.y.view(),
            PermutationSet::identity(5).unwrap(),
        );
        model.fitted = Some(FittedDensity { rho, bank });
        assert_eq!(model.predict(&data).unwrap().logpdf.dim(), (5, 1));
        let test = DensityData::new(array![[0.0, 1.0]]).unwrap();
        assert_eq!(
            model.predict(&test),
            Err(RecursionError::DimensionMismatch { expected: 1, actual: 2 })
        );
    }
}
