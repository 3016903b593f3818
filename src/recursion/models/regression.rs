//! Regression model: covariate-localized recursion for `p(y | x)`.
//!
//! The scalar response is absorbed with the same copula step as the density
//! model, but every stored point's mixing weight is rescaled by a kernel
//! similarity between its covariates and those of the observation being
//! absorbed. Hyperparameters are laid out as `h = (h_y, h_x[0..d_x))` with
//! `ρ = 1 / (1 + exp(h))` componentwise.
//!
//! With [`KernelChoice::Flat`] the localizer is switched off and the model
//! coincides with the one-dimensional [`DensityModel`](super::DensityModel).
use crate::{
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Grad, LogLikelihood, OptimOutcome, Theta, maximize},
        numerical_stability::transformations::{hyper_from_rho, rho_from_hyper, rho_jacobian},
    },
    recursion::{
        core::{
            accumulator::RegressionChain,
            averaging::{
                PermutationBank, average_regression_trace, average_regression_trace_with_tangents,
                prequential_loss,
            },
            copula::GaussianCopula,
            data::RegressionData,
            localizer::{CovariateLocalizer, KernelChoice},
            options::RecursionOptions,
            permutations::PermutationSet,
            validation::{validate_hyper, validate_sample_size},
        },
        errors::{RecursionError, RecursionResult},
    },
};
use ndarray::{Array1, Array2, ArrayView1, Axis, s};
use rayon::prelude::*;
use tracing::{debug, info};

/// Correlations, training covariates and history bank produced by
/// [`RegressionModel::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedRegression {
    pub rho_y: f64,
    pub rho_x: Array1<f64>,
    pub bank: PermutationBank,
}

/// Predictive output for a batch of test pairs `(y*, x*)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionPrediction {
    /// Mixture-averaged `ln P(y* | x*)`.
    pub logcdf: Array1<f64>,
    /// Mixture-averaged `ln p(y* | x*)`.
    pub logpdf: Array1<f64>,
}

/// Covariate-localized copula predictive-recursion regression.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionModel {
    /// Run-time options.
    pub options: RecursionOptions,
    /// Covariate localization.
    pub localizer: CovariateLocalizer,
    /// Bivariate copula used in every step.
    pub link: GaussianCopula,
    /// Covariate dimension d_x.
    pub covariate_dim: usize,
    /// Orders averaged in the training objective.
    pub permutations: PermutationSet,
    /// Fit results (populated after `fit`).
    pub results: Option<OptimOutcome>,
    /// Fitted correlations and history bank (populated after `fit`).
    pub fitted: Option<FittedRegression>,
}

impl RegressionModel {
    /// Construct a model for `n` pairs with `covariate_dim` covariates.
    ///
    /// # Errors
    /// - [`RecursionError::ZeroDimension`] for `covariate_dim == 0`.
    /// - Permutation errors from [`PermutationSet::random`].
    pub fn new(
        options: RecursionOptions, kernel: KernelChoice, n: usize, covariate_dim: usize,
    ) -> RecursionResult<RegressionModel> {
        let permutations = PermutationSet::random(n, options.n_perm_fit, options.seed)?;
        RegressionModel::with_permutations(options, kernel, covariate_dim, permutations)
    }

    /// Construct a model that averages over caller-supplied permutations.
    pub fn with_permutations(
        options: RecursionOptions, kernel: KernelChoice, covariate_dim: usize,
        permutations: PermutationSet,
    ) -> RecursionResult<RegressionModel> {
        if covariate_dim == 0 {
            return Err(RecursionError::ZeroDimension);
        }
        Ok(RegressionModel {
            options,
            localizer: CovariateLocalizer::new(kernel),
            link: GaussianCopula::default(),
            covariate_dim,
            permutations,
            results: None,
            fitted: None,
        })
    }

    /// Number of hyperparameters, `1 + d_x`.
    pub fn n_params(&self) -> usize {
        1 + self.covariate_dim
    }

    /// Starting point `h0` built from `options.rho_init`.
    pub fn initial_hyper(&self) -> Array1<f64> {
        Array1::from_elem(self.n_params(), hyper_from_rho(self.options.rho_init))
    }

    /// Split `h` into `(ρ_y, ρ_x)`.
    pub fn rho_from_hyper(&self, h: ArrayView1<f64>) -> (f64, Array1<f64>) {
        (rho_from_hyper(h[0]), h.slice(s![1..]).mapv(rho_from_hyper))
    }

    fn check_inputs(&self, h: ArrayView1<f64>, data: &RegressionData) -> RecursionResult<()> {
        validate_hyper(h, self.n_params())?;
        validate_sample_size(self.permutations.n(), data.n())?;
        if data.covariate_dim() != self.covariate_dim {
            return Err(RecursionError::DimensionMismatch {
                expected: self.covariate_dim,
                actual: data.covariate_dim(),
            });
        }
        Ok(())
    }

    /// Permutation-averaged prequential trace (`n × 1`) at `h`.
    pub fn prequential_trace(
        &self, h: &Array1<f64>, data: &RegressionData,
    ) -> RecursionResult<Array2<f64>> {
        self.check_inputs(h.view(), data)?;
        let (rho_y, rho_x) = self.rho_from_hyper(h.view());
        let chain = RegressionChain::new(&self.link, self.localizer, rho_y, rho_x.view());
        Ok(average_regression_trace(&chain, data.y.view(), data.x.view(), &self.permutations))
    }

    /// Training loss `−(1/n) Σ_i mean_perm ln p_{i−1}(y_i | x_i)`.
    pub fn objective(&self, h: &Array1<f64>, data: &RegressionData) -> RecursionResult<f64> {
        let trace = self.prequential_trace(h, data)?;
        let loss = prequential_loss(trace.column(0));
        debug!(loss, h = ?h, "regression objective");
        Ok(loss)
    }

    /// Training loss and its gradient with respect to `h`.
    pub fn objective_with_grad(
        &self, h: &Array1<f64>, data: &RegressionData,
    ) -> RecursionResult<(f64, Array1<f64>)> {
        self.check_inputs(h.view(), data)?;
        let (rho_y, rho_x) = self.rho_from_hyper(h.view());
        let chain = RegressionChain::new(&self.link, self.localizer, rho_y, rho_x.view());
        let (trace, dtrace) = average_regression_trace_with_tangents(
            &chain,
            data.y.view(),
            data.x.view(),
            &self.permutations,
        );
        let loss = prequential_loss(trace.column(0));
        let dcolumn = dtrace.index_axis(Axis(1), 0);
        let n = data.n() as f64;
        let grad = Array1::from_shape_fn(self.n_params(), |q| {
            -dcolumn.column(q).sum() / n * rho_jacobian(rho_from_hyper(h[q]))
        });
        debug!(loss, h = ?h, grad = ?grad, "regression objective and gradient");
        Ok((loss, grad))
    }

    /// Fit `(ρ_y, ρ_x)` and record the prediction bank.
    ///
    /// Mirrors [`DensityModel::fit`](super::DensityModel::fit): start from
    /// `h0` (or `options.rho_init`), maximize, then store histories and
    /// covariate orders for `n_perm_predict` fresh permutations.
    pub fn fit(&mut self, h0: Option<Array1<f64>>, data: &RegressionData) -> OptResult<()> {
        let h0 = h0.unwrap_or_else(|| self.initial_hyper());
        info!(
            n = data.n(),
            d_x = self.covariate_dim,
            n_perm_fit = self.permutations.n_perm(),
            kernel = ?self.localizer.kernel,
            "fitting regression model"
        );
        let outcome = maximize(self, h0, data, &self.options.mle_opts)?;
        let (rho_y, rho_x) = self.rho_from_hyper(outcome.theta_hat.view());
        let predict_perms = PermutationSet::random(
            data.n(),
            self.options.n_perm_predict,
            self.options.predict_seed(),
        )?;
        let chain = RegressionChain::new(&self.link, self.localizer, rho_y, rho_x.view());
        let bank = PermutationBank::regression(&chain, data.y.view(), data.x.view(), predict_perms);
        info!(rho_y, rho_x = ?rho_x, converged = outcome.converged, "regression model fitted");
        self.results = Some(outcome);
        self.fitted = Some(FittedRegression { rho_y, rho_x, bank });
        Ok(())
    }

    /// Predictive `ln P(y* | x*)` and `ln p(y* | x*)` for each test pair.
    ///
    /// ## Errors
    /// - [`RecursionError::ModelNotFitted`] before `fit`.
    /// - [`RecursionError::DimensionMismatch`] for another covariate
    ///   dimension.
    pub fn predict(&self, test: &RegressionData) -> RecursionResult<RegressionPrediction> {
        let fitted = self.fitted.as_ref().ok_or(RecursionError::ModelNotFitted)?;
        if test.covariate_dim() != self.covariate_dim {
            return Err(RecursionError::DimensionMismatch {
                expected: self.covariate_dim,
                actual: test.covariate_dim(),
            });
        }
        let chain =
            RegressionChain::new(&self.link, self.localizer, fitted.rho_y, fitted.rho_x.view());
        let (logcdf, logpdf): (Vec<f64>, Vec<f64>) = (0..test.n())
            .into_par_iter()
            .map(|t| fitted.bank.replay_regression(&chain, test.y[t], test.x.row(t)))
            .unzip();
        info!(m = test.n(), n_perm = fitted.bank.n_perm(), "regression prediction");
        Ok(RegressionPrediction { logcdf: Array1::from(logcdf), logpdf: Array1::from(logpdf) })
    }
}

impl LogLikelihood for RegressionModel {
    type Data = RegressionData;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<f64> {
        Ok(-self.objective(theta, data)?)
    }

    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()> {
        self.check_inputs(theta.view(), data)?;
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        let (_, grad) = self.objective_with_grad(theta, data)?;
        Ok(-grad)
    }
}
