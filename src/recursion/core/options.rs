//! options — configuration for fitting and prediction.
//!
//! Purpose
//! -------
//! Collect the knobs that shape a predictive-recursion fit in one place:
//! how many permutations are averaged for the training objective and for
//! prediction, the RNG seed that makes those draws reproducible, the
//! starting correlation, and the optimizer settings.
//!
//! Key behaviors
//! -------------
//! - [`RecursionOptions`] bundles the above and validates counts and the
//!   initial correlation.
//! - [`DensityTarget`] chooses between the joint and the joint-conditional
//!   prequential objective for [`DensityModel`](crate::recursion::models::DensityModel).
//! - [`RhoLayout`] chooses one shared correlation or one per coordinate.
//!
//! Conventions
//! -----------
//! - Fit permutations are drawn from `seed`; prediction permutations from
//!   `seed + 1`, so the history bank is independent of the orders used for
//!   fitting.
use crate::{
    optimization::loglik_optimizer::MLEOptions,
    recursion::errors::{RecursionError, RecursionResult},
};

/// Default starting correlation.
pub const DEFAULT_RHO_INIT: f64 = 0.9;

/// Which prequential log-likelihood the density model maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DensityTarget {
    /// `Σ_i ln p_{i−1}(y_i)`, the joint density of all coordinates.
    #[default]
    Joint,
    /// `Σ_i ln p_{i−1}(y_{i,d} | y_{i,<d})`, the last coordinate given the
    /// others (joint-method regression). Needs `d ≥ 2`.
    JointConditional,
}

/// How copula correlations are attached to coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RhoLayout {
    /// One correlation for every coordinate (hyperparameter length 1).
    #[default]
    Shared,
    /// One correlation per coordinate (hyperparameter length d).
    PerDimension,
}

impl RhoLayout {
    /// Number of hyperparameters for `d` coordinates.
    pub fn n_params(&self, d: usize) -> usize {
        match self {
            RhoLayout::Shared => 1,
            RhoLayout::PerDimension => d,
        }
    }

    /// Hyperparameter index driving each coordinate's correlation.
    pub fn param_index(&self, d: usize) -> Vec<usize> {
        match self {
            RhoLayout::Shared => vec![0; d],
            RhoLayout::PerDimension => (0..d).collect(),
        }
    }
}

/// Fit and prediction configuration.
///
/// Fields
/// ------
/// - `n_perm_fit`: permutations averaged in the training objective (≥ 1).
/// - `n_perm_predict`: permutations whose histories are kept for
///   prediction (≥ 1).
/// - `seed`: RNG seed for permutation draws.
/// - `rho_init`: correlation used to build `h0` when none is supplied.
/// - `mle_opts`: optimizer settings passed to `maximize`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursionOptions {
    pub n_perm_fit: usize,
    pub n_perm_predict: usize,
    pub seed: u64,
    pub rho_init: f64,
    pub mle_opts: MLEOptions,
}

impl RecursionOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - [`RecursionError::InvalidPermutationCount`] if either count is zero.
    /// - [`RecursionError::InvalidRhoInit`] unless `0 < rho_init < 1`.
    pub fn new(
        n_perm_fit: usize, n_perm_predict: usize, seed: u64, rho_init: f64,
        mle_opts: MLEOptions,
    ) -> RecursionResult<Self> {
        for count in [n_perm_fit, n_perm_predict] {
            if count == 0 {
                return Err(RecursionError::InvalidPermutationCount {
                    count,
                    reason: "Permutation counts must be at least one.",
                });
            }
        }
        if !(rho_init > 0.0 && rho_init < 1.0) {
            return Err(RecursionError::InvalidRhoInit { value: rho_init });
        }
        Ok(RecursionOptions { n_perm_fit, n_perm_predict, seed, rho_init, mle_opts })
    }

    /// Seed for the prediction permutations.
    pub fn predict_seed(&self) -> u64 {
        self.seed.wrapping_add(1)
    }
}

impl Default for RecursionOptions {
    fn default() -> Self {
        RecursionOptions {
            n_perm_fit: 10,
            n_perm_predict: 10,
            seed: 0,
            rho_init: DEFAULT_RHO_INIT,
            mle_opts: MLEOptions::default(),
        }
    }
}
