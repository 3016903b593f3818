//! copula_recursion — copula predictive recursion (martingale posterior)
//! density and regression estimators.
//!
//! Purpose
//! -------
//! Serve as the crate root. The crate estimates predictive densities by a
//! sequential bivariate-Gaussian-copula update over the observations,
//! averaged over random orders, with copula correlations fitted by
//! maximizing the prequential log-likelihood through an argmin-backed L-BFGS
//! optimizer.
//!
//! Key behaviors
//! -------------
//! - [`recursion`]: the estimator itself (data containers, marginals, copula
//!   step with exact tangents, chains, permutation averaging, covariate
//!   localization, `DensityModel`, `RegressionModel`).
//! - [`optimization`]: the log-likelihood maximizer, log-space numerics and
//!   the optimizer error surface.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite, continuous and already standardized; invalid inputs
//!   are rejected when containers are built.
//! - Numerical degeneracy inside the recursion is handled by clipping, never
//!   by errors.
//!
//! Conventions
//! -----------
//! - Correlations are optimized in unconstrained space,
//!   `ρ = 1 / (1 + exp(h))`.
//! - Log events go through `tracing`; install a subscriber to see them.
//!
//! Downstream usage
//! ----------------
//! ```no_run
//! use copula_recursion::recursion::prelude::*;
//! use ndarray::array;
//!
//! let data = DensityData::new(array![[0.1], [-0.3], [0.5], [0.2], [-0.1]])?;
//! let mut model = DensityModel::new(
//!     RecursionOptions::default(),
//!     DensityTarget::Joint,
//!     RhoLayout::Shared,
//!     data.n(),
//!     data.dim(),
//! )?;
//! model.fit(None, &data)?;
//! let test = DensityData::new(array![[0.0], [1.0]])?;
//! let prediction = model.predict(&test)?;
//! println!("{:?}", prediction.joint_log_density());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code; `tests/integration_pr_pipeline.rs`
//!   runs data → fit → predict for both models.

pub mod optimization;
pub mod recursion;
