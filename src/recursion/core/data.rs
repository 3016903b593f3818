//! Validated sample containers for the predictive recursion.
//!
//! Purpose
//! -------
//! Provide small containers for the two sample shapes the recursion consumes:
//! a multivariate sample `y` (n × d) for density estimation, and a scalar
//! response `y` (n) paired with covariates `x` (n × d_x) for regression.
//! Construction is the single place where raw inputs are checked.
//!
//! Invariants & assumptions
//! ------------------------
//! - At least one observation and, for `y`, at least one coordinate.
//! - Every entry is finite.
//! - `y` and `x` in [`RegressionData`] have the same number of rows.
//! - Inputs are assumed to be on a standardized scale; the recursion seeds
//!   every coordinate from a standard normal marginal.
//!
//! Conventions
//! -----------
//! - Row `i` is observation `i`; permutations reorder rows and never copy
//!   the stored arrays.
//! - Test inputs use the same containers, so prediction enjoys the same
//!   guarantees as training.
use crate::recursion::{
    core::validation::{validate_covariates, validate_observations},
    errors::{RecursionError, RecursionResult},
};
use ndarray::{Array1, Array2, Axis};

/// `DensityData` — validated n × d sample for density estimation.
///
/// Fields
/// ------
/// - `y`: `Array2<f64>` with one observation per row.
///
/// Invariants
/// ----------
/// - `y.nrows() > 0`, `y.ncols() > 0`, all entries finite.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityData {
    /// Observations, one per row.
    pub y: Array2<f64>,
}

impl DensityData {
    /// Construct a validated [`DensityData`].
    ///
    /// Errors
    /// ------
    /// - `RecursionError::EmptySample` when `y` has no rows.
    /// - `RecursionError::ZeroDimension` when `y` has no columns.
    /// - `RecursionError::NonFiniteObservation { row, col, value }` for the
    ///   first NaN/±inf entry.
    pub fn new(y: Array2<f64>) -> RecursionResult<DensityData> {
        if y.nrows() == 0 {
            return Err(RecursionError::EmptySample);
        }
        if y.ncols() == 0 {
            return Err(RecursionError::ZeroDimension);
        }
        validate_observations(y.view())?;
        Ok(DensityData { y })
    }

    /// Number of observations `n`.
    pub fn n(&self) -> usize {
        self.y.nrows()
    }

    /// Observation dimension `d`.
    pub fn dim(&self) -> usize {
        self.y.ncols()
    }
}

/// `RegressionData` — validated scalar responses with covariates.
///
/// Fields
/// ------
/// - `y`: `Array1<f64>` responses.
/// - `x`: `Array2<f64>` covariates, one row per response.
///
/// Invariants
/// ----------
/// - `y.len() == x.nrows() > 0`, `x.ncols() > 0`, all entries finite.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionData {
    /// Responses.
    pub y: Array1<f64>,
    /// Covariates aligned with `y`.
    pub x: Array2<f64>,
}

impl RegressionData {
    /// Construct a validated [`RegressionData`].
    ///
    /// Errors
    /// ------
    /// - `RecursionError::EmptySample` when there are no responses.
    /// - `RecursionError::ZeroDimension` when `x` has no columns.
    /// - `RecursionError::RowCountMismatch` when `y` and `x` disagree.
    /// - `RecursionError::NonFiniteObservation` / `NonFiniteCovariate` for
    ///   the first NaN/±inf entry.
    pub fn new(y: Array1<f64>, x: Array2<f64>) -> RecursionResult<RegressionData> {
        if y.is_empty() {
            return Err(RecursionError::EmptySample);
        }
        if x.ncols() == 0 {
            return Err(RecursionError::ZeroDimension);
        }
        if y.len() != x.nrows() {
            return Err(RecursionError::RowCountMismatch {
                responses: y.len(),
                covariates: x.nrows(),
            });
        }
        validate_observations(y.view().insert_axis(Axis(1)))?;
        validate_covariates(x.view())?;
        Ok(RegressionData { y, x })
    }

    /// Number of observations `n`.
    pub fn n(&self) -> usize {
        self.y.len()
    }

    /// Covariate dimension `d_x`.
    pub fn covariate_dim(&self) -> usize {
        self.x.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `DensityData::new` happy path, empty sample, zero width and
    //   non-finite entries.
    // - `RegressionData::new` row-count mismatch and non-finite covariates.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A clean matrix is accepted and reports its shape.
    //
    // Given
    // -----
    // - A 3 × 2 finite matrix.
    //
    // Expect
    // ------
    // - `n() == 3`, `dim() == 2`.
    fn density_data_accepts_finite_matrix() {
        let data = DensityData::new(array![[0.1, 0.2], [0.3, -0.4], [1.0, 0.0]]).unwrap();
        assert_eq!(data.n(), 3);
        assert_eq!(data.dim(), 2);
    }

    #[test]
    // Purpose
    // -------
    // Malformed density samples are rejected with specific variants.
    //
    // Given
    // -----
    // - A 0 × 2 matrix, a 2 × 0 matrix, and a matrix with NaN at (0, 1).
    //
    // Expect
    // ------
    // - `EmptySample`, `ZeroDimension`, `NonFiniteObservation { row: 0, col: 1 }`.
    fn density_data_rejects_malformed_input() {
        assert_eq!(DensityData::new(Array2::zeros((0, 2))), Err(RecursionError::EmptySample));
        assert_eq!(DensityData::new(Array2::zeros((2, 0))), Err(RecursionError::ZeroDimension));
        assert!(matches!(
            DensityData::new(array![[0.0, f64::NAN]]),
            Err(RecursionError::NonFiniteObservation { row: 0, col: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Regression samples check alignment and both arrays' finiteness.
    //
    // Given
    // -----
    // - 3 responses with 2 covariate rows; a non-finite response; a
    //   non-finite covariate.
    //
    // Expect
    // ------
    // - `RowCountMismatch`, `NonFiniteObservation { row: 1, col: 0 }`,
    //   `NonFiniteCovariate { row: 0, col: 0 }`.
    fn regression_data_validates_alignment_and_values() {
        assert_eq!(
            RegressionData::new(array![0.0, 1.0, 2.0], array![[0.0], [1.0]]),
            Err(RecursionError::RowCountMismatch { responses: 3, covariates: 2 })
        );
        assert!(matches!(
            RegressionData::new(array![0.0, f64::INFINITY], array![[0.0], [1.0]]),
            Err(RecursionError::NonFiniteObservation { row: 1, col: 0, .. })
        ));
        assert!(matches!(
            RegressionData::new(array![0.0, 1.0], array![[f64::NAN], [1.0]]),
            Err(RecursionError::NonFiniteCovariate { row: 0, col: 0, .. })
        ));
        let ok = RegressionData::new(array![0.0, 1.0], array![[0.5, 1.0], [1.0, 2.0]]).unwrap();
        assert_eq!((ok.n(), ok.covariate_dim()), (2, 2));
    }
}
