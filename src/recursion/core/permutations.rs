//! permutations — observation orders for permutation averaging.
//!
//! A [`PermutationSet`] holds `n_perm` reorderings of `0..n`. Orders are plain
//! index vectors over the shared sample; no observation is copied until a
//! chain materializes its ordered view.
use crate::recursion::errors::{RecursionError, RecursionResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// A validated collection of permutations of `0..n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationSet {
    n: usize,
    orders: Vec<Vec<usize>>,
}

impl PermutationSet {
    /// Draw `n_perm` uniform permutations of `0..n` from a seeded `StdRng`.
    ///
    /// The same `(n, n_perm, seed)` always yields the same orders.
    ///
    /// # Errors
    /// - [`RecursionError::EmptySample`] when `n == 0`.
    /// - [`RecursionError::InvalidPermutationCount`] when `n_perm == 0`.
    pub fn random(n: usize, n_perm: usize, seed: u64) -> RecursionResult<Self> {
        if n == 0 {
            return Err(RecursionError::EmptySample);
        }
        if n_perm == 0 {
            return Err(RecursionError::InvalidPermutationCount {
                count: n_perm,
                reason: "At least one permutation is required.",
            });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let orders = (0..n_perm)
            .map(|_| {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut rng);
                order
            })
            .collect();
        Ok(PermutationSet { n, orders })
    }

    /// The single identity order `0, 1, …, n − 1`.
    ///
    /// # Errors
    /// - [`RecursionError::EmptySample`] when `n == 0`.
    pub fn identity(n: usize) -> RecursionResult<Self> {
        if n == 0 {
            return Err(RecursionError::EmptySample);
        }
        Ok(PermutationSet { n, orders: vec![(0..n).collect()] })
    }

    /// Wrap caller-supplied orders after checking each is a permutation of
    /// `0..n`.
    ///
    /// # Errors
    /// - [`RecursionError::InvalidPermutationCount`] for an empty list.
    /// - [`RecursionError::InvalidPermutation`] naming the first order with
    ///   the wrong length, an out-of-range index or a repeated index.
    pub fn from_orders(n: usize, orders: Vec<Vec<usize>>) -> RecursionResult<Self> {
        if n == 0 {
            return Err(RecursionError::EmptySample);
        }
        if orders.is_empty() {
            return Err(RecursionError::InvalidPermutationCount {
                count: 0,
                reason: "At least one permutation is required.",
            });
        }
        for (index, order) in orders.iter().enumerate() {
            if order.len() != n {
                return Err(RecursionError::InvalidPermutation {
                    index,
                    reason: "Order length differs from the sample size.",
                });
            }
            let mut seen = vec![false; n];
            for &i in order {
                if i >= n {
                    return Err(RecursionError::InvalidPermutation {
                        index,
                        reason: "Order contains an out-of-range index.",
                    });
                }
                if std::mem::replace(&mut seen[i], true) {
                    return Err(RecursionError::InvalidPermutation {
                        index,
                        reason: "Order repeats an index.",
                    });
                }
            }
        }
        Ok(PermutationSet { n, orders })
    }

    /// Sample size the orders permute.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of orders.
    pub fn n_perm(&self) -> usize {
        self.orders.len()
    }

    /// All orders.
    pub fn orders(&self) -> &[Vec<usize>] {
        &self.orders
    }
}

/// Rows of `y` in the given order.
pub fn permute_rows(y: ArrayView2<f64>, order: &[usize]) -> Array2<f64> {
    y.select(Axis(0), order)
}

/// Entries of `y` in the given order.
pub fn permute_entries(y: ArrayView1<f64>, order: &[usize]) -> Array1<f64> {
    y.select(Axis(0), order)
}
