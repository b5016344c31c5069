//! Online statistical primitives.
//!
//! Each accumulator owns its state outright and exposes `update`, `merge` and
//! read-only getters. None of them buffers the input stream.
//!
//! - [`MomentAccumulator`]: mean, variance, skewness, kurtosis, min and max (Welford / Chan et al.)
//! - [`P2Quantile`]: constant-memory estimate of a single quantile (Jain & Chlamtac)
//! - [`ReservoirSampler`]: seeded uniform sample of fixed size (Algorithm R)
//! - [`CovarianceAccumulator`]: covariance and Pearson correlation of a value pair
//! - [`FrequencyCounter`]: approximate top-K counts under a hard entry cap
//!
//! All except the quantile estimator implement [`AccumulatorState`], so partial
//! states computed over independent chunks can be combined into one.

pub mod covariance;
pub mod frequency;
pub mod moments;
pub mod quantile;
pub mod reservoir;

pub use covariance::CovarianceAccumulator;
pub use frequency::{FrequencyCounter, FrequencyEntry};
pub use moments::MomentAccumulator;
pub use quantile::P2Quantile;
pub use reservoir::ReservoirSampler;

use std::fmt::Debug;

use crate::error::{ProfileError, Result};

/// State that can be combined with other partial states of the same kind.
///
/// Implementations must make `merge_from` associative; for every state except
/// the reservoir sampler it is also commutative.
pub trait AccumulatorState: Clone + Send + Debug {
    /// Folds `other` into `self`.
    fn merge_from(&mut self, other: &Self) -> Result<()>;

    /// Returns whether this state has observed nothing.
    fn is_empty(&self) -> bool;

    /// Merges a set of partial states, left to right.
    fn merge(states: Vec<Self>) -> Result<Self>
    where
        Self: Sized,
    {
        let mut iter = states.into_iter();
        let mut merged = iter
            .next()
            .ok_or_else(|| ProfileError::state_merge("No states to merge"))?;
        for state in iter {
            merged.merge_from(&state)?;
        }
        Ok(merged)
    }
}
