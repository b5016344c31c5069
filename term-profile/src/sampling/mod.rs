//! Sampling decisions made before a pass begins.
//!
//! - [`StrategySelector`] maps a row count and an [`AnalysisTask`] to a
//!   [`SamplingStrategy`].
//! - [`ChunkSizer`] turns the footprint of the first records into a [`ChunkPlan`].
//! - [`SubsetSampler`] materialises the working subset a strategy describes
//!   while the pass streams by.

pub mod chunking;
pub mod strategy;
pub mod subset;

pub use chunking::{ChunkPlan, ChunkSizer, DEFAULT_MEMORY_BUDGET_BYTES};
pub use strategy::{AnalysisTask, SamplingMethod, SamplingStrategy, StrategySelector};
pub use subset::SubsetSampler;
