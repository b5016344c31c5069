//! Streaming dataset profiling.
//!
//! [`StreamingProfiler`] runs one sequential pass over a record stream and
//! produces a [`DatasetProfile`]. [`ParallelProfiler`] profiles independent
//! chunks concurrently and merges their partial states.

pub mod column;
pub mod config;
pub mod orchestrator;
pub mod parallel;
pub mod profile;
pub mod progress;

pub use column::{ColumnAccumulator, PairAccumulator};
pub use config::{
    CancellationCheck, ProfilerConfig, ProfilerConfigBuilder, ProgressCallback,
    DEFAULT_RANDOM_SEED,
};
pub use orchestrator::{ScanControl, StreamingProfiler};
pub use parallel::ParallelProfiler;
pub use profile::{ColumnProfile, DatasetProfile, PairProfile, QuantileEstimate, Termination};
pub use progress::{ProfilerPhase, ProgressEvent, ProgressReporter};
