//! # term-profile - Streaming statistical profiling
//!
//! term-profile computes descriptive statistics, distribution estimates and
//! pairwise relationships for tabular datasets that may be too large to fit in
//! memory. Every record is read once; no accumulator keeps more than a bounded
//! amount of state, so memory stays flat however long the stream is.
//!
//! ## Quick Start
//!
//! ```rust
//! use term_profile::prelude::*;
//!
//! # fn main() -> term_profile::error::Result<()> {
//! let schema = DatasetSchema::new()
//!     .column("amount", ColumnType::Numeric)
//!     .column("region", ColumnType::Categorical);
//!
//! let records = (0..1_000).map(|i| {
//!     Record::new()
//!         .with("amount", (i % 100) as f64)
//!         .with("region", if i % 3 == 0 { "north" } else { "south" })
//! });
//!
//! let config = ProfilerConfig::builder()
//!     .quantiles(vec![0.5, 0.9])
//!     .top_k(5)
//!     .build();
//! let profile = StreamingProfiler::new(config).profile_records(
//!     schema,
//!     RowCountHint::Exact(1_000),
//!     records,
//! )?;
//!
//! let amount = profile.column("amount").unwrap();
//! assert_eq!(amount.count, 1_000);
//! assert!((amount.mean.unwrap() - 49.5).abs() < 1e-9);
//! let region = profile.column("region").unwrap();
//! assert_eq!(region.top_frequencies.as_ref().unwrap()[0].value, "south");
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! ### Online accumulators
//!
//! - **Moments**: count, mean, variance, skewness, kurtosis, min and max in
//!   one numerically stable pass
//! - **Quantiles**: constant-memory P² estimates for any requested quantile
//! - **Covariance**: Pearson correlation for selected column pairs
//! - **Frequencies**: approximate top-K counts under a hard entry cap
//! - **Reservoir sampling**: a seeded, uniform fixed-size sample of rows
//!
//! ### Sampling strategy
//!
//! Small datasets are scanned in full. Larger ones get a sampling strategy
//! chosen from the row count and the analysis task (random, stratified,
//! systematic or reservoir), and the chunk size is derived from the memory
//! footprint of the first records against a memory budget.
//!
//! ### Orchestration
//!
//! [`StreamingProfiler`](profiler::StreamingProfiler) moves through
//! `Idle -> Initializing -> Scanning -> Merging -> Finalized`, reports
//! rate-limited progress, honours cancellation and row and time limits
//! between chunks, and always returns a coherent (possibly partial) profile.
//! [`ParallelProfiler`](profiler::ParallelProfiler) scans independent chunks
//! concurrently and merges their partial states deterministically.
//!
//! ## Logging
//!
//! All diagnostics go through `tracing`. Use
//! [`logging::setup::init_logging`] to install a subscriber, and
//! [`logging::LogConfig`] to control per-chunk and sampling detail.

pub mod accumulators;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod profiler;
pub mod sampling;
pub mod sources;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
