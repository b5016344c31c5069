//! Parallel-chunk profiling.
//!
//! Independent chunks of a dataset are scanned concurrently by separate
//! [`StreamingProfiler`]s on the blocking thread pool. Each chunk owns its
//! state; the partial states are then reduced on one task, in chunk order,
//! with the accumulators' `merge` operations. Given the same chunks, seed and
//! configuration the result is identical regardless of scheduling.
//!
//! Quantile estimators do not merge exactly. Per-chunk estimates are combined
//! as a count-weighted mean and the profile carries a warning saying so.

use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::accumulators::AccumulatorState;
use crate::error::{ProfileError, Result};
use crate::logging::truncate_field;
use crate::profiler::config::ProfilerConfig;
use crate::profiler::orchestrator::{PartialProfile, StreamingProfiler};
use crate::profiler::profile::{DatasetProfile, Termination};
use crate::profiler::progress::{ProfilerPhase, ProgressReporter};
use crate::sampling::{SamplingStrategy, StrategySelector};
use crate::value::{DatasetSchema, Record, RowCountHint};

/// Profiles pre-split chunks concurrently and merges the results.
///
/// # Example
///
/// ```rust
/// use term_profile::prelude::*;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let schema = DatasetSchema::new().column("x", ColumnType::Numeric);
/// let chunks: Vec<Vec<Record>> = (0..4)
///     .map(|c| (0..250).map(|i| Record::new().with("x", (c * 250 + i) as f64)).collect())
///     .collect();
///
/// let profiler = ParallelProfiler::new(ProfilerConfig::default());
/// let profile = profiler.profile_chunks(schema, chunks).await.unwrap();
/// assert_eq!(profile.column("x").unwrap().count, 1000);
/// # })
/// ```
#[derive(Debug, Clone)]
pub struct ParallelProfiler {
    config: ProfilerConfig,
    max_concurrency: usize,
}

impl ParallelProfiler {
    /// Creates a profiler that runs up to one chunk per CPU at a time.
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            config,
            max_concurrency: num_cpus::get().max(1),
        }
    }

    /// Limits how many chunks are scanned at the same time.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Profiles `chunks` as consecutive parts of one dataset.
    ///
    /// The sampling strategy is selected for the whole dataset and scaled to
    /// each chunk. Chunk `i` uses seed `seed + i`. The row limit applies to
    /// the dataset: chunks beyond it are truncated before scanning.
    #[instrument(
        skip(self, schema, chunks),
        fields(chunks = chunks.len(), concurrency = self.max_concurrency)
    )]
    pub async fn profile_chunks(
        &self,
        schema: DatasetSchema,
        chunks: Vec<Vec<Record>>,
    ) -> Result<DatasetProfile> {
        let started = Instant::now();
        self.config.validate(&schema)?;

        let input_rows: u64 = chunks.iter().map(|c| c.len() as u64).sum();
        let chunks = self.apply_row_limit(chunks);
        let total_rows: u64 = chunks.iter().map(|c| c.len() as u64).sum();
        let strategy = StrategySelector::new().select(total_rows, &self.config.task);
        let mut reporter = ProgressReporter::new(
            self.config.progress_callback.clone(),
            self.config.progress_interval,
        );
        reporter.report(
            ProfilerPhase::Scanning,
            0,
            Some(0.0),
            "scanning chunks in parallel",
        );
        info!(
            rows = total_rows,
            method = %strategy.method,
            sample_size = strategy.sample_size,
            "Starting parallel profiling"
        );

        let chunks = if chunks.is_empty() {
            vec![Vec::new()]
        } else {
            chunks
        };

        let partials: Vec<PartialProfile> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, chunk)| {
                let config = self.chunk_config(index, started);
                let schema = schema.clone();
                let strategy = strategy.scaled_for_chunk(chunk.len() as u64);
                async move {
                    let partial = tokio::task::spawn_blocking(move || {
                        profile_chunk(config, schema, strategy, &chunk)
                    })
                    .await??;
                    Ok::<_, ProfileError>(partial)
                }
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        reporter.report(
            ProfilerPhase::Merging,
            total_rows,
            Some(100.0),
            "merging chunk states",
        );
        let chunk_count = partials.len();
        let mut merged = PartialProfile::merge(partials)?;
        debug!(
            chunks = chunk_count,
            rows = merged.rows(),
            termination = %merged.termination(),
            "Merged chunk states"
        );
        if total_rows < input_rows {
            merged.stop_early(Termination::RowLimit);
        }

        let profile = merged.finalize(strategy, self.config.top_k, started.elapsed());
        reporter.report(
            ProfilerPhase::Finalized,
            profile.rows_scanned,
            Some(100.0),
            "profile complete",
        );
        info!(
            rows = profile.rows_scanned,
            partial = profile.partial,
            time_ms = profile.profiling_time_ms,
            "Completed parallel profiling"
        );
        for warning in &profile.warnings {
            warn!(
                warning = %truncate_field(warning, self.config.log.max_field_length),
                "Profile warning"
            );
        }
        Ok(profile)
    }

    fn apply_row_limit(&self, chunks: Vec<Vec<Record>>) -> Vec<Vec<Record>> {
        let Some(limit) = self.config.max_rows else {
            return chunks;
        };
        let mut remaining = limit;
        let mut limited = Vec::with_capacity(chunks.len());
        for mut chunk in chunks {
            if remaining == 0 {
                break;
            }
            if chunk.len() as u64 > remaining {
                chunk.truncate(remaining as usize);
            }
            remaining -= chunk.len() as u64;
            limited.push(chunk);
        }
        limited
    }

    /// Configuration for one chunk: its own seed, no progress callback, the
    /// row limit already applied and the remaining share of the time limit.
    fn chunk_config(&self, index: usize, started: Instant) -> ProfilerConfig {
        let mut config = self.config.clone();
        config.random_seed = Some(self.config.seed().wrapping_add(index as u64));
        config.progress_callback = None;
        config.max_rows = None;
        config.time_limit = self
            .config
            .time_limit
            .map(|limit| limit.saturating_sub(started.elapsed()));
        config
    }
}

fn profile_chunk(
    config: ProfilerConfig,
    schema: DatasetSchema,
    strategy: SamplingStrategy,
    chunk: &[Record],
) -> Result<PartialProfile> {
    let mut profiler = StreamingProfiler::new(config);
    profiler.initialize_with_strategy(schema, RowCountHint::Exact(chunk.len() as u64), strategy)?;
    // Feed in sub-chunks so cancellation and the time limit are observed.
    let mut offset = 0;
    while offset < chunk.len() {
        let end = (offset + profiler.next_chunk_rows()).min(chunk.len());
        if profiler.push_chunk(&chunk[offset..end])?.is_stop() {
            break;
        }
        offset = end;
    }
    let (_, partial) = profiler.finish_partial()?;
    Ok(partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SamplingMethod;
    use crate::value::ColumnType;

    fn schema() -> DatasetSchema {
        DatasetSchema::new()
            .column("x", ColumnType::Numeric)
            .column("y", ColumnType::Numeric)
            .column("label", ColumnType::Categorical)
    }

    fn chunks(count: usize, size: usize) -> Vec<Vec<Record>> {
        (0..count)
            .map(|c| {
                (0..size)
                    .map(|i| {
                        let x = (c * size + i) as f64;
                        Record::new()
                            .with("x", x)
                            .with("y", 3.0 - x)
                            .with("label", if i % 2 == 0 { "even" } else { "odd" })
                    })
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential_moments() {
        let config = ProfilerConfig::builder().pair("x", "y").build();
        let parallel = ParallelProfiler::new(config.clone())
            .profile_chunks(schema(), chunks(4, 500))
            .await
            .unwrap();
        let sequential = StreamingProfiler::new(config)
            .profile_records(
                schema(),
                RowCountHint::Exact(2_000),
                chunks(4, 500).into_iter().flatten(),
            )
            .unwrap();

        let p = parallel.column("x").unwrap();
        let s = sequential.column("x").unwrap();
        assert_eq!(p.count, s.count);
        assert!((p.mean.unwrap() - s.mean.unwrap()).abs() < 1e-9);
        assert!((p.variance.unwrap() - s.variance.unwrap()).abs() < 1e-6);
        assert_eq!(p.min, s.min);
        assert_eq!(p.max, s.max);

        let labels = parallel.column("label").unwrap().top_frequencies.clone().unwrap();
        assert_eq!(labels[0].count, 1_000);

        let pair = parallel.pair("x", "y").unwrap();
        assert!((pair.correlation.unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(parallel.rows_scanned, 2_000);
        assert!(parallel.warnings.iter().any(|w| w.contains("quantiles")));
    }

    #[tokio::test]
    async fn test_deterministic_across_concurrency() {
        let config = ProfilerConfig::builder().reservoir_size(20).random_seed(5).build();
        let wide = ParallelProfiler::new(config.clone())
            .with_max_concurrency(8)
            .profile_chunks(schema(), chunks(6, 300))
            .await
            .unwrap();
        let narrow = ParallelProfiler::new(config)
            .with_max_concurrency(1)
            .profile_chunks(schema(), chunks(6, 300))
            .await
            .unwrap();
        assert_eq!(wide.reservoir_sample, narrow.reservoir_sample);
        assert_eq!(wide.working_subset, narrow.working_subset);
        assert_eq!(wide.reservoir_sample.len(), 20);
    }

    #[tokio::test]
    async fn test_row_limit_truncates_chunks() {
        let config = ProfilerConfig::builder().max_rows(700).build();
        let profile = ParallelProfiler::new(config)
            .profile_chunks(schema(), chunks(4, 500))
            .await
            .unwrap();
        assert_eq!(profile.rows_scanned, 700);
        assert_eq!(profile.column("x").unwrap().max, Some(699.0));
        assert!(profile.partial);
        assert_eq!(profile.termination, Termination::RowLimit);
    }

    #[tokio::test]
    async fn test_cancelled_chunks_mark_partial() {
        let config = ProfilerConfig::builder().cancellation(|| true).build();
        let profile = ParallelProfiler::new(config)
            .profile_chunks(schema(), chunks(2, 200))
            .await
            .unwrap();
        assert!(profile.partial);
        assert_eq!(profile.termination, Termination::Cancelled);
    }

    #[tokio::test]
    async fn test_capped_chunk_subsets_report_reservoir() {
        let record_bytes = chunks(1, 1)[0][0].estimated_size_bytes() as u64;
        let config = ProfilerConfig::builder()
            .memory_budget_bytes(record_bytes * 50)
            .build();
        let profile = ParallelProfiler::new(config)
            .profile_chunks(schema(), chunks(4, 500))
            .await
            .unwrap();

        let strategy = &profile.sample_strategy_used;
        assert_eq!(strategy.method, SamplingMethod::Reservoir);
        assert!(profile.working_subset.len() < 2_000);
        assert_eq!(strategy.sample_size, profile.working_subset.len() as u64);
        assert!(profile
            .warnings
            .iter()
            .any(|w| w.contains("working subset capped")));
        assert_eq!(profile.rows_scanned, 2_000);
        assert_eq!(profile.column("x").unwrap().count, 2_000);
    }

    #[tokio::test]
    async fn test_no_chunks() {
        let profile = ParallelProfiler::new(ProfilerConfig::default())
            .profile_chunks(schema(), Vec::new())
            .await
            .unwrap();
        assert_eq!(profile.rows_scanned, 0);
        assert_eq!(profile.column("x").unwrap().mean, None);
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = ProfilerConfig::builder().pair("x", "nope").build();
        let err = ParallelProfiler::new(config)
            .profile_chunks(schema(), chunks(1, 10))
            .await
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
