//! Single-pass streaming profiler.
//!
//! [`StreamingProfiler`] drives the accumulators over a record stream and moves
//! through the phases `Idle -> Initializing -> Scanning -> Merging -> Finalized`.
//!
//! ```rust
//! use term_profile::prelude::*;
//!
//! let schema = DatasetSchema::new()
//!     .column("price", ColumnType::Numeric)
//!     .column("category", ColumnType::Categorical);
//! let records = (0..100).map(|i| {
//!     Record::new()
//!         .with("price", i as f64)
//!         .with("category", if i % 2 == 0 { "even" } else { "odd" })
//! });
//!
//! let mut profiler = StreamingProfiler::new(ProfilerConfig::default());
//! let profile = profiler
//!     .profile_records(schema, RowCountHint::Exact(100), records)
//!     .unwrap();
//!
//! assert!((profile.column("price").unwrap().mean.unwrap() - 49.5).abs() < 1e-9);
//! assert_eq!(profiler.phase(), ProfilerPhase::Finalized);
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::accumulators::{AccumulatorState, ReservoirSampler};
use crate::error::{ProfileError, Result};
use crate::logging::truncate_field;
use crate::profiler::column::{ColumnAccumulator, PairAccumulator};
use crate::profiler::config::ProfilerConfig;
use crate::profiler::profile::{DatasetProfile, Termination};
use crate::profiler::progress::{ProfilerPhase, ProgressReporter};
use crate::sampling::chunking::FOOTPRINT_SAMPLE_RECORDS;
use crate::sampling::strategy::STREAMING_SAMPLE_SIZE;
use crate::sampling::{ChunkPlan, ChunkSizer, SamplingStrategy, StrategySelector, SubsetSampler};
use crate::sources::RecordSource;
use crate::value::{DatasetSchema, Record, RowCountHint};
use crate::{log_chunk, log_sampling, perf_debug};

/// Upper bound on rows between two cancellation and time-limit checks.
const MAX_ROWS_BETWEEN_CHECKS: u64 = 4_096;

/// Largest chunk requested from a record source at once.
const MAX_SOURCE_CHUNK_ROWS: u64 = 65_536;

/// Keeps the working-subset generator independent of the reservoir's.
const SUBSET_SEED_SALT: u64 = 0xA5A5_5A5A_0F0F_F0F0;

/// Whether the caller should keep feeding records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    /// The scan has ended; further records are ignored.
    Stop(Termination),
}

impl ScanControl {
    pub fn is_stop(self) -> bool {
        matches!(self, ScanControl::Stop(_))
    }
}

/// Accumulated state of a pass, or of one chunk in parallel mode, before
/// the profile is extracted.
#[derive(Debug, Clone)]
pub(crate) struct PartialProfile {
    columns: Vec<ColumnAccumulator>,
    pairs: Vec<PairAccumulator>,
    reservoir: ReservoirSampler<Record>,
    working_subset: Vec<Record>,
    rows: u64,
    chunk_plan: Option<ChunkPlan>,
    /// The working subset was cut down to fit the memory budget.
    subset_capped: bool,
    termination: Termination,
    warnings: Vec<String>,
}

impl PartialProfile {
    pub(crate) fn rows(&self) -> u64 {
        self.rows
    }

    pub(crate) fn termination(&self) -> Termination {
        self.termination
    }

    /// Marks a completed state as stopped early for `termination`.
    pub(crate) fn stop_early(&mut self, termination: Termination) {
        if self.termination.is_partial() {
            return;
        }
        self.termination = termination;
        self.push_warning(stopped_early_warning(termination, self.rows));
    }

    pub(crate) fn push_warning(&mut self, warning: String) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Extracts the read-only profile.
    pub(crate) fn finalize(
        self,
        strategy: SamplingStrategy,
        top_k: usize,
        elapsed: Duration,
    ) -> DatasetProfile {
        let mut warnings = self.warnings;
        let strategy = if self.subset_capped {
            strategy.capped(self.working_subset.len() as u64, self.rows)
        } else {
            strategy
        };

        let combined: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.has_combined_quantiles())
            .map(ColumnAccumulator::name)
            .collect();
        if !combined.is_empty() {
            warnings.push(format!(
                "quantiles for {} were combined from chunk-local estimates \
                 and are approximate",
                combined.join(", ")
            ));
        }
        for column in &self.columns {
            let evicted = column.evicted_values();
            if evicted > 0 {
                warnings.push(format!(
                    "frequency table for '{}' evicted {evicted} values; \
                     reported counts are approximate",
                    column.name()
                ));
            }
        }

        DatasetProfile {
            columns: self
                .columns
                .iter()
                .map(|c| (c.name().to_string(), c.to_profile(top_k)))
                .collect(),
            pairs: self.pairs.iter().map(PairAccumulator::to_profile).collect(),
            sample_strategy_used: strategy,
            chunk_plan: self.chunk_plan,
            reservoir_sample: self.reservoir.into_sample(),
            working_subset: self.working_subset,
            rows_scanned: self.rows,
            partial: self.termination.is_partial(),
            termination: self.termination,
            warnings,
            profiling_time_ms: elapsed.as_millis() as u64,
        }
    }
}

impl AccumulatorState for PartialProfile {
    /// Combines the states of two consecutive chunks. Working subsets are
    /// concatenated, so merging in chunk order keeps their record order.
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        if self.columns.len() != other.columns.len() || self.pairs.len() != other.pairs.len() {
            return Err(ProfileError::state_merge(
                "partial profiles were built for different schemas",
            ));
        }
        for (column, other_column) in self.columns.iter_mut().zip(&other.columns) {
            column.merge_from(other_column)?;
        }
        for (pair, other_pair) in self.pairs.iter_mut().zip(&other.pairs) {
            pair.merge_from(other_pair)?;
        }
        self.reservoir.merge_from(&other.reservoir)?;
        self.working_subset
            .extend(other.working_subset.iter().cloned());
        self.rows += other.rows;
        if self.chunk_plan.is_none() {
            self.chunk_plan = other.chunk_plan.clone();
        }
        self.subset_capped |= other.subset_capped;
        if !self.termination.is_partial() {
            self.termination = other.termination;
        }
        for warning in &other.warnings {
            self.push_warning(warning.clone());
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Everything allocated at `Initializing` and mutated while scanning.
#[derive(Debug)]
struct ScanState {
    strategy: SamplingStrategy,
    total_rows: Option<u64>,
    exact_total: bool,
    columns: Vec<ColumnAccumulator>,
    pairs: Vec<PairAccumulator>,
    /// Numeric form of each column's value in the current record.
    numeric: Vec<Option<f64>>,
    reservoir: ReservoirSampler<Record>,
    subset: SubsetSampler,
    sizer: ChunkSizer,
    chunk_plan: Option<ChunkPlan>,
    rows: u64,
    /// Row count at which the next between-chunk check runs.
    next_check_at: u64,
    chunks: u64,
    termination: Option<Termination>,
    warnings: Vec<String>,
}

impl ScanState {
    fn ingest(&mut self, record: &Record, config: &ProfilerConfig) -> Result<()> {
        if !self.sizer.is_complete() {
            if let Some(plan) = self.sizer.observe(record) {
                self.apply_plan(plan, config)?;
            }
        }

        for (slot, column) in self.numeric.iter_mut().zip(self.columns.iter_mut()) {
            let value = record.value(column.name());
            *slot = column.update(value);
        }
        for pair in &mut self.pairs {
            pair.update(&self.numeric);
        }

        self.reservoir.update_with(|| record.clone());
        self.subset.offer(record)?;

        self.rows += 1;
        Ok(())
    }

    fn apply_plan(&mut self, plan: ChunkPlan, config: &ProfilerConfig) -> Result<()> {
        if plan.degraded {
            warn!(
                budget_bytes = config.memory_budget_bytes,
                record_bytes = plan.estimated_record_bytes,
                "Memory budget cannot hold a single record; using minimal chunks"
            );
            self.warnings.push(format!(
                "memory budget of {} bytes cannot hold one record of ~{} bytes; \
                 processing in {}-row chunks",
                config.memory_budget_bytes, plan.estimated_record_bytes, plan.rows_per_chunk
            ));
        }
        log_sampling!(
            config.log,
            enabled = plan.enabled,
            rows_per_chunk = plan.rows_per_chunk,
            record_bytes = plan.estimated_record_bytes,
            max_resident_rows = plan.max_resident_rows,
            "Chunk plan computed"
        );
        self.subset.limit_rows(plan.max_resident_rows)?;
        self.chunk_plan = Some(plan);
        Ok(())
    }

    fn check_interval(&self) -> u64 {
        self.chunk_plan
            .as_ref()
            .map_or(FOOTPRINT_SAMPLE_RECORDS as u64, |plan| plan.rows_per_chunk)
            .clamp(1, MAX_ROWS_BETWEEN_CHECKS)
    }

    /// Termination due to the row limit, if it has been reached.
    fn row_limit(&self, max_rows: Option<u64>) -> Option<Termination> {
        let limit = max_rows?;
        if self.rows < limit {
            return None;
        }
        if self.exact_total && self.total_rows == Some(self.rows) {
            Some(Termination::Completed)
        } else {
            Some(Termination::RowLimit)
        }
    }

    fn expected_rows(&self, max_rows: Option<u64>) -> Option<u64> {
        self.total_rows
            .map(|total| max_rows.map_or(total, |limit| total.min(limit)))
    }

    fn percent_complete(&self, max_rows: Option<u64>) -> Option<f64> {
        self.expected_rows(max_rows).map(|expected| {
            if expected == 0 {
                100.0
            } else {
                self.rows as f64 / expected as f64 * 100.0
            }
        })
    }
}

/// Streaming profiler for one dataset.
///
/// A profiler is single-use: once finalized it cannot scan again.
#[derive(Debug)]
pub struct StreamingProfiler {
    config: ProfilerConfig,
    phase: ProfilerPhase,
    reporter: ProgressReporter,
    started: Option<Instant>,
    scan: Option<ScanState>,
}

impl Default for StreamingProfiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl StreamingProfiler {
    pub fn new(config: ProfilerConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.progress_callback.clone(), config.progress_interval);
        Self {
            config,
            phase: ProfilerPhase::Idle,
            reporter,
            started: None,
            scan: None,
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn phase(&self) -> ProfilerPhase {
        self.phase
    }

    /// Records ingested so far.
    pub fn rows_processed(&self) -> u64 {
        self.scan.as_ref().map_or(0, |scan| scan.rows)
    }

    /// The sampling strategy selected at initialization.
    pub fn strategy(&self) -> Option<&SamplingStrategy> {
        self.scan.as_ref().map(|scan| &scan.strategy)
    }

    /// The chunk plan, once the first records have been observed.
    pub fn chunk_plan(&self) -> Option<&ChunkPlan> {
        self.scan.as_ref().and_then(|scan| scan.chunk_plan.as_ref())
    }

    /// Validates the configuration, selects a sampling strategy and allocates
    /// all accumulators.
    ///
    /// A configuration error leaves the profiler `Idle` with nothing allocated.
    #[instrument(
        skip(self, schema),
        fields(columns = schema.len(), task = self.config.task.name())
    )]
    pub fn initialize(&mut self, schema: DatasetSchema, hint: RowCountHint) -> Result<()> {
        self.expect_phase(ProfilerPhase::Idle, ProfilerPhase::Initializing)?;
        self.config.validate(&schema)?;

        let mut warnings = Vec::new();
        let strategy = match hint {
            RowCountHint::Exact(rows) => StrategySelector::new().select(rows, &self.config.task),
            RowCountHint::Estimate(rows) => {
                let strategy = StrategySelector::new().select(rows, &self.config.task);
                if !strategy.is_full_scan() {
                    warnings.push(format!(
                        "row count {rows} is an estimate; \
                         the working subset may differ from {} records",
                        strategy.sample_size
                    ));
                }
                strategy
            }
            RowCountHint::Unknown => {
                warn!("Row count unknown; falling back to reservoir sampling");
                warnings.push(format!(
                    "row count unknown; working subset drawn by reservoir sampling \
                     of up to {STREAMING_SAMPLE_SIZE} records"
                ));
                SamplingStrategy::unbounded(STREAMING_SAMPLE_SIZE)
            }
        };

        self.allocate(schema, hint, strategy, warnings)
    }

    /// Like [`initialize`](Self::initialize), with a caller-chosen strategy.
    #[instrument(
        skip(self, schema, strategy),
        fields(columns = schema.len(), method = %strategy.method)
    )]
    pub fn initialize_with_strategy(
        &mut self,
        schema: DatasetSchema,
        hint: RowCountHint,
        strategy: SamplingStrategy,
    ) -> Result<()> {
        self.expect_phase(ProfilerPhase::Idle, ProfilerPhase::Initializing)?;
        self.config.validate(&schema)?;
        if let Some(column) = &strategy.stratify_column {
            if !schema.contains(column) {
                return Err(ProfileError::column_not_found(column.as_str()));
            }
        }
        self.allocate(schema, hint, strategy, Vec::new())
    }

    fn allocate(
        &mut self,
        schema: DatasetSchema,
        hint: RowCountHint,
        strategy: SamplingStrategy,
        warnings: Vec<String>,
    ) -> Result<()> {
        self.started = Some(Instant::now());
        self.transition(ProfilerPhase::Initializing)?;
        self.reporter.report(
            ProfilerPhase::Initializing,
            0,
            Some(0.0),
            "allocating accumulators",
        );

        let seed = self.config.seed();
        let columns = schema
            .columns()
            .iter()
            .map(|spec| {
                ColumnAccumulator::new(
                    spec.name.as_str(),
                    spec.column_type,
                    &self.config.requested_quantiles,
                    self.config.max_frequency_entries,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let position = |name: &str| {
            schema
                .columns()
                .iter()
                .position(|spec| spec.name == name)
                .ok_or_else(|| ProfileError::column_not_found(name))
        };
        let pairs = self
            .config
            .selected_pairs
            .iter()
            .map(|(a, b)| -> Result<PairAccumulator> {
                Ok(PairAccumulator::new(
                    a.as_str(),
                    position(a.as_str())?,
                    b.as_str(),
                    position(b.as_str())?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        log_sampling!(
            self.config.log,
            method = %strategy.method,
            sample_size = strategy.sample_size,
            sampling_rate = strategy.sampling_rate,
            stratify_column = ?strategy.stratify_column,
            "Selected sampling strategy"
        );
        perf_debug!(
            self.config.log,
            pairs = pairs.len(),
            quantiles = ?self.config.requested_quantiles,
            seed,
            "Accumulators allocated"
        );

        self.scan = Some(ScanState {
            subset: SubsetSampler::new(&strategy, seed ^ SUBSET_SEED_SALT)?,
            reservoir: ReservoirSampler::new(self.config.reservoir_size, seed)?,
            sizer: ChunkSizer::new(self.config.memory_budget_bytes, hint.rows()),
            strategy,
            total_rows: hint.rows(),
            exact_total: matches!(hint, RowCountHint::Exact(_)),
            numeric: vec![None; columns.len()],
            columns,
            pairs,
            chunk_plan: None,
            rows: 0,
            next_check_at: FOOTPRINT_SAMPLE_RECORDS as u64,
            chunks: 0,
            termination: None,
            warnings,
        });

        self.transition(ProfilerPhase::Scanning)?;
        let percent = self
            .scan
            .as_ref()
            .and_then(|scan| scan.percent_complete(self.config.max_rows));
        self.reporter
            .report(ProfilerPhase::Scanning, 0, percent, "scanning records");
        Ok(())
    }

    /// Feeds one record.
    ///
    /// Cancellation and the time limit are checked at chunk boundaries, the
    /// row limit on every record.
    pub fn push_record(&mut self, record: &Record) -> Result<ScanControl> {
        self.expect_phase(ProfilerPhase::Scanning, ProfilerPhase::Scanning)?;
        let scan = self.scan.as_mut().ok_or_else(missing_scan_state)?;
        if let Some(termination) = scan.termination {
            return Ok(ScanControl::Stop(termination));
        }
        if let Some(termination) = scan.row_limit(self.config.max_rows) {
            scan.termination = Some(termination);
            return Ok(ScanControl::Stop(termination));
        }

        scan.ingest(record, &self.config)?;
        if let Some(termination) = scan.row_limit(self.config.max_rows) {
            scan.termination = Some(termination);
            info!(rows = scan.rows, %termination, "Row limit reached");
            return Ok(ScanControl::Stop(termination));
        }
        if scan.rows >= scan.next_check_at {
            return self.check_between_chunks();
        }
        Ok(ScanControl::Continue)
    }

    /// Feeds one chunk of records, then runs the between-chunk checks.
    pub fn push_chunk(&mut self, records: &[Record]) -> Result<ScanControl> {
        self.expect_phase(ProfilerPhase::Scanning, ProfilerPhase::Scanning)?;
        let scan = self.scan.as_mut().ok_or_else(missing_scan_state)?;
        if let Some(termination) = scan.termination {
            return Ok(ScanControl::Stop(termination));
        }

        for record in records {
            if let Some(termination) = scan.row_limit(self.config.max_rows) {
                scan.termination = Some(termination);
                return Ok(ScanControl::Stop(termination));
            }
            scan.ingest(record, &self.config)?;
            if let Some(termination) = scan.row_limit(self.config.max_rows) {
                scan.termination = Some(termination);
                info!(rows = scan.rows, %termination, "Row limit reached");
                return Ok(ScanControl::Stop(termination));
            }
        }
        scan.chunks += 1;
        log_chunk!(
            self.config.log,
            chunk = scan.chunks,
            chunk_rows = records.len(),
            rows = scan.rows,
            "Chunk scanned"
        );
        self.check_between_chunks()
    }

    fn check_between_chunks(&mut self) -> Result<ScanControl> {
        let cancelled = self.config.is_cancelled();
        let timed_out = match (self.config.time_limit, self.started) {
            (Some(limit), Some(started)) => started.elapsed() >= limit,
            _ => false,
        };

        let scan = self.scan.as_mut().ok_or_else(missing_scan_state)?;
        scan.next_check_at = scan.rows + scan.check_interval();
        self.reporter.report(
            ProfilerPhase::Scanning,
            scan.rows,
            scan.percent_complete(self.config.max_rows),
            "scanning records",
        );

        // Nothing is left to scan once an exact row count has been reached.
        if scan.exact_total && scan.total_rows == Some(scan.rows) {
            return Ok(ScanControl::Continue);
        }
        let termination = if cancelled {
            Termination::Cancelled
        } else if timed_out {
            Termination::TimeLimit
        } else {
            return Ok(ScanControl::Continue);
        };
        scan.termination = Some(termination);
        info!(rows = scan.rows, %termination, "Stopping scan early");
        Ok(ScanControl::Stop(termination))
    }

    /// Rows to request from a source for the next chunk.
    pub fn next_chunk_rows(&self) -> usize {
        let Some(scan) = &self.scan else {
            return FOOTPRINT_SAMPLE_RECORDS;
        };
        let rows = scan
            .chunk_plan
            .as_ref()
            .map_or(FOOTPRINT_SAMPLE_RECORDS as u64, |plan| plan.rows_per_chunk)
            .min(MAX_SOURCE_CHUNK_ROWS);
        let rows = match self.config.max_rows {
            Some(limit) => rows.min(limit.saturating_sub(scan.rows)),
            None => rows,
        };
        rows.max(1) as usize
    }

    /// Ends the scan and returns the accumulated state without extracting a profile.
    pub(crate) fn finish_partial(&mut self) -> Result<(SamplingStrategy, PartialProfile)> {
        self.expect_phase(ProfilerPhase::Scanning, ProfilerPhase::Merging)?;
        let mut scan = self.scan.take().ok_or_else(missing_scan_state)?;
        self.transition(ProfilerPhase::Merging)?;
        let percent = scan.percent_complete(self.config.max_rows);
        self.reporter.report(
            ProfilerPhase::Merging,
            scan.rows,
            percent,
            "merging accumulator state",
        );

        if scan.chunk_plan.is_none() && scan.rows > 0 {
            let plan = scan.sizer.plan();
            scan.apply_plan(plan, &self.config)?;
        }

        let termination = scan.termination.unwrap_or(Termination::Completed);
        if termination.is_partial() {
            scan.warnings
                .push(stopped_early_warning(termination, scan.rows));
        }

        let subset_capped = scan.subset.is_capped();
        if subset_capped {
            let limit = scan.subset.max_rows().unwrap_or_default();
            warn!(
                limit,
                budget_bytes = self.config.memory_budget_bytes,
                method = %scan.strategy.method,
                "Working subset capped to fit the memory budget"
            );
            scan.warnings.push(format!(
                "working subset capped at {limit} records to fit the memory budget of {} bytes; \
                 drawn by reservoir sampling instead of {} sampling",
                self.config.memory_budget_bytes, scan.strategy.method
            ));
        } else if !scan.exact_total
            && scan.strategy.is_full_scan()
            && termination == Termination::Completed
            && scan.total_rows != Some(scan.rows)
        {
            if let Some(estimate) = scan.total_rows {
                scan.warnings.push(format!(
                    "row count estimate {estimate} differed from the {} rows scanned",
                    scan.rows
                ));
            }
            scan.strategy = SamplingStrategy::full(scan.rows);
        }
        debug!(rows = scan.rows, chunks = scan.chunks, %termination, "Scan finished");

        let partial = PartialProfile {
            columns: scan.columns,
            pairs: scan.pairs,
            reservoir: scan.reservoir,
            working_subset: scan.subset.into_rows(),
            rows: scan.rows,
            chunk_plan: scan.chunk_plan,
            subset_capped,
            termination,
            warnings: scan.warnings,
        };
        Ok((scan.strategy, partial))
    }

    /// Ends the pass and returns the final profile.
    ///
    /// Accumulators of a single sequential pass need no merging, so `Merging`
    /// passes straight through to `Finalized`.
    #[instrument(skip(self))]
    pub fn finish(&mut self) -> Result<DatasetProfile> {
        let (strategy, partial) = self.finish_partial()?;
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let profile = partial.finalize(strategy, self.config.top_k, elapsed);

        self.transition(ProfilerPhase::Finalized)?;
        self.reporter.report(
            ProfilerPhase::Finalized,
            profile.rows_scanned,
            Some(100.0),
            "profile complete",
        );
        info!(
            rows = profile.rows_scanned,
            columns = profile.columns.len(),
            partial = profile.partial,
            time_ms = profile.profiling_time_ms,
            "Completed dataset profiling"
        );
        for warning in &profile.warnings {
            warn!(
                warning = %truncate_field(warning, self.config.log.max_field_length),
                "Profile warning"
            );
        }
        Ok(profile)
    }

    /// Profiles an in-memory or lazily produced sequence of records.
    pub fn profile_records<I>(
        &mut self,
        schema: DatasetSchema,
        hint: RowCountHint,
        records: I,
    ) -> Result<DatasetProfile>
    where
        I: IntoIterator<Item = Record>,
    {
        self.initialize(schema, hint)?;
        for record in records {
            if self.push_record(&record)?.is_stop() {
                break;
            }
        }
        self.finish()
    }

    /// Profiles everything a [`RecordSource`] yields.
    ///
    /// The profiler only awaits between chunks; each chunk is scanned synchronously.
    #[instrument(skip(self, source), fields(source = source.name()))]
    pub async fn profile_source<S>(&mut self, source: &mut S) -> Result<DatasetProfile>
    where
        S: RecordSource + ?Sized,
    {
        self.initialize(source.schema().clone(), source.row_count_hint())?;
        while let Some(chunk) = source.next_chunk(self.next_chunk_rows()).await? {
            if self.push_chunk(&chunk)?.is_stop() {
                break;
            }
        }
        self.finish()
    }

    fn expect_phase(&self, expected: ProfilerPhase, attempted: ProfilerPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ProfileError::invalid_transition(self.phase, attempted))
        }
    }

    fn transition(&mut self, next: ProfilerPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(ProfileError::invalid_transition(self.phase, next));
        }
        debug!(from = %self.phase, to = %next, "Profiler phase change");
        self.phase = next;
        Ok(())
    }
}

fn stopped_early_warning(termination: Termination, rows: u64) -> String {
    format!(
        "scan stopped early ({termination}) after {rows} rows; \
         statistics cover only the records seen"
    )
}

fn missing_scan_state() -> ProfileError {
    ProfileError::internal("scan state is not allocated")
}
