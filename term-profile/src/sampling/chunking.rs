//! Chunk sizing from an estimated per-record memory footprint.

use serde::{Deserialize, Serialize};

use crate::value::Record;

/// Number of leading records used to estimate the per-record footprint.
pub const FOOTPRINT_SAMPLE_RECORDS: usize = 100;

/// Default memory budget: 500 MB.
pub const DEFAULT_MEMORY_BUDGET_BYTES: u64 = 500 * 1024 * 1024;

/// Smallest chunk the profiler will fall back to.
pub const MIN_CHUNK_ROWS: u64 = 1;

/// Chunking recommendation for a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// Whether the dataset should be processed in chunks at all.
    pub enabled: bool,
    /// Rows per chunk when `enabled`.
    pub rows_per_chunk: u64,
    /// Average bytes per record in the observed prefix.
    pub estimated_record_bytes: u64,
    /// The budget could not hold a single record; the minimum chunk was used.
    pub degraded: bool,
    /// Records the memory budget can hold at once, never less than one.
    pub max_resident_rows: u64,
}

impl ChunkPlan {
    /// Derives a plan from a footprint estimate.
    ///
    /// With a known row count that fits under the budget, chunking is disabled.
    pub fn from_estimate(
        record_bytes: u64,
        memory_budget_bytes: u64,
        total_rows: Option<u64>,
    ) -> Self {
        let record_bytes = record_bytes.max(1);
        let per_chunk = memory_budget_bytes / record_bytes;

        if per_chunk < MIN_CHUNK_ROWS {
            return Self {
                enabled: true,
                rows_per_chunk: MIN_CHUNK_ROWS,
                estimated_record_bytes: record_bytes,
                degraded: true,
                max_resident_rows: MIN_CHUNK_ROWS,
            };
        }

        let fits = total_rows
            .is_some_and(|rows| rows.saturating_mul(record_bytes) <= memory_budget_bytes);
        Self {
            enabled: !fits,
            rows_per_chunk: if fits {
                total_rows.unwrap_or(per_chunk).max(1)
            } else {
                per_chunk
            },
            estimated_record_bytes: record_bytes,
            degraded: false,
            max_resident_rows: per_chunk,
        }
    }
}

/// Observes the leading records of a stream and produces a [`ChunkPlan`].
#[derive(Debug, Clone)]
pub struct ChunkSizer {
    memory_budget_bytes: u64,
    total_rows: Option<u64>,
    observed: usize,
    observed_bytes: u64,
}

impl ChunkSizer {
    pub fn new(memory_budget_bytes: u64, total_rows: Option<u64>) -> Self {
        Self {
            memory_budget_bytes,
            total_rows,
            observed: 0,
            observed_bytes: 0,
        }
    }

    /// Feeds a record; records beyond the estimation window are ignored.
    ///
    /// Returns the plan once the window has just been filled.
    pub fn observe(&mut self, record: &Record) -> Option<ChunkPlan> {
        if self.observed >= FOOTPRINT_SAMPLE_RECORDS {
            return None;
        }
        self.observed += 1;
        self.observed_bytes += record.estimated_size_bytes() as u64;
        (self.observed == FOOTPRINT_SAMPLE_RECORDS).then(|| self.plan())
    }

    /// Whether the estimation window is complete.
    pub fn is_complete(&self) -> bool {
        self.observed >= FOOTPRINT_SAMPLE_RECORDS
    }

    /// Plan from whatever has been observed so far.
    pub fn plan(&self) -> ChunkPlan {
        let average = if self.observed == 0 {
            0
        } else {
            self.observed_bytes / self.observed as u64
        };
        ChunkPlan::from_estimate(average, self.memory_budget_bytes, self.total_rows)
    }
}
