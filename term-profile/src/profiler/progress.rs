//! Profiler lifecycle phases and rate-limited progress reporting.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::config::ProgressCallback;

/// Lifecycle phase of a profiling pass.
///
/// Phases only move forward: `Idle -> Initializing -> Scanning -> Merging -> Finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilerPhase {
    Idle,
    Initializing,
    Scanning,
    Merging,
    Finalized,
}

impl ProfilerPhase {
    /// Returns true if `next` directly follows this phase.
    pub fn can_transition_to(self, next: ProfilerPhase) -> bool {
        matches!(
            (self, next),
            (ProfilerPhase::Idle, ProfilerPhase::Initializing)
                | (ProfilerPhase::Initializing, ProfilerPhase::Scanning)
                | (ProfilerPhase::Scanning, ProfilerPhase::Merging)
                | (ProfilerPhase::Merging, ProfilerPhase::Finalized)
        )
    }
}

impl fmt::Display for ProfilerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfilerPhase::Idle => "idle",
            ProfilerPhase::Initializing => "initializing",
            ProfilerPhase::Scanning => "scanning",
            ProfilerPhase::Merging => "merging",
            ProfilerPhase::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Progress information during profiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: ProfilerPhase,
    /// Share of the expected rows processed, when the row count is known.
    pub percent_complete: Option<f64>,
    pub current_operation: String,
    pub rows_processed: u64,
}

/// Delivers [`ProgressEvent`]s to a callback at a bounded rate.
///
/// The first event of every phase is always delivered; later events of the
/// same phase are dropped until `interval` has passed.
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    interval: Duration,
    last_phase: Option<ProfilerPhase>,
    last_emit: Option<Instant>,
    emitted: u64,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>, interval: Duration) -> Self {
        Self {
            callback,
            interval,
            last_phase: None,
            last_emit: None,
            emitted: 0,
        }
    }

    /// Reports progress; returns true if the event was delivered.
    pub fn report(
        &mut self,
        phase: ProfilerPhase,
        rows_processed: u64,
        percent_complete: Option<f64>,
        operation: &str,
    ) -> bool {
        let Some(callback) = &self.callback else {
            return false;
        };

        let now = Instant::now();
        let phase_changed = self.last_phase != Some(phase);
        let due = self
            .last_emit
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if !phase_changed && !due {
            return false;
        }

        callback(&ProgressEvent {
            phase,
            percent_complete: percent_complete.map(|p| p.clamp(0.0, 100.0)),
            current_operation: operation.to_string(),
            rows_processed,
        });
        self.last_phase = Some(phase);
        self.last_emit = Some(now);
        self.emitted += 1;
        true
    }

    /// Number of events delivered so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .field("interval", &self.interval)
            .field("last_phase", &self.last_phase)
            .field("emitted", &self.emitted)
            .finish()
    }
}
