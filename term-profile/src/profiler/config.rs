//! Profiler configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProfileError, Result};
use crate::logging::LogConfig;
use crate::profiler::progress::ProgressEvent;
use crate::sampling::{AnalysisTask, DEFAULT_MEMORY_BUDGET_BYTES};
use crate::value::DatasetSchema;

/// Seed used when the caller does not supply one.
pub const DEFAULT_RANDOM_SEED: u64 = 0x5EED_0F_7E4A;

/// Progress callback for profiling runs.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Cooperative cancellation check, polled between chunks.
pub type CancellationCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Configuration for a profiling pass.
#[derive(Clone)]
pub struct ProfilerConfig {
    /// Quantiles estimated for every numeric and date column
    pub requested_quantiles: Vec<f64>,
    /// Column pairs for covariance and correlation, fixed before the pass
    pub selected_pairs: Vec<(String, String)>,
    /// Hard cap on tracked values per categorical column
    pub max_frequency_entries: usize,
    /// Number of frequency entries reported per column
    pub top_k: usize,
    /// Capacity of the raw-row reservoir
    pub reservoir_size: usize,
    /// Memory budget used for chunk sizing
    pub memory_budget_bytes: u64,
    /// Seed for every random draw of the pass
    pub random_seed: Option<u64>,
    /// Analysis task the working subset is drawn for
    pub task: AnalysisTask,
    /// Stop after this many records
    pub max_rows: Option<u64>,
    /// Stop once this much wall-clock time has elapsed
    pub time_limit: Option<Duration>,
    /// Minimum interval between two progress events of the same phase
    pub progress_interval: Duration,
    pub log: LogConfig,
    pub progress_callback: Option<ProgressCallback>,
    pub cancellation: Option<CancellationCheck>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            requested_quantiles: vec![0.25, 0.5, 0.75],
            selected_pairs: Vec::new(),
            max_frequency_entries: 1000,
            top_k: 10,
            reservoir_size: 1000,
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            random_seed: None,
            task: AnalysisTask::default(),
            max_rows: None,
            time_limit: None,
            progress_interval: Duration::from_millis(100),
            log: LogConfig::default(),
            progress_callback: None,
            cancellation: None,
        }
    }
}

impl fmt::Debug for ProfilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilerConfig")
            .field("requested_quantiles", &self.requested_quantiles)
            .field("selected_pairs", &self.selected_pairs)
            .field("max_frequency_entries", &self.max_frequency_entries)
            .field("top_k", &self.top_k)
            .field("reservoir_size", &self.reservoir_size)
            .field("memory_budget_bytes", &self.memory_budget_bytes)
            .field("random_seed", &self.random_seed)
            .field("task", &self.task)
            .field("max_rows", &self.max_rows)
            .field("time_limit", &self.time_limit)
            .field("progress_interval", &self.progress_interval)
            .field("log", &self.log)
            .field("progress_callback", &self.progress_callback.is_some())
            .field("cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl ProfilerConfig {
    /// Creates a new builder.
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::default()
    }

    /// The seed actually used for the pass.
    pub fn seed(&self) -> u64 {
        self.random_seed.unwrap_or(DEFAULT_RANDOM_SEED)
    }

    /// Returns true if the cancellation check reports cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|check| check())
    }

    /// Validates the configuration against the dataset schema.
    ///
    /// Runs before any accumulator is allocated, so a bad configuration fails
    /// once and up front.
    pub fn validate(&self, schema: &DatasetSchema) -> Result<()> {
        if schema.is_empty() {
            return Err(ProfileError::configuration("schema declares no columns"));
        }

        for &quantile in &self.requested_quantiles {
            if !(quantile > 0.0 && quantile < 1.0) {
                return Err(ProfileError::InvalidQuantile { quantile });
            }
        }

        if self.reservoir_size == 0 {
            return Err(ProfileError::InvalidReservoirSize);
        }
        if self.max_frequency_entries == 0 {
            return Err(ProfileError::configuration(
                "max_frequency_entries must be greater than zero",
            ));
        }
        if self.memory_budget_bytes == 0 {
            return Err(ProfileError::configuration(
                "memory_budget_bytes must be greater than zero",
            ));
        }

        for (a, b) in &self.selected_pairs {
            for column in [a, b] {
                let column_type = schema
                    .column_type(column)
                    .ok_or_else(|| ProfileError::column_not_found(column.as_str()))?;
                if !column_type.is_numeric_like() {
                    return Err(ProfileError::TypeMismatch {
                        column: column.clone(),
                        expected: "numeric, date or boolean".to_string(),
                        found: column_type.to_string(),
                    });
                }
            }
        }

        if let Some(target) = self.task.target_column() {
            if !schema.contains(target) {
                return Err(ProfileError::column_not_found(target));
            }
        }

        Ok(())
    }
}

/// Builder for [`ProfilerConfig`].
#[derive(Debug, Default)]
pub struct ProfilerConfigBuilder {
    config: ProfilerConfig,
}

impl ProfilerConfigBuilder {
    /// Set the quantiles to estimate
    pub fn quantiles(mut self, quantiles: impl Into<Vec<f64>>) -> Self {
        self.config.requested_quantiles = quantiles.into();
        self
    }

    /// Add a column pair for covariance and correlation
    pub fn pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.config.selected_pairs.push((a.into(), b.into()));
        self
    }

    pub fn max_frequency_entries(mut self, max_entries: usize) -> Self {
        self.config.max_frequency_entries = max_entries;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn reservoir_size(mut self, size: usize) -> Self {
        self.config.reservoir_size = size;
        self
    }

    /// Set the memory budget used for chunk sizing
    pub fn memory_budget_bytes(mut self, bytes: u64) -> Self {
        self.config.memory_budget_bytes = bytes;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = Some(seed);
        self
    }

    pub fn task(mut self, task: AnalysisTask) -> Self {
        self.config.task = task;
        self
    }

    /// Stop the pass after `rows` records
    pub fn max_rows(mut self, rows: u64) -> Self {
        self.config.max_rows = Some(rows);
        self
    }

    /// Stop the pass after `limit` of wall-clock time
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.config.time_limit = Some(limit);
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval = interval;
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.config.log = log;
        self
    }

    /// Set progress callback
    pub fn progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.config.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Set the cancellation check, polled between chunks
    pub fn cancellation<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.config.cancellation = Some(Arc::new(check));
        self
    }

    pub fn build(self) -> ProfilerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ColumnType;

    fn schema() -> DatasetSchema {
        DatasetSchema::new()
            .column("price", ColumnType::Numeric)
            .column("quantity", ColumnType::Numeric)
            .column("category", ColumnType::Categorical)
    }

    #[test]
    fn test_defaults() {
        let config = ProfilerConfig::default();
        assert_eq!(config.requested_quantiles, vec![0.25, 0.5, 0.75]);
        assert_eq!(config.max_frequency_entries, 1000);
        assert_eq!(config.memory_budget_bytes, 500 * 1024 * 1024);
        assert_eq!(config.seed(), DEFAULT_RANDOM_SEED);
        assert!(!config.is_cancelled());
        assert!(config.validate(&schema()).is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ProfilerConfig::builder()
            .quantiles(vec![0.9])
            .pair("price", "quantity")
            .reservoir_size(10)
            .random_seed(7)
            .max_rows(500)
            .cancellation(|| true)
            .build();
        assert_eq!(config.requested_quantiles, vec![0.9]);
        assert_eq!(config.selected_pairs.len(), 1);
        assert_eq!(config.seed(), 7);
        assert_eq!(config.max_rows, Some(500));
        assert!(config.is_cancelled());
        assert!(format!("{config:?}").contains("cancellation: true"));
    }

    #[test]
    fn test_rejects_invalid_quantiles() {
        for q in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let config = ProfilerConfig::builder().quantiles(vec![0.5, q]).build();
            assert!(matches!(
                config.validate(&schema()),
                Err(ProfileError::InvalidQuantile { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_zero_reservoir() {
        let config = ProfilerConfig::builder().reservoir_size(0).build();
        assert!(matches!(
            config.validate(&schema()),
            Err(ProfileError::InvalidReservoirSize)
        ));
    }

    #[test]
    fn test_rejects_bad_pairs() {
        let config = ProfilerConfig::builder().pair("price", "missing").build();
        assert!(matches!(
            config.validate(&schema()),
            Err(ProfileError::ColumnNotFound { column }) if column == "missing"
        ));

        let config = ProfilerConfig::builder().pair("price", "category").build();
        assert!(matches!(
            config.validate(&schema()),
            Err(ProfileError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_target_and_empty_schema() {
        let config = ProfilerConfig::builder()
            .task(AnalysisTask::Regression {
                target_column: Some("nope".into()),
            })
            .build();
        assert!(config.validate(&schema()).is_err());

        let err = ProfilerConfig::default()
            .validate(&DatasetSchema::new())
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
