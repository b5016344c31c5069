//! Sampling strategy selection per analysis task.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Datasets at or below this size are always processed in full.
pub const FULL_SCAN_MAX_ROWS: u64 = 10_000;

/// Sample size used when streaming a dataset of unknown or very large size.
pub const STREAMING_SAMPLE_SIZE: u64 = 100_000;

/// The category of downstream analysis a sample is materialised for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum AnalysisTask {
    /// Distribution shape analysis.
    Distribution,
    /// Outlier and anomaly detection.
    Outlier,
    /// Regression against a target column.
    Regression { target_column: Option<String> },
    /// Tree-structured models (decision trees, forests) against a target column.
    TreeModel { target_column: Option<String> },
    /// Time-ordered analysis; sampling must preserve record order.
    TimeOrdered,
    /// Whole-dataset summary statistics.
    #[default]
    Summary,
}

impl AnalysisTask {
    /// The declared target column for supervised tasks.
    pub fn target_column(&self) -> Option<&str> {
        match self {
            AnalysisTask::Regression { target_column }
            | AnalysisTask::TreeModel { target_column } => target_column.as_deref(),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisTask::Distribution => "distribution",
            AnalysisTask::Outlier => "outlier",
            AnalysisTask::Regression { .. } => "regression",
            AnalysisTask::TreeModel { .. } => "tree_model",
            AnalysisTask::TimeOrdered => "time_ordered",
            AnalysisTask::Summary => "summary",
        }
    }
}

/// How the working subset is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    /// Keep every record.
    None,
    /// Uniform random subset.
    Random,
    /// Proportional allocation across strata.
    Stratified,
    /// Fixed stride, preserving record order.
    Systematic,
    /// Algorithm R reservoir over an unbounded stream.
    Reservoir,
}

impl fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SamplingMethod::None => "none",
            SamplingMethod::Random => "random",
            SamplingMethod::Stratified => "stratified",
            SamplingMethod::Systematic => "systematic",
            SamplingMethod::Reservoir => "reservoir",
        };
        f.write_str(name)
    }
}

/// The sampling decision for one analysis task. Immutable during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingStrategy {
    pub method: SamplingMethod,
    /// Target number of records in the working subset.
    pub sample_size: u64,
    /// `sample_size / total_rows`, or 1.0 when nothing is dropped.
    pub sampling_rate: f64,
    /// Column whose values define the strata, for stratified sampling.
    pub stratify_column: Option<String>,
    /// Whether the subset keeps the input order.
    pub preserve_order: bool,
    /// Whether the caller must avoid materialising the full dataset.
    pub streaming: bool,
    /// Row count the decision was based on, if known.
    pub total_rows: Option<u64>,
}

impl SamplingStrategy {
    /// Keep everything.
    pub fn full(total_rows: u64) -> Self {
        Self {
            method: SamplingMethod::None,
            sample_size: total_rows,
            sampling_rate: 1.0,
            stratify_column: None,
            preserve_order: true,
            streaming: false,
            total_rows: Some(total_rows),
        }
    }

    fn sampled(method: SamplingMethod, total_rows: u64, sample_size: u64) -> Self {
        let sample_size = sample_size.min(total_rows);
        Self {
            method,
            sample_size,
            sampling_rate: if total_rows == 0 {
                1.0
            } else {
                sample_size as f64 / total_rows as f64
            },
            stratify_column: None,
            preserve_order: matches!(method, SamplingMethod::Systematic | SamplingMethod::Random),
            streaming: false,
            total_rows: Some(total_rows),
        }
    }

    /// Reservoir strategy for a stream whose length is not known upfront.
    pub fn unbounded(sample_size: u64) -> Self {
        Self {
            method: SamplingMethod::Reservoir,
            sample_size,
            sampling_rate: 0.0,
            stratify_column: None,
            preserve_order: false,
            streaming: true,
            total_rows: None,
        }
    }

    /// Rescales the strategy to one chunk of `chunk_rows` records.
    ///
    /// Each chunk receives its proportional share of the sample, so the union
    /// of per-chunk subsets approximates the dataset-level subset.
    pub fn scaled_for_chunk(&self, chunk_rows: u64) -> Self {
        let mut scaled = self.clone();
        scaled.total_rows = Some(chunk_rows);
        scaled.sample_size = match (self.method, self.total_rows) {
            (SamplingMethod::None, _) => chunk_rows,
            (_, Some(total)) if total > 0 => {
                ((self.sample_size as f64 * chunk_rows as f64 / total as f64).round() as u64)
                    .min(chunk_rows)
            }
            _ => self.sample_size.min(chunk_rows),
        };
        scaled
    }

    /// The strategy actually applied once the working subset had to be cut
    /// down to `sample_size` records by a reservoir after `rows_seen` records.
    pub fn capped(&self, sample_size: u64, rows_seen: u64) -> Self {
        Self {
            method: SamplingMethod::Reservoir,
            sample_size,
            sampling_rate: if rows_seen == 0 {
                1.0
            } else {
                (sample_size as f64 / rows_seen as f64).min(1.0)
            },
            stratify_column: None,
            preserve_order: false,
            streaming: true,
            total_rows: self.total_rows,
        }
    }

    /// Returns true if no records are dropped.
    pub fn is_full_scan(&self) -> bool {
        self.method == SamplingMethod::None
    }
}

/// Chooses a [`SamplingStrategy`] from the dataset size and the analysis task.
///
/// Thresholds:
///
/// | task | rows | method | sample size |
/// |---|---|---|---|
/// | any | ≤ 10k | none | all |
/// | distribution / outlier | > 100k | stratified | min(50k, 10%) |
/// | distribution / outlier | > 50k | random | min(25k, 20%) |
/// | regression / tree model | > 50k | stratified on target | min(10k, 20%) |
/// | time ordered | > 100k | systematic | min(50k, rows) |
/// | summary | > 1M | reservoir (streaming) | 100k |
///
/// Anything else falls through to a full scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategySelector;

impl StrategySelector {
    pub fn new() -> Self {
        Self
    }

    /// Pure selection function.
    pub fn select(&self, total_rows: u64, task: &AnalysisTask) -> SamplingStrategy {
        if total_rows <= FULL_SCAN_MAX_ROWS {
            return SamplingStrategy::full(total_rows);
        }

        match task {
            AnalysisTask::Distribution | AnalysisTask::Outlier => {
                if total_rows > 100_000 {
                    SamplingStrategy::sampled(
                        SamplingMethod::Stratified,
                        total_rows,
                        percent_capped(total_rows, 10, 50_000),
                    )
                } else if total_rows > 50_000 {
                    SamplingStrategy::sampled(
                        SamplingMethod::Random,
                        total_rows,
                        percent_capped(total_rows, 20, 25_000),
                    )
                } else {
                    SamplingStrategy::full(total_rows)
                }
            }
            AnalysisTask::Regression { target_column } | AnalysisTask::TreeModel { target_column }
                if total_rows > 50_000 =>
            {
                let mut strategy = SamplingStrategy::sampled(
                    SamplingMethod::Stratified,
                    total_rows,
                    percent_capped(total_rows, 20, 10_000),
                );
                strategy.stratify_column = target_column.clone();
                strategy
            }
            AnalysisTask::TimeOrdered if total_rows > 100_000 => SamplingStrategy::sampled(
                SamplingMethod::Systematic,
                total_rows,
                total_rows.min(50_000),
            ),
            AnalysisTask::Summary if total_rows > 1_000_000 => {
                let mut strategy = SamplingStrategy::sampled(
                    SamplingMethod::Reservoir,
                    total_rows,
                    STREAMING_SAMPLE_SIZE,
                );
                strategy.streaming = true;
                strategy
            }
            _ => SamplingStrategy::full(total_rows),
        }
    }
}

fn percent_capped(total_rows: u64, percent: u64, cap: u64) -> u64 {
    (total_rows * percent / 100).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(rows: u64, task: AnalysisTask) -> SamplingStrategy {
        StrategySelector::new().select(rows, &task)
    }

    #[test]
    fn test_small_datasets_are_scanned_fully() {
        for task in [
            AnalysisTask::Distribution,
            AnalysisTask::Summary,
            AnalysisTask::TimeOrdered,
        ] {
            let strategy = select(10_000, task);
            assert_eq!(strategy.method, SamplingMethod::None);
            assert_eq!(strategy.sample_size, 10_000);
            assert_eq!(strategy.sampling_rate, 1.0);
        }
    }

    #[test]
    fn test_distribution_thresholds() {
        let strategy = select(200_000, AnalysisTask::Distribution);
        assert_eq!(strategy.method, SamplingMethod::Stratified);
        assert_eq!(strategy.sample_size, 20_000);
        assert!((strategy.sampling_rate - 0.1).abs() < 1e-12);

        let strategy = select(2_000_000, AnalysisTask::Outlier);
        assert_eq!(strategy.sample_size, 50_000);

        let strategy = select(60_000, AnalysisTask::Distribution);
        assert_eq!(strategy.method, SamplingMethod::Random);
        assert_eq!(strategy.sample_size, 12_000);

        let strategy = select(30_000, AnalysisTask::Outlier);
        assert_eq!(strategy.method, SamplingMethod::None);
    }

    #[test]
    fn test_regression_stratifies_on_target() {
        let strategy = select(
            80_000,
            AnalysisTask::Regression {
                target_column: Some("price".into()),
            },
        );
        assert_eq!(strategy.method, SamplingMethod::Stratified);
        assert_eq!(strategy.sample_size, 10_000);
        assert_eq!(strategy.stratify_column.as_deref(), Some("price"));

        let strategy = select(40_000, AnalysisTask::TreeModel { target_column: None });
        assert_eq!(strategy.method, SamplingMethod::None);
    }

    #[test]
    fn test_time_ordered_is_systematic() {
        let strategy = select(500_000, AnalysisTask::TimeOrdered);
        assert_eq!(strategy.method, SamplingMethod::Systematic);
        assert_eq!(strategy.sample_size, 50_000);
        assert!(strategy.preserve_order);

        let strategy = select(90_000, AnalysisTask::TimeOrdered);
        assert_eq!(strategy.method, SamplingMethod::None);
    }

    #[test]
    fn test_summary_streams_large_datasets() {
        let strategy = select(5_000_000, AnalysisTask::Summary);
        assert_eq!(strategy.method, SamplingMethod::Reservoir);
        assert_eq!(strategy.sample_size, 100_000);
        assert!(strategy.streaming);

        let strategy = select(1_000_000, AnalysisTask::Summary);
        assert_eq!(strategy.method, SamplingMethod::None);
    }

    #[test]
    fn test_scaled_for_chunk() {
        let strategy = select(200_000, AnalysisTask::Distribution);
        let chunk = strategy.scaled_for_chunk(50_000);
        assert_eq!(chunk.sample_size, 5_000);
        assert_eq!(chunk.total_rows, Some(50_000));

        let full = SamplingStrategy::full(100).scaled_for_chunk(30);
        assert_eq!(full.sample_size, 30);

        let unbounded = SamplingStrategy::unbounded(1_000).scaled_for_chunk(200);
        assert_eq!(unbounded.sample_size, 200);
    }

    #[test]
    fn test_capped_strategy_reports_reservoir() {
        let capped = SamplingStrategy::full(200_000).capped(20_000, 200_000);
        assert_eq!(capped.method, SamplingMethod::Reservoir);
        assert_eq!(capped.sample_size, 20_000);
        assert!((capped.sampling_rate - 0.1).abs() < 1e-12);
        assert!(!capped.preserve_order);
        assert!(!capped.is_full_scan());
        assert_eq!(capped.total_rows, Some(200_000));
    }

    #[test]
    fn test_task_serialization() {
        let task = AnalysisTask::Regression {
            target_column: Some("y".into()),
        };
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(json, r#"{"task":"regression","target_column":"y"}"#);
        assert_eq!(task.target_column(), Some("y"));
        assert_eq!(task.name(), "regression");
    }
}
