//! The read-only result of a profiling pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::accumulators::FrequencyEntry;
use crate::error::Result;
use crate::sampling::{ChunkPlan, SamplingStrategy};
use crate::value::{ColumnType, Record};

/// Why a pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The stream was exhausted.
    Completed,
    /// The cancellation check fired.
    Cancelled,
    /// The configured row limit was reached.
    RowLimit,
    /// The configured time limit elapsed.
    TimeLimit,
}

impl Termination {
    /// Returns true if the profile covers only part of the stream.
    pub fn is_partial(self) -> bool {
        self != Termination::Completed
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Termination::Completed => "completed",
            Termination::Cancelled => "cancelled",
            Termination::RowLimit => "row limit",
            Termination::TimeLimit => "time limit",
        };
        f.write_str(name)
    }
}

/// One estimated quantile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileEstimate {
    pub p: f64,
    pub value: f64,
}

/// Statistics for a single column.
///
/// Derived statistics are `None` where they are undefined, e.g. the mean of a
/// column without a single valid value or the skewness of a constant column.
/// Date columns report moments and quantiles in epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub column_type: ColumnType,
    /// Values that were present and usable.
    pub count: u64,
    /// Values that were absent, null or unusable.
    pub missing_count: u64,
    /// Values that were present but could not be interpreted as the column type.
    /// Included in `missing_count`.
    pub invalid_count: u64,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    /// Population variance.
    pub variance: Option<f64>,
    pub sample_variance: Option<f64>,
    pub stddev: Option<f64>,
    pub skewness: Option<f64>,
    /// Excess kurtosis.
    pub kurtosis: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub quantiles: Vec<QuantileEstimate>,
    pub top_frequencies: Option<Vec<FrequencyEntry>>,
    /// Share of `true` values, for boolean columns.
    pub true_ratio: Option<f64>,
}

impl ColumnProfile {
    /// Looks up the estimate for quantile `p`.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|q| (q.p - p).abs() < 1e-12)
            .map(|q| q.value)
    }

    /// Total number of rows observed for this column.
    pub fn rows(&self) -> u64 {
        self.count + self.missing_count
    }
}

/// Covariance and correlation of a selected column pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairProfile {
    pub column_a: String,
    pub column_b: String,
    /// Rows where both values were usable.
    pub count: u64,
    /// Population covariance.
    pub covariance: Option<f64>,
    pub sample_covariance: Option<f64>,
    /// Pearson correlation; 0 when either column is constant.
    pub correlation: Option<f64>,
}

/// Profile of a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub columns: BTreeMap<String, ColumnProfile>,
    pub pairs: Vec<PairProfile>,
    pub sample_strategy_used: SamplingStrategy,
    pub chunk_plan: Option<ChunkPlan>,
    /// Raw rows retained by the reservoir sampler.
    pub reservoir_sample: Vec<Record>,
    /// Rows materialised by the sampling strategy.
    pub working_subset: Vec<Record>,
    pub rows_scanned: u64,
    pub partial: bool,
    pub termination: Termination,
    pub warnings: Vec<String>,
    pub profiling_time_ms: u64,
}

impl DatasetProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.get(name)
    }

    /// Looks up a pair in either column order.
    pub fn pair(&self, a: &str, b: &str) -> Option<&PairProfile> {
        self.pairs.iter().find(|p| {
            (p.column_a == a && p.column_b == b) || (p.column_a == b && p.column_b == a)
        })
    }

    /// Serializes the profile as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
