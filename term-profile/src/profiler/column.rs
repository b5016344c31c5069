//! Per-column and per-pair accumulator state owned by the profiler.

use crate::accumulators::quantile::combine_estimates;
use crate::accumulators::{
    AccumulatorState, CovarianceAccumulator, FrequencyCounter, MomentAccumulator, P2Quantile,
};
use crate::error::{ProfileError, Result};
use crate::profiler::profile::{ColumnProfile, PairProfile, QuantileEstimate};
use crate::value::{Coerced, ColumnType, ColumnValue};

/// One quantile estimator plus the chunk-local estimates folded into it.
#[derive(Debug, Clone)]
struct QuantileTrack {
    estimator: P2Quantile,
    /// `(count, estimate)` per chunk once states have been merged.
    merged: Vec<(u64, f64)>,
}

impl QuantileTrack {
    fn new(p: f64) -> Result<Self> {
        Ok(Self {
            estimator: P2Quantile::new(p)?,
            merged: Vec::new(),
        })
    }

    fn is_empty(&self) -> bool {
        self.estimator.count() == 0 && self.merged.is_empty()
    }

    fn parts(&self) -> Vec<(u64, f64)> {
        if !self.merged.is_empty() {
            return self.merged.clone();
        }
        self.estimator
            .quantile()
            .map(|q| vec![(self.estimator.count(), q)])
            .unwrap_or_default()
    }

    fn estimate(&self) -> Option<f64> {
        if self.merged.is_empty() {
            self.estimator.quantile()
        } else {
            combine_estimates(&self.merged)
        }
    }

    fn merge_from(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        let mut parts = self.parts();
        parts.extend(other.parts());
        self.merged = parts;
    }
}

/// Accumulated state for one column.
///
/// Values are routed by the declared column type: numeric and date values feed
/// the moment accumulator and the quantile estimators, categorical values feed
/// the frequency counter, and booleans feed both the frequency counter and the
/// moment accumulator (as 0/1). Text columns are only counted.
#[derive(Debug, Clone)]
pub struct ColumnAccumulator {
    name: String,
    column_type: ColumnType,
    count: u64,
    missing: u64,
    invalid: u64,
    moments: MomentAccumulator,
    quantiles: Vec<QuantileTrack>,
    frequencies: Option<FrequencyCounter>,
}

impl ColumnAccumulator {
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        quantiles: &[f64],
        max_frequency_entries: usize,
    ) -> Result<Self> {
        let quantiles = if matches!(column_type, ColumnType::Numeric | ColumnType::Date) {
            quantiles
                .iter()
                .map(|&p| QuantileTrack::new(p))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            name: name.into(),
            column_type,
            count: 0,
            missing: 0,
            invalid: 0,
            moments: MomentAccumulator::new(),
            quantiles,
            frequencies: column_type
                .tracks_frequencies()
                .then(|| FrequencyCounter::new(max_frequency_entries)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Routes one value into the column's accumulators.
    ///
    /// Returns the numeric form of the value when it has one, for pair routing.
    /// A value that cannot be interpreted as the column type is recorded as
    /// missing (and invalid) and never fails the pass.
    pub fn update(&mut self, value: &ColumnValue) -> Option<f64> {
        match value.coerce(self.column_type) {
            Coerced::Number(x) => {
                self.count += 1;
                self.moments.update(x);
                for track in &mut self.quantiles {
                    track.estimator.update(x);
                }
                Some(x)
            }
            Coerced::Flag(flag) => {
                self.count += 1;
                if let Some(frequencies) = &mut self.frequencies {
                    frequencies.update(if flag { "true" } else { "false" });
                }
                let x = if flag { 1.0 } else { 0.0 };
                self.moments.update(x);
                Some(x)
            }
            Coerced::Category(category) => {
                self.count += 1;
                if let Some(frequencies) = &mut self.frequencies {
                    frequencies.update(&category);
                }
                None
            }
            Coerced::Present => {
                self.count += 1;
                None
            }
            Coerced::Missing => {
                self.missing += 1;
                None
            }
            Coerced::Invalid => {
                self.missing += 1;
                self.invalid += 1;
                None
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn missing_count(&self) -> u64 {
        self.missing
    }

    pub fn invalid_count(&self) -> u64 {
        self.invalid
    }

    pub fn moments(&self) -> &MomentAccumulator {
        &self.moments
    }

    /// Values dropped from the frequency table to stay under its cap.
    pub fn evicted_values(&self) -> u64 {
        self.frequencies.as_ref().map_or(0, FrequencyCounter::evicted)
    }

    /// Returns true if any quantile was combined from several chunk-local estimates.
    pub fn has_combined_quantiles(&self) -> bool {
        self.quantiles.iter().any(|track| track.merged.len() > 1)
    }

    /// Extracts the read-only profile.
    pub fn to_profile(&self, top_k: usize) -> ColumnProfile {
        let moments = &self.moments;
        let numeric = self.column_type.is_numeric_like();
        let stat = |value: Option<f64>| if numeric { value } else { None };

        ColumnProfile {
            column_type: self.column_type,
            count: self.count,
            missing_count: self.missing,
            invalid_count: self.invalid,
            sum: stat((moments.count() > 0).then(|| moments.sum())),
            mean: stat(moments.mean()),
            variance: stat(moments.population_variance()),
            sample_variance: stat(moments.sample_variance()),
            stddev: stat(moments.std_dev()),
            skewness: stat(moments.skewness()),
            kurtosis: stat(moments.kurtosis()),
            min: stat(moments.min()),
            max: stat(moments.max()),
            quantiles: self
                .quantiles
                .iter()
                .filter_map(|track| {
                    track.estimate().map(|value| QuantileEstimate {
                        p: track.estimator.p(),
                        value,
                    })
                })
                .collect(),
            top_frequencies: self.frequencies.as_ref().map(|f| f.top_k(top_k)),
            true_ratio: if self.column_type == ColumnType::Boolean {
                moments.mean()
            } else {
                None
            },
        }
    }
}

impl AccumulatorState for ColumnAccumulator {
    /// Merges counts, moments and frequencies exactly. Quantile estimators
    /// cannot be merged exactly; their chunk-local estimates are kept and
    /// combined as a count-weighted mean.
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        if self.name != other.name || self.column_type != other.column_type {
            return Err(ProfileError::state_merge(format!(
                "cannot merge column '{}' ({}) with '{}' ({})",
                self.name, self.column_type, other.name, other.column_type
            )));
        }
        if self.quantiles.len() != other.quantiles.len() {
            return Err(ProfileError::state_merge(format!(
                "column '{}' tracks a different set of quantiles",
                self.name
            )));
        }

        self.count += other.count;
        self.missing += other.missing;
        self.invalid += other.invalid;
        self.moments.merge_from(&other.moments)?;
        for (track, other_track) in self.quantiles.iter_mut().zip(&other.quantiles) {
            track.merge_from(other_track);
        }
        if let (Some(frequencies), Some(other_frequencies)) =
            (&mut self.frequencies, &other.frequencies)
        {
            frequencies.merge_from(other_frequencies)?;
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.count == 0 && self.missing == 0
    }
}

/// Covariance state for one selected column pair.
#[derive(Debug, Clone)]
pub struct PairAccumulator {
    column_a: String,
    column_b: String,
    index_a: usize,
    index_b: usize,
    covariance: CovarianceAccumulator,
}

impl PairAccumulator {
    /// Creates the state for a pair whose columns sit at `index_a` and
    /// `index_b` of the profiler's column list.
    pub fn new(
        column_a: impl Into<String>,
        index_a: usize,
        column_b: impl Into<String>,
        index_b: usize,
    ) -> Self {
        Self {
            column_a: column_a.into(),
            column_b: column_b.into(),
            index_a,
            index_b,
            covariance: CovarianceAccumulator::new(),
        }
    }

    /// Feeds the pair from the numeric values extracted for the current record.
    /// Rows where either side is unusable are skipped.
    pub fn update(&mut self, numeric: &[Option<f64>]) {
        let x = numeric.get(self.index_a).copied().flatten();
        let y = numeric.get(self.index_b).copied().flatten();
        if let (Some(x), Some(y)) = (x, y) {
            self.covariance.update(x, y);
        }
    }

    pub fn to_profile(&self) -> PairProfile {
        PairProfile {
            column_a: self.column_a.clone(),
            column_b: self.column_b.clone(),
            count: self.covariance.count(),
            covariance: self.covariance.covariance(),
            sample_covariance: self.covariance.sample_covariance(),
            correlation: self.covariance.correlation(),
        }
    }
}

impl AccumulatorState for PairAccumulator {
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        if self.column_a != other.column_a || self.column_b != other.column_b {
            return Err(ProfileError::state_merge(format!(
                "cannot merge pair ({}, {}) with ({}, {})",
                self.column_a, self.column_b, other.column_a, other.column_b
            )));
        }
        self.covariance.merge_from(&other.covariance)
    }

    fn is_empty(&self) -> bool {
        self.covariance.is_empty()
    }
}
