//! Materialising the working subset for a [`SamplingStrategy`] in one pass.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::strategy::{SamplingMethod, SamplingStrategy};
use crate::accumulators::ReservoirSampler;
use crate::error::Result;
use crate::value::{ColumnValue, Record};

/// Positional strata used when no stratify column is declared.
pub const POSITIONAL_STRATA: u64 = 10;

/// Maximum number of value-defined strata; further values share one stratum.
pub const MAX_STRATA: usize = 64;

const OVERFLOW_STRATUM: &str = "__other__";

/// Offsets per-stratum seeds so strata draw independent streams.
const STRATUM_SEED_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
struct Stratum {
    seen: u64,
    reservoir: ReservoirSampler<Record>,
}

#[derive(Debug, Clone)]
enum Sampler {
    /// Every record, in input order.
    All(Vec<Record>),
    /// Knuth's selection sampling: exact size, input order preserved.
    Selection {
        rng: StdRng,
        remaining_population: u64,
        remaining_needed: u64,
        rows: Vec<Record>,
    },
    /// Every `stride`-th record from a random offset.
    Systematic {
        stride: f64,
        next_pick: f64,
        limit: usize,
        rows: Vec<Record>,
    },
    Stratified {
        column: Option<String>,
        block_rows: u64,
        capacity: usize,
        strata: BTreeMap<String, Stratum>,
    },
    Reservoir(ReservoirSampler<Record>),
}

/// Draws the working subset described by a [`SamplingStrategy`] from a stream.
///
/// Once [`limit_rows`](Self::limit_rows) has been called, full-scan and
/// reservoir subsets never hold more than the limit. A full-scan subset that
/// reaches it continues as a reservoir of that size.
#[derive(Debug, Clone)]
pub struct SubsetSampler {
    sample_size: u64,
    seed: u64,
    index: u64,
    sampler: Sampler,
    max_rows: Option<usize>,
    capped: bool,
}

impl SubsetSampler {
    /// Builds a sampler for `strategy`, seeded with `seed`.
    pub fn new(strategy: &SamplingStrategy, seed: u64) -> Result<Self> {
        let sample_size = strategy.sample_size;
        let total = strategy.total_rows.unwrap_or(sample_size);
        let capacity = sample_size.max(1) as usize;

        let sampler = match strategy.method {
            SamplingMethod::None => {
                Sampler::All(Vec::with_capacity((total as usize).min(1 << 16)))
            }
            SamplingMethod::Random => Sampler::Selection {
                rng: StdRng::seed_from_u64(seed),
                remaining_population: total,
                remaining_needed: sample_size,
                rows: Vec::with_capacity(capacity.min(1 << 16)),
            },
            SamplingMethod::Systematic => {
                let stride = if sample_size == 0 {
                    f64::INFINITY
                } else {
                    (total as f64 / sample_size as f64).max(1.0)
                };
                let mut rng = StdRng::seed_from_u64(seed);
                let offset = if stride.is_finite() {
                    rng.random::<f64>() * stride
                } else {
                    0.0
                };
                Sampler::Systematic {
                    stride,
                    next_pick: offset.floor(),
                    limit: sample_size as usize,
                    rows: Vec::with_capacity(capacity.min(1 << 16)),
                }
            }
            SamplingMethod::Stratified => {
                let column = strategy.stratify_column.clone();
                let (block_rows, capacity) = if column.is_some() {
                    (0, capacity)
                } else {
                    let blocks = POSITIONAL_STRATA.min(total.max(1));
                    (
                        total.div_ceil(blocks).max(1),
                        sample_size.div_ceil(blocks).max(1) as usize,
                    )
                };
                Sampler::Stratified {
                    column,
                    block_rows,
                    capacity,
                    strata: BTreeMap::new(),
                }
            }
            SamplingMethod::Reservoir => Sampler::Reservoir(ReservoirSampler::new(capacity, seed)?),
        };

        Ok(Self {
            sample_size,
            seed,
            index: 0,
            sampler,
            max_rows: None,
            capped: false,
        })
    }

    /// Bounds the number of records the subset may hold.
    ///
    /// Methods with a fixed sample size (random, systematic, stratified) keep
    /// it; their size was chosen for the dataset and does not grow with it.
    pub fn limit_rows(&mut self, max_rows: u64) -> Result<()> {
        let max_rows = max_rows.max(1) as usize;
        self.max_rows = Some(max_rows);
        if matches!(&self.sampler, Sampler::All(rows) if rows.len() > max_rows) {
            self.spill(max_rows)?;
        }
        if let Sampler::Reservoir(reservoir) = &mut self.sampler {
            if reservoir.capacity() > max_rows {
                reservoir.shrink_to(max_rows)?;
                self.capped = true;
            }
        }
        Ok(())
    }

    /// Whether the subset was reduced to stay under the row limit.
    pub fn is_capped(&self) -> bool {
        self.capped
    }

    /// The row limit, if one has been set.
    pub fn max_rows(&self) -> Option<u64> {
        self.max_rows.map(|rows| rows as u64)
    }

    /// Turns the full-scan subset into a reservoir of `max_rows` records.
    fn spill(&mut self, max_rows: usize) -> Result<()> {
        if let Sampler::All(rows) = &mut self.sampler {
            let rows = std::mem::take(rows);
            self.sampler =
                Sampler::Reservoir(ReservoirSampler::from_items(rows, max_rows, self.seed)?);
            self.capped = true;
        }
        Ok(())
    }

    /// Offers the next record of the stream.
    pub fn offer(&mut self, record: &Record) -> Result<()> {
        let index = self.index;
        self.index += 1;

        let spill_at = match (&self.sampler, self.max_rows) {
            (Sampler::All(rows), Some(max_rows)) if rows.len() >= max_rows => Some(max_rows),
            _ => None,
        };
        if let Some(max_rows) = spill_at {
            self.spill(max_rows)?;
        }

        match &mut self.sampler {
            Sampler::All(rows) => rows.push(record.clone()),
            Sampler::Reservoir(reservoir) => {
                reservoir.update_with(|| record.clone());
            }
            Sampler::Selection {
                rng,
                remaining_population,
                remaining_needed,
                rows,
            } => {
                if *remaining_needed == 0 || *remaining_population == 0 {
                    return Ok(());
                }
                let u: f64 = rng.random();
                if u * (*remaining_population as f64) < *remaining_needed as f64 {
                    rows.push(record.clone());
                    *remaining_needed -= 1;
                }
                *remaining_population -= 1;
            }
            Sampler::Systematic {
                stride,
                next_pick,
                limit,
                rows,
            } => {
                if rows.len() < *limit && index as f64 >= *next_pick {
                    rows.push(record.clone());
                    *next_pick += *stride;
                }
            }
            Sampler::Stratified {
                column,
                block_rows,
                capacity,
                strata,
            } => {
                let key = match column {
                    Some(column) => stratum_key(record.value(column)),
                    None => format!("{:06}", index / *block_rows),
                };
                let key = if strata.contains_key(&key) || strata.len() < MAX_STRATA {
                    key
                } else {
                    OVERFLOW_STRATUM.to_string()
                };
                if !strata.contains_key(&key) {
                    let seed = self
                        .seed
                        .wrapping_add(STRATUM_SEED_STEP.wrapping_mul(strata.len() as u64 + 1));
                    strata.insert(
                        key.clone(),
                        Stratum {
                            seen: 0,
                            reservoir: ReservoirSampler::new(*capacity, seed)?,
                        },
                    );
                }
                if let Some(stratum) = strata.get_mut(&key) {
                    stratum.seen += 1;
                    stratum.reservoir.update_with(|| record.clone());
                }
            }
        }
        Ok(())
    }

    /// Number of records offered so far.
    pub fn offered(&self) -> u64 {
        self.index
    }

    /// Finishes the pass and returns the subset.
    ///
    /// Stratified subsets allocate `sample_size` across strata in proportion
    /// to each stratum's share of the stream; every non-empty stratum keeps at
    /// least one record.
    pub fn into_rows(self) -> Vec<Record> {
        match self.sampler {
            Sampler::Reservoir(reservoir) => reservoir.into_sample(),
            Sampler::All(rows)
            | Sampler::Selection { rows, .. }
            | Sampler::Systematic { rows, .. } => rows,
            Sampler::Stratified { strata, .. } => {
                let total: u64 = strata.values().map(|s| s.seen).sum();
                if total == 0 {
                    return Vec::new();
                }
                let target = self.sample_size.min(total);
                let mut rows = Vec::with_capacity(target as usize);
                for stratum in strata.into_values() {
                    let share =
                        (target as f64 * stratum.seen as f64 / total as f64).round() as usize;
                    rows.extend(stratum.reservoir.into_subsample(share.max(1)));
                }
                rows.truncate(target as usize);
                rows
            }
        }
    }
}

/// Stratum label for a value. Numbers are grouped by sign and decimal magnitude
/// so that continuous targets produce a bounded number of strata.
fn stratum_key(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Numeric(x) if x.is_finite() => {
            if *x == 0.0 {
                "0".to_string()
            } else {
                let sign = if *x < 0.0 { "-" } else { "+" };
                format!("{sign}1e{}", x.abs().log10().floor() as i32)
            }
        }
        ColumnValue::Missing => "<missing>".to_string(),
        other => other.to_string(),
    }
}
