//! P² (piecewise-parabolic) streaming quantile estimation.
//!
//! The estimator of Jain and Chlamtac tracks one quantile with five markers and
//! constant memory. It converges to the true quantile as the number of
//! observations grows, but it does not merge exactly: two estimators fed
//! disjoint halves of a stream cannot be combined into the estimator of the
//! whole stream. Callers that split work across chunks must either funnel all
//! values through one estimator or accept precision loss.

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

const MARKERS: usize = 5;

/// Streaming estimate of a single quantile `p`.
///
/// # Example
///
/// ```rust
/// use term_profile::accumulators::P2Quantile;
///
/// let mut median = P2Quantile::new(0.5).unwrap();
/// for i in 1..=100 {
///     median.update(i as f64);
/// }
/// let estimate = median.quantile().unwrap();
/// assert!((estimate - 50.0).abs() <= 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2Quantile {
    p: f64,
    count: u64,
    /// Marker heights; until five observations arrive, the sorted raw values.
    heights: Vec<f64>,
    /// Actual marker positions (1-based).
    positions: [f64; MARKERS],
    /// Desired marker positions.
    desired: [f64; MARKERS],
    /// Per-observation increments of the desired positions.
    increments: [f64; MARKERS],
}

impl P2Quantile {
    /// Creates an estimator for quantile `p`, which must lie in (0, 1).
    pub fn new(p: f64) -> Result<Self> {
        if !(p > 0.0 && p < 1.0) {
            return Err(ProfileError::InvalidQuantile { quantile: p });
        }

        Ok(Self {
            p,
            count: 0,
            heights: Vec::with_capacity(MARKERS),
            positions: [1.0, 2.0, 3.0, 4.0, 5.0],
            desired: [1.0, 1.0 + 2.0 * p, 1.0 + 4.0 * p, 3.0 + 2.0 * p, 5.0],
            increments: [0.0, p / 2.0, p, (1.0 + p) / 2.0, 1.0],
        })
    }

    /// The target quantile.
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Number of observations seen.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Adds one observation. Non-finite values are ignored.
    pub fn update(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        self.count += 1;

        if self.heights.len() < MARKERS {
            let idx = self.heights.partition_point(|&h| h <= x);
            self.heights.insert(idx, x);
            return;
        }

        let k = self.locate_cell(x);

        for pos in &mut self.positions[k + 1..] {
            *pos += 1.0;
        }
        for (desired, inc) in self.desired.iter_mut().zip(self.increments) {
            *desired += inc;
        }

        for i in 1..MARKERS - 1 {
            self.adjust_marker(i);
        }
    }

    /// Finds the marker cell containing `x`, widening the outer markers if needed.
    fn locate_cell(&mut self, x: f64) -> usize {
        let h = &mut self.heights;
        if x < h[0] {
            h[0] = x;
            0
        } else if x >= h[MARKERS - 1] {
            h[MARKERS - 1] = x;
            MARKERS - 2
        } else {
            // h[0] <= x < h[4], so some cell brackets x.
            (0..MARKERS - 1)
                .find(|&k| h[k] <= x && x < h[k + 1])
                .unwrap_or(MARKERS - 2)
        }
    }

    fn adjust_marker(&mut self, i: usize) {
        let n = &self.positions;
        let d = self.desired[i] - n[i];

        let drift_right = d >= 1.0 && n[i + 1] - n[i] > 1.0;
        let drift_left = d <= -1.0 && n[i - 1] - n[i] < -1.0;
        if !(drift_right || drift_left) {
            return;
        }

        let step = d.signum();
        let candidate = self.parabolic(i, step);
        let height = if self.heights[i - 1] < candidate && candidate < self.heights[i + 1] {
            candidate
        } else {
            self.linear(i, step)
        };
        self.heights[i] = height;
        self.positions[i] += step;
    }

    fn parabolic(&self, i: usize, d: f64) -> f64 {
        let q = &self.heights;
        let n = &self.positions;
        q[i] + d / (n[i + 1] - n[i - 1])
            * ((n[i] - n[i - 1] + d) * (q[i + 1] - q[i]) / (n[i + 1] - n[i])
                + (n[i + 1] - n[i] - d) * (q[i] - q[i - 1]) / (n[i] - n[i - 1]))
    }

    fn linear(&self, i: usize, d: f64) -> f64 {
        let q = &self.heights;
        let n = &self.positions;
        let j = if d > 0.0 { i + 1 } else { i - 1 };
        q[i] + d * (q[j] - q[i]) / (n[j] - n[i])
    }

    /// Current estimate, or `None` before the first observation.
    ///
    /// With fewer than five observations the exact quantile of the buffered
    /// values is returned (linear interpolation between closest ranks).
    pub fn quantile(&self) -> Option<f64> {
        match self.heights.len() {
            0 => None,
            len if len < MARKERS || self.count < MARKERS as u64 => {
                Some(exact_quantile(&self.heights, self.p))
            }
            _ => Some(self.heights[2]),
        }
    }

    /// Marker heights, which are non-decreasing once initialised.
    pub fn marker_heights(&self) -> &[f64] {
        &self.heights
    }

    /// Marker positions, which are non-decreasing.
    pub fn marker_positions(&self) -> &[f64; MARKERS] {
        &self.positions
    }
}

/// Exact quantile of already sorted values.
fn exact_quantile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Combines per-chunk estimates of the same quantile as a count-weighted mean.
///
/// This is an approximation; see the module documentation.
pub fn combine_estimates(parts: &[(u64, f64)]) -> Option<f64> {
    let total: u64 = parts.iter().map(|(n, _)| n).sum();
    if total == 0 {
        return None;
    }
    let weighted: f64 = parts.iter().map(|(n, v)| *n as f64 * v).sum();
    Some(weighted / total as f64)
}
