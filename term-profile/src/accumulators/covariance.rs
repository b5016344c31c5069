//! Streaming covariance and Pearson correlation for a pair of columns.

use serde::{Deserialize, Serialize};

use super::AccumulatorState;
use crate::error::Result;

/// Two-variable Welford accumulator.
///
/// Tracks the running means of both variables, their second central moments
/// and the co-moment `C = Σ (x - x̄)(y - ȳ)`.
///
/// A correlation involving a constant series is undefined; it is reported as
/// `0.0`, since a constant carries no linear information to correlate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CovarianceAccumulator {
    count: u64,
    mean_x: f64,
    mean_y: f64,
    m2_x: f64,
    m2_y: f64,
    comoment: f64,
}

impl CovarianceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one `(x, y)` observation. Pairs with a non-finite member are ignored.
    pub fn update(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.count += 1;
        let n = self.count as f64;

        let dx = x - self.mean_x;
        self.mean_x += dx / n;
        let dy = y - self.mean_y;
        self.mean_y += dy / n;

        // dy is the pre-update deviation; pairing it with the post-update x
        // deviation gives the exact incremental co-moment.
        self.comoment += (x - self.mean_x) * dy;
        self.m2_x += dx * (x - self.mean_x);
        self.m2_y += dy * (y - self.mean_y);
    }

    /// Number of complete pairs observed.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean_x(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean_x)
    }

    pub fn mean_y(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean_y)
    }

    /// Population covariance, `C / n`.
    pub fn covariance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.comoment / self.count as f64)
    }

    /// Sample covariance, `C / (n - 1)`.
    pub fn sample_covariance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.comoment / (self.count - 1) as f64)
    }

    /// Pearson correlation in `[-1, 1]`; `0.0` when either variance is zero.
    pub fn correlation(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        if self.m2_x <= 0.0 || self.m2_y <= 0.0 {
            return Some(0.0);
        }
        let r = self.comoment / (self.m2_x * self.m2_y).sqrt();
        Some(r.clamp(-1.0, 1.0))
    }
}

impl AccumulatorState for CovarianceAccumulator {
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        if other.count == 0 {
            return Ok(());
        }
        if self.count == 0 {
            *self = other.clone();
            return Ok(());
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let dx = other.mean_x - self.mean_x;
        let dy = other.mean_y - self.mean_y;
        let weight = na * nb / n;

        self.comoment += other.comoment + dx * dy * weight;
        self.m2_x += other.m2_x + dx * dx * weight;
        self.m2_y += other.m2_y + dy * dy * weight;
        self.mean_x += dx * nb / n;
        self.mean_y += dy * nb / n;
        self.count += other.count;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.count == 0
    }
}
