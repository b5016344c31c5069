//! Seeded reservoir sampling (Algorithm R).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::AccumulatorState;
use crate::error::{ProfileError, Result};

/// Uniform random sample of at most `k` items from a stream of unknown length.
///
/// The generator is owned by the sampler and seeded explicitly, so the same
/// seed and the same input order always produce the same sample.
///
/// # Example
///
/// ```rust
/// use term_profile::accumulators::ReservoirSampler;
///
/// let mut sampler = ReservoirSampler::new(5, 42).unwrap();
/// for i in 1..=20 {
///     sampler.update(i);
/// }
/// assert_eq!(sampler.sample().len(), 5);
/// assert_eq!(sampler.count(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct ReservoirSampler<T> {
    capacity: usize,
    seen: u64,
    buffer: Vec<T>,
    rng: StdRng,
}

impl<T> ReservoirSampler<T> {
    /// Creates a sampler that keeps `capacity` items, seeded with `seed`.
    pub fn new(capacity: usize, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(ProfileError::InvalidReservoirSize);
        }
        Ok(Self {
            capacity,
            seen: 0,
            buffer: Vec::with_capacity(capacity.min(1 << 16)),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Builds a sampler over `items`, taken to be every item of the stream so far.
    ///
    /// Keeps a uniform `capacity`-sized subset of them; later updates continue
    /// Algorithm R from `items.len()`.
    pub fn from_items(items: Vec<T>, capacity: usize, seed: u64) -> Result<Self> {
        let mut sampler = Self::new(capacity, seed)?;
        sampler.seen = items.len() as u64;
        sampler.buffer = items;
        sampler.shrink_to(capacity)?;
        Ok(sampler)
    }

    /// Lowers the capacity, keeping a uniform subset of the current sample.
    ///
    /// A capacity at or above the current one changes nothing.
    pub fn shrink_to(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(ProfileError::InvalidReservoirSize);
        }
        if self.buffer.len() > capacity {
            self.buffer.shuffle(&mut self.rng);
            self.buffer.truncate(capacity);
        }
        self.capacity = self.capacity.min(capacity);
        Ok(())
    }

    /// Offers one item to the reservoir.
    pub fn update(&mut self, item: T) {
        self.update_with(|| item);
    }

    /// Offers one item, building it only if it is kept.
    ///
    /// Consumes exactly the same random draws as [`update`](Self::update).
    pub fn update_with<F: FnOnce() -> T>(&mut self, make: F) {
        self.seen += 1;
        if self.buffer.len() < self.capacity {
            self.buffer.push(make());
            return;
        }
        let j = self.rng.random_range(0..self.seen);
        if j < self.capacity as u64 {
            self.buffer[j as usize] = make();
        }
    }

    /// The current sample. Order carries no meaning.
    pub fn sample(&self) -> &[T] {
        &self.buffer
    }

    /// Consumes the sampler and returns the sample.
    pub fn into_sample(self) -> Vec<T> {
        self.buffer
    }

    /// Consumes the sampler and returns a uniform subset of at most `k` sampled items.
    pub fn into_subsample(mut self, k: usize) -> Vec<T> {
        if k < self.buffer.len() {
            self.buffer.shuffle(&mut self.rng);
            self.buffer.truncate(k);
        }
        self.buffer
    }

    /// Total number of items offered.
    pub fn count(&self) -> u64 {
        self.seen
    }

    /// Maximum sample size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone + Send + std::fmt::Debug> AccumulatorState for ReservoirSampler<T> {
    /// Combines two reservoirs by weighted re-sampling.
    ///
    /// Every retained item stands for `seen / len` items of its sub-stream. Slots
    /// of the merged reservoir are drawn without replacement from the two
    /// buffers, choosing a side with probability proportional to its remaining
    /// stream weight. The draw uses this sampler's generator, so the result is
    /// deterministic for fixed seeds and merge order.
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        if other.seen == 0 {
            return Ok(());
        }
        if self.seen == 0 {
            self.seen = other.seen;
            self.buffer = other.buffer.iter().take(self.capacity).cloned().collect();
            return Ok(());
        }

        let mut left = std::mem::take(&mut self.buffer);
        let mut right = other.buffer.clone();
        let left_weight = self.seen as f64 / left.len().max(1) as f64;
        let right_weight = other.seen as f64 / right.len().max(1) as f64;

        let target = self.capacity.min(left.len() + right.len());
        let mut merged = Vec::with_capacity(target);
        while merged.len() < target {
            let wl = left_weight * left.len() as f64;
            let wr = right_weight * right.len() as f64;
            let take_left = if right.is_empty() {
                true
            } else if left.is_empty() {
                false
            } else {
                self.rng.random::<f64>() * (wl + wr) < wl
            };
            let side = if take_left { &mut left } else { &mut right };
            let idx = self.rng.random_range(0..side.len());
            merged.push(side.swap_remove(idx));
        }

        self.buffer = merged;
        self.seen += other.seen;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.seen == 0
    }
}
