//! Memory-bounded frequency counting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AccumulatorState;
use crate::error::Result;

/// Fraction of `max_entries` the table is pruned down to when it overflows.
const PRUNE_TARGET_RATIO: f64 = 0.9;

/// A value and its (possibly approximate) count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    count: u64,
    first_seen: u64,
}

/// Approximate top-K counter with a hard cap on tracked values.
///
/// When the table grows past `max_entries`, the lowest-count entries are
/// evicted until it holds at most 90% of `max_entries`. Among entries with
/// equal counts the one first seen earliest is evicted first, so newly
/// arriving values get a chance to accumulate. A value that is evicted and
/// later reappears starts again from zero: counts are lower bounds and the
/// top-K is approximate, not exact.
///
/// Eviction sorts the table and leaves `target = max(1, floor(0.9 * max_entries))`
/// entries, so the next pass needs `max_entries - target + 1` new distinct
/// values. Below a cap of ten that is every second new value, or every new
/// value when the cap is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyCounter {
    max_entries: usize,
    entries: HashMap<String, Slot>,
    total: u64,
    sequence: u64,
    evicted: u64,
}

impl FrequencyCounter {
    /// Creates a counter tracking at most `max_entries` distinct values.
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            max_entries,
            entries: HashMap::with_capacity(max_entries.min(4096) + 1),
            total: 0,
            sequence: 0,
            evicted: 0,
        }
    }

    /// Counts one occurrence of `value`.
    pub fn update(&mut self, value: &str) {
        self.add(value, 1);
    }

    fn add(&mut self, value: &str, count: u64) {
        self.total += count;
        if let Some(slot) = self.entries.get_mut(value) {
            slot.count += count;
            return;
        }

        self.entries.insert(
            value.to_string(),
            Slot {
                count,
                first_seen: self.sequence,
            },
        );
        self.sequence += 1;

        if self.entries.len() > self.max_entries {
            self.prune();
        }
    }

    fn prune_target(&self) -> usize {
        ((self.max_entries as f64 * PRUNE_TARGET_RATIO).floor() as usize).max(1)
    }

    fn prune(&mut self) {
        let target = self.prune_target();
        let excess = self.entries.len().saturating_sub(target);
        if excess == 0 {
            return;
        }

        let mut ranked: Vec<(&String, &Slot)> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            a.1.count
                .cmp(&b.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });
        let victims: Vec<String> = ranked
            .into_iter()
            .take(excess)
            .map(|(value, _)| value.clone())
            .collect();

        for value in victims {
            self.entries.remove(&value);
        }
        self.evicted += excess as u64;
    }

    /// The `k` highest-count entries, descending by count, ties by first-seen order.
    pub fn top_k(&self, k: usize) -> Vec<FrequencyEntry> {
        let mut ranked: Vec<(&String, &Slot)> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });
        ranked
            .into_iter()
            .take(k)
            .map(|(value, slot)| FrequencyEntry {
                value: value.clone(),
                count: slot.count,
            })
            .collect()
    }

    /// Tracked count for `value`, if it is currently in the table.
    pub fn count_of(&self, value: &str) -> Option<u64> {
        self.entries.get(value).map(|slot| slot.count)
    }

    /// Total number of observations, including those of evicted values.
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Number of distinct values currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no values are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of table entries dropped by pruning so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Maximum number of tracked values.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Resets the counter, keeping its capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total = 0;
        self.sequence = 0;
        self.evicted = 0;
    }
}

impl AccumulatorState for FrequencyCounter {
    /// Sums counts per value. Entries of `other` are ordered after those of
    /// `self` for tie-breaking, then the table is pruned to its cap.
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        let mut incoming: Vec<(&String, &Slot)> = other.entries.iter().collect();
        incoming.sort_by_key(|(_, slot)| slot.first_seen);

        for (value, slot) in incoming {
            if let Some(existing) = self.entries.get_mut(value.as_str()) {
                existing.count += slot.count;
            } else {
                self.entries.insert(
                    value.clone(),
                    Slot {
                        count: slot.count,
                        first_seen: self.sequence + slot.first_seen,
                    },
                );
            }
        }
        self.sequence += other.sequence;
        self.total += other.total;
        self.evicted += other.evicted;

        if self.entries.len() > self.max_entries {
            self.prune();
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_cadence() {
        let mut counter = FrequencyCounter::new(20);
        for i in 0..21 {
            counter.update(&format!("v{i}"));
        }
        assert_eq!(counter.evicted(), 3);
        assert_eq!(counter.len(), 18);
        for i in 21..23 {
            counter.update(&format!("v{i}"));
        }
        assert_eq!(counter.evicted(), 3);
        counter.update("v23");
        assert_eq!(counter.evicted(), 6);

        let mut small = FrequencyCounter::new(5);
        for i in 0..8 {
            small.update(&format!("v{i}"));
        }
        // Passes at the 6th and 8th distinct value, two evictions each.
        assert_eq!(small.evicted(), 4);
        assert_eq!(small.len(), 4);

        let mut single = FrequencyCounter::new(1);
        for i in 0..4 {
            single.update(&format!("v{i}"));
        }
        assert_eq!(single.evicted(), 3);
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_counts_and_top_k() {
        let mut counter = FrequencyCounter::new(100);
        for value in ["a", "b", "a", "c", "a", "b"] {
            counter.update(value);
        }

        assert_eq!(counter.total_count(), 6);
        assert_eq!(counter.len(), 3);
        let top = counter.top_k(2);
        assert_eq!(
            top,
            vec![
                FrequencyEntry { value: "a".into(), count: 3 },
                FrequencyEntry { value: "b".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_ties_broken_by_first_seen() {
        let mut counter = FrequencyCounter::new(10);
        for value in ["z", "y", "x"] {
            counter.update(value);
        }
        let order: Vec<_> = counter.top_k(3).into_iter().map(|e| e.value).collect();
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_bounded_under_distinct_stream() {
        let mut counter = FrequencyCounter::new(5);
        for i in 0..1000 {
            counter.update(&format!("key-{i}"));
            assert!(counter.len() <= 5, "len={} at {i}", counter.len());
        }
        assert_eq!(counter.total_count(), 1000);
        assert!(counter.evicted() > 0);
    }

    #[test]
    fn test_heavy_hitter_survives_pruning() {
        let mut counter = FrequencyCounter::new(5);
        for i in 0..1000 {
            counter.update("hot");
            counter.update(&format!("cold-{i}"));
        }
        let top = counter.top_k(2);
        assert_eq!(top[0].value, "hot");
        assert_eq!(top[0].count, 1000);
        assert!(top.windows(2).all(|w| w[0].count > w[1].count));
    }

    #[test]
    fn test_clear() {
        let mut counter = FrequencyCounter::new(3);
        counter.update("a");
        counter.clear();
        assert!(counter.is_empty());
        assert_eq!(counter.total_count(), 0);
        assert!(counter.top_k(5).is_empty());
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut left = FrequencyCounter::new(10);
        let mut right = FrequencyCounter::new(10);
        for v in ["a", "b", "a"] {
            left.update(v);
        }
        for v in ["b", "c", "b"] {
            right.update(v);
        }
        left.merge_from(&right).unwrap();

        assert_eq!(left.total_count(), 6);
        assert_eq!(left.count_of("b"), Some(3));
        assert_eq!(left.count_of("a"), Some(2));
        assert_eq!(left.count_of("c"), Some(1));
    }

    #[test]
    fn test_merge_respects_cap() {
        let mut left = FrequencyCounter::new(4);
        let mut right = FrequencyCounter::new(4);
        for i in 0..4 {
            left.update(&format!("l{i}"));
            right.update(&format!("r{i}"));
        }
        left.merge_from(&right).unwrap();
        assert!(left.len() <= 4);
        assert_eq!(left.total_count(), 8);
    }
}
