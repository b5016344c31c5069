//! Property-based tests for the streaming accumulators and the profiler.
//!
//! Each property compares an online result against a direct computation over
//! the same input, or checks a structural bound that must hold for every input.

use proptest::prelude::*;
use term_profile::accumulators::{
    AccumulatorState, CovarianceAccumulator, FrequencyCounter, MomentAccumulator, P2Quantile,
    ReservoirSampler,
};
use term_profile::prelude::{
    ColumnType, DatasetSchema, ProfilerConfig, Record, RowCountHint, StreamingProfiler,
};
use term_profile::sampling::{AnalysisTask, SamplingMethod, StrategySelector};

fn moments_of(values: &[f64]) -> MomentAccumulator {
    let mut acc = MomentAccumulator::new();
    for &v in values {
        acc.update(v);
    }
    acc
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #[test]
    fn prop_mean_matches_arithmetic_mean(values in prop::collection::vec(-1e6f64..1e6, 1..500)) {
        let acc = moments_of(&values);
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        let scale = values.iter().fold(1.0f64, |m, v| m.max(v.abs()));
        prop_assert_eq!(acc.count(), values.len() as u64);
        prop_assert!((acc.mean().unwrap() - expected).abs() <= 1e-9 * scale);
    }

    #[test]
    fn prop_merge_equals_single_pass(
        values in prop::collection::vec(-1e3f64..1e3, 2..400),
        split in any::<prop::sample::Index>(),
    ) {
        let at = split.index(values.len());
        let whole = moments_of(&values);
        let mut left = moments_of(&values[..at]);
        left.merge_from(&moments_of(&values[at..])).unwrap();

        prop_assert_eq!(left.count(), whole.count());
        prop_assert!(close(left.mean().unwrap(), whole.mean().unwrap(), 1e-9));
        prop_assert!(close(
            left.population_variance().unwrap(),
            whole.population_variance().unwrap(),
            1e-7
        ));
        prop_assert_eq!(left.min(), whole.min());
        prop_assert_eq!(left.max(), whole.max());
        if let (Some(a), Some(b)) = (left.skewness(), whole.skewness()) {
            prop_assert!(close(a, b, 1e-6));
        }
        if let (Some(a), Some(b)) = (left.kurtosis(), whole.kurtosis()) {
            prop_assert!(close(a, b, 1e-6));
        }
    }

    #[test]
    fn prop_quantile_stays_within_observed_range(
        values in prop::collection::vec(-1e4f64..1e4, 1..1_000),
        p in 0.01f64..0.99,
    ) {
        let mut estimator = P2Quantile::new(p).unwrap();
        for &v in &values {
            estimator.update(v);
        }
        let estimate = estimator.quantile().unwrap();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(estimate >= min && estimate <= max);
    }

    #[test]
    fn prop_reservoir_is_bounded_and_seeded(
        capacity in 1usize..50,
        items in prop::collection::vec(any::<u32>(), 0..300),
        seed in any::<u64>(),
    ) {
        let run = || {
            let mut sampler = ReservoirSampler::new(capacity, seed).unwrap();
            for &item in &items {
                sampler.update(item);
            }
            sampler
        };
        let first = run();
        let second = run();
        prop_assert_eq!(first.sample(), second.sample());
        prop_assert_eq!(first.sample().len(), items.len().min(capacity));
        prop_assert_eq!(first.count(), items.len() as u64);
        prop_assert!(first.sample().iter().all(|s| items.contains(s)));
    }

    #[test]
    fn prop_frequency_counter_respects_cap(
        max_entries in 1usize..20,
        keys in prop::collection::vec(0u16..200, 0..1_000),
    ) {
        let mut counter = FrequencyCounter::new(max_entries);
        for key in &keys {
            counter.update(&key.to_string());
            prop_assert!(counter.len() <= max_entries);
        }
        let top = counter.top_k(max_entries);
        prop_assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
        prop_assert!(counter.total_count() <= keys.len() as u64);
    }

    #[test]
    fn prop_correlation_is_bounded(
        points in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 2..300),
    ) {
        let mut acc = CovarianceAccumulator::new();
        for &(x, y) in &points {
            acc.update(x, y);
        }
        if let Some(r) = acc.correlation() {
            prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&r));
        }
    }

    #[test]
    fn prop_linear_relation_has_unit_correlation(
        xs in prop::collection::vec(-1e3f64..1e3, 3..200),
        slope in 0.5f64..10.0,
    ) {
        prop_assume!(xs.iter().any(|&x| (x - xs[0]).abs() > 1e-3));
        let mut acc = CovarianceAccumulator::new();
        for &x in &xs {
            acc.update(x, slope * x);
        }
        prop_assert!((acc.correlation().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn prop_selector_never_exceeds_population(
        rows in 0u64..5_000_000,
        task_index in 0usize..6,
    ) {
        let task = [
            AnalysisTask::Distribution,
            AnalysisTask::Outlier,
            AnalysisTask::Regression { target_column: None },
            AnalysisTask::TreeModel { target_column: Some("y".to_string()) },
            AnalysisTask::TimeOrdered,
            AnalysisTask::Summary,
        ][task_index]
            .clone();
        let strategy = StrategySelector::new().select(rows, &task);
        prop_assert!(strategy.sample_size <= rows);
        prop_assert!((0.0..=1.0).contains(&strategy.sampling_rate));
        if rows <= 10_000 {
            prop_assert_eq!(strategy.method, SamplingMethod::None);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_profile_counts_every_record(
        values in prop::collection::vec(prop::option::of(-1e3f64..1e3), 0..600),
        max_rows in prop::option::of(0u64..700),
    ) {
        let schema = DatasetSchema::new().column("v", ColumnType::Numeric);
        let records: Vec<Record> = values.iter().map(|v| Record::new().with("v", *v)).collect();
        let mut builder = ProfilerConfig::builder();
        if let Some(limit) = max_rows {
            builder = builder.max_rows(limit);
        }
        let profile = StreamingProfiler::new(builder.build())
            .profile_records(schema, RowCountHint::Exact(values.len() as u64), records)
            .unwrap();

        let scanned = max_rows.map_or(values.len(), |limit| values.len().min(limit as usize));
        let present = values[..scanned].iter().filter(|v| v.is_some()).count() as u64;
        let column = profile.column("v").unwrap();
        prop_assert_eq!(profile.rows_scanned, scanned as u64);
        prop_assert_eq!(column.count, present);
        prop_assert_eq!(column.missing_count, scanned as u64 - present);
        prop_assert_eq!(profile.partial, scanned < values.len());
    }
}
