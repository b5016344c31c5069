//! End-to-end profiling of the synthetic transaction dataset.
//!
//! Requires the `test-utils` feature.

use term_profile::prelude::*;
use term_profile::test_fixtures::{
    transaction_batches, transaction_chunks, transaction_schema, transactions, DatasetSize,
    FIXTURE_SEED,
};

fn config() -> ProfilerConfig {
    ProfilerConfig::builder()
        .quantiles(vec![0.25, 0.5, 0.75, 0.95])
        .pair("quantity", "total_amount")
        .pair("unit_price", "total_amount")
        .random_seed(FIXTURE_SEED)
        .build()
}

#[test]
fn test_profile_small_transactions() {
    let rows = DatasetSize::Small.rows();
    let profile = StreamingProfiler::new(config())
        .profile_records(
            transaction_schema(),
            RowCountHint::Exact(rows as u64),
            transactions(rows, FIXTURE_SEED),
        )
        .unwrap();

    println!("{}", profile.to_json().unwrap());

    assert_eq!(profile.rows_scanned, rows as u64);
    assert!(profile.sample_strategy_used.is_full_scan());

    let quantity = profile.column("quantity").unwrap();
    assert_eq!(quantity.min, Some(1.0));
    assert_eq!(quantity.max, Some(10.0));
    assert!((quantity.mean.unwrap() - 5.5).abs() < 0.2);

    let age = profile.column("customer_age").unwrap();
    assert!(age.min.unwrap() >= 18.0 && age.max.unwrap() <= 80.0);

    let rating = profile.column("rating").unwrap();
    let missing_ratio = rating.missing_count as f64 / rows as f64;
    assert!((missing_ratio - 0.1).abs() < 0.02, "missing ratio {missing_ratio}");
    assert_eq!(rating.invalid_count, 0);

    let returned = profile.column("returned").unwrap();
    assert!((returned.true_ratio.unwrap() - 0.2).abs() < 0.02);

    let category = profile.column("category").unwrap();
    assert_eq!(category.top_frequencies.as_ref().unwrap().len(), 8);

    let customers = profile.column("customer_id").unwrap();
    assert!(profile.warnings.iter().any(|w| w.contains("customer_id")));
    assert_eq!(customers.count, rows as u64);

    let timestamp = profile.column("timestamp").unwrap();
    assert!(timestamp.min.unwrap() >= 1_577_836_800.0);

    let pair = profile.pair("quantity", "total_amount").unwrap();
    assert!(pair.correlation.unwrap() > 0.3);
}

#[tokio::test]
async fn test_arrow_and_record_fixtures_agree() {
    let rows = 3_000;
    let batches = transaction_batches(rows, 1_024, FIXTURE_SEED).unwrap();
    let mut source = ArrowBatchSource::try_new(batches)
        .unwrap()
        .with_column_type("transaction_id", ColumnType::Text)
        .unwrap()
        .with_column_type("returned", ColumnType::Boolean)
        .unwrap();
    let from_arrow = StreamingProfiler::new(config())
        .profile_source(&mut source)
        .await
        .unwrap();
    let from_records = StreamingProfiler::new(config())
        .profile_records(
            transaction_schema(),
            RowCountHint::Exact(rows as u64),
            transactions(rows, FIXTURE_SEED),
        )
        .unwrap();

    for spec in transaction_schema().columns() {
        assert_eq!(
            from_arrow.column(&spec.name),
            from_records.column(&spec.name),
            "column {}",
            spec.name
        );
    }
}

#[tokio::test]
async fn test_parallel_transactions_match_sequential() {
    let rows = 40_000;
    let parallel = ParallelProfiler::new(config())
        .profile_chunks(transaction_schema(), transaction_chunks(rows, 5_000, FIXTURE_SEED))
        .await
        .unwrap();
    let sequential = StreamingProfiler::new(config())
        .profile_records(
            transaction_schema(),
            RowCountHint::Exact(rows as u64),
            transactions(rows, FIXTURE_SEED),
        )
        .unwrap();

    for name in ["quantity", "unit_price", "total_amount", "customer_age"] {
        let p = parallel.column(name).unwrap();
        let s = sequential.column(name).unwrap();
        assert_eq!(p.count, s.count, "{name}");
        assert!((p.mean.unwrap() - s.mean.unwrap()).abs() < 1e-6, "{name}");
        assert!(
            (p.stddev.unwrap() - s.stddev.unwrap()).abs() < 1e-6 * s.stddev.unwrap(),
            "{name}"
        );
    }
    let counts = |profile: &DatasetProfile| {
        let mut entries: Vec<(String, u64)> = profile
            .column("category")
            .and_then(|c| c.top_frequencies.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|e| (e.value, e.count))
            .collect();
        entries.sort();
        entries
    };
    assert_eq!(counts(&parallel), counts(&sequential));
}
