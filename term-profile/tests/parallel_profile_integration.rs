//! Integration tests for parallel-chunk profiling and state merging.

use std::sync::{Arc, Mutex};

use term_profile::accumulators::{CovarianceAccumulator, FrequencyCounter, MomentAccumulator};
use term_profile::prelude::*;

fn schema() -> DatasetSchema {
    DatasetSchema::new()
        .column("latency", ColumnType::Numeric)
        .column("bytes", ColumnType::Numeric)
        .column("status", ColumnType::Categorical)
        .column("cached", ColumnType::Boolean)
}

fn request(i: usize) -> Record {
    let latency = ((i * 7_919) % 1_000) as f64 / 10.0;
    Record::new()
        .with("latency", latency)
        .with("bytes", latency * 12.5 + (i % 3) as f64)
        .with("status", ["200", "200", "200", "404", "500"][i % 5])
        .with("cached", i % 4 == 0)
}

fn chunks(count: usize, size: usize) -> Vec<Vec<Record>> {
    (0..count)
        .map(|c| (0..size).map(|i| request(c * size + i)).collect())
        .collect()
}

#[tokio::test]
async fn test_parallel_profile_matches_direct_accumulators() {
    let config = ProfilerConfig::builder()
        .pair("latency", "bytes")
        .random_seed(11)
        .build();
    let profile = ParallelProfiler::new(config)
        .with_max_concurrency(3)
        .profile_chunks(schema(), chunks(5, 1_000))
        .await
        .unwrap();

    let mut moments = MomentAccumulator::new();
    let mut covariance = CovarianceAccumulator::new();
    let mut statuses = FrequencyCounter::new(1_000);
    for i in 0..5_000 {
        let latency = ((i * 7_919) % 1_000) as f64 / 10.0;
        moments.update(latency);
        covariance.update(latency, latency * 12.5 + (i % 3) as f64);
        statuses.update(["200", "200", "200", "404", "500"][i % 5]);
    }

    let latency = profile.column("latency").unwrap();
    assert_eq!(latency.count, moments.count());
    assert!((latency.mean.unwrap() - moments.mean().unwrap()).abs() < 1e-9);
    assert!((latency.variance.unwrap() - moments.population_variance().unwrap()).abs() < 1e-6);
    assert!((latency.skewness.unwrap() - moments.skewness().unwrap()).abs() < 1e-6);
    assert_eq!(latency.min, moments.min());
    assert_eq!(latency.max, moments.max());

    let pair = profile.pair("latency", "bytes").unwrap();
    assert!((pair.correlation.unwrap() - covariance.correlation().unwrap()).abs() < 1e-9);

    let status = profile.column("status").unwrap();
    assert_eq!(
        status.top_frequencies.as_ref().unwrap()[0].count,
        statuses.count_of("200").unwrap()
    );
    let cached = profile.column("cached").unwrap();
    assert!((cached.true_ratio.unwrap() - 0.25).abs() < 1e-9);

    let median = latency.quantile(0.5).unwrap();
    assert!((median - 50.0).abs() < 5.0, "combined median {median}");
    assert!(profile.warnings.iter().any(|w| w.contains("approximate")));
    assert_eq!(profile.reservoir_sample.len(), 1_000);
    assert_eq!(profile.working_subset.len(), 5_000);
}

#[tokio::test]
async fn test_parallel_progress_phases() {
    let phases = Arc::new(Mutex::new(Vec::new()));
    let sink = phases.clone();
    let config = ProfilerConfig::builder()
        .progress_callback(move |event: &ProgressEvent| sink.lock().unwrap().push(event.phase))
        .build();
    ParallelProfiler::new(config)
        .profile_chunks(schema(), chunks(3, 100))
        .await
        .unwrap();

    assert_eq!(
        *phases.lock().unwrap(),
        vec![
            ProfilerPhase::Scanning,
            ProfilerPhase::Merging,
            ProfilerPhase::Finalized
        ]
    );
}

#[tokio::test]
async fn test_sampled_strategy_is_scaled_per_chunk() {
    let config = ProfilerConfig::builder()
        .task(AnalysisTask::Outlier)
        .build();
    let profile = ParallelProfiler::new(config)
        .profile_chunks(schema(), chunks(4, 15_000))
        .await
        .unwrap();

    let strategy = &profile.sample_strategy_used;
    assert_eq!(strategy.method, SamplingMethod::Random);
    assert_eq!(strategy.sample_size, 12_000);
    assert_eq!(profile.working_subset.len(), 12_000);
    assert_eq!(profile.rows_scanned, 60_000);
}

#[tokio::test]
async fn test_uneven_chunks_with_empty_parts() {
    let mut parts = chunks(3, 400);
    parts.insert(1, Vec::new());
    parts[2].truncate(17);
    let total: usize = parts.iter().map(Vec::len).sum();

    let profile = ParallelProfiler::new(ProfilerConfig::default())
        .profile_chunks(schema(), parts)
        .await
        .unwrap();
    assert_eq!(profile.rows_scanned as usize, total);
    assert_eq!(profile.column("bytes").unwrap().count as usize, total);
    assert!(!profile.partial);
}
