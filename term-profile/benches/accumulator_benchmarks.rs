//! Benchmarks for the online accumulators.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use term_profile::accumulators::{
    AccumulatorState, CovarianceAccumulator, FrequencyCounter, MomentAccumulator, P2Quantile,
    ReservoirSampler,
};

fn values(n: usize) -> Vec<f64> {
    // Cheap deterministic spread without pulling in a generator.
    (0..n).map(|i| ((i * 2_654_435_761) % 1_000_003) as f64 / 1_000.0).collect()
}

fn bench_moments(c: &mut Criterion) {
    let mut group = c.benchmark_group("moments");
    group.measurement_time(Duration::from_secs(5));

    for size in [10_000, 100_000, 1_000_000] {
        let data = values(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("update", size), &data, |b, data| {
            b.iter(|| {
                let mut acc = MomentAccumulator::new();
                for &v in data {
                    acc.update(black_box(v));
                }
                acc
            });
        });
    }

    let data = values(100_000);
    let parts: Vec<MomentAccumulator> = data
        .chunks(1_000)
        .map(|chunk| {
            let mut acc = MomentAccumulator::new();
            chunk.iter().for_each(|&v| acc.update(v));
            acc
        })
        .collect();
    group.bench_function("merge_100_parts", |b| {
        b.iter(|| MomentAccumulator::merge(black_box(parts.clone())))
    });

    group.finish();
}

fn bench_quantiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("p2_quantile");
    let data = values(100_000);
    group.throughput(Throughput::Elements(data.len() as u64));

    for p in [0.5, 0.99] {
        group.bench_with_input(BenchmarkId::new("update", p), &p, |b, &p| {
            b.iter(|| {
                let mut estimator = P2Quantile::new(p).unwrap();
                for &v in &data {
                    estimator.update(black_box(v));
                }
                estimator.quantile()
            });
        });
    }

    group.finish();
}

fn bench_reservoir(c: &mut Criterion) {
    let mut group = c.benchmark_group("reservoir");
    group.throughput(Throughput::Elements(100_000));

    for capacity in [100, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("update", capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let mut sampler = ReservoirSampler::new(capacity, 42).unwrap();
                    for i in 0..100_000u64 {
                        sampler.update(black_box(i));
                    }
                    sampler.count()
                });
            },
        );
    }

    group.finish();
}

fn bench_covariance(c: &mut Criterion) {
    let data = values(100_000);
    c.bench_function("covariance_update_100k", |b| {
        b.iter(|| {
            let mut acc = CovarianceAccumulator::new();
            for (i, &x) in data.iter().enumerate() {
                acc.update(black_box(x), black_box(x * 0.5 + (i % 13) as f64));
            }
            acc.correlation()
        });
    });
}

fn bench_frequency(c: &mut Criterion) {
    let mut group = c.benchmark_group("frequency_counter");
    group.measurement_time(Duration::from_secs(8));

    // Low cardinality never evicts; high cardinality evicts repeatedly.
    let test_cases = [("low_cardinality", 50usize), ("high_cardinality", 50_000usize)];
    for (name, cardinality) in test_cases {
        let keys: Vec<String> = (0..100_000)
            .map(|i| format!("key-{}", (i * 7_919) % cardinality))
            .collect();
        group.throughput(Throughput::Elements(keys.len() as u64));
        group.bench_with_input(BenchmarkId::new("update", name), &keys, |b, keys| {
            b.iter(|| {
                let mut counter = FrequencyCounter::new(1_000);
                for key in keys {
                    counter.update(black_box(key));
                }
                counter.top_k(10)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_moments,
    bench_quantiles,
    bench_reservoir,
    bench_covariance,
    bench_frequency
);
criterion_main!(benches);
