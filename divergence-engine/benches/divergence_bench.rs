//! Benchmarks for the divergence engine.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use divergence_engine::{
    divergence::{jensen_shannon_distance, relative_entropy, LogBase},
    ks::{ks_2samp, KsMethod},
    AggregateProcessor, CountPair, RowProcessor,
};
use std::hint::black_box;

fn generate_counts(n: usize, seed: u64) -> Vec<CountPair> {
    // Simple deterministic pseudo-random for reproducibility
    let mut counts = Vec::with_capacity(n);
    let mut x = seed;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        let methylated = (x >> 33) % 40;
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        let unmethylated = (x >> 33) % 40;
        counts.push(CountPair::new(methylated, unmethylated));
    }
    counts
}

fn columns(counts: &[CountPair]) -> (Vec<f64>, Vec<f64>) {
    counts
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| {
            let total = (c.methylated + c.unmethylated) as f64;
            (c.methylated as f64 / total, c.unmethylated as f64 / total)
        })
        .unzip()
}

fn bench_row_divergence(c: &mut Criterion) {
    let processor = RowProcessor::default();
    let counts = generate_counts(1000, 42);

    let mut group = c.benchmark_group("row_divergence");
    group.throughput(Throughput::Elements(counts.len() as u64));
    group.bench_function("1000_loci", |b| {
        b.iter(|| {
            for pair in &counts {
                black_box(processor.divergence(black_box(*pair)).unwrap());
            }
        })
    });
    group.finish();
}

fn bench_column_measures(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_measures");

    for size in [100, 1_000, 10_000, 100_000].iter() {
        let (p, q) = columns(&generate_counts(*size, 7));

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("relative_entropy", size), size, |b, _| {
            b.iter(|| relative_entropy(black_box(&p), black_box(&q), LogBase::Two))
        });
        group.bench_with_input(BenchmarkId::new("js_distance", size), size, |b, _| {
            b.iter(|| jensen_shannon_distance(black_box(&p), black_box(&q), LogBase::Two))
        });
    }

    group.finish();
}

fn bench_ks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ks_2samp");

    for size in [100, 1_000, 10_000].iter() {
        let (p, q) = columns(&generate_counts(*size, 123));

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("auto", size), size, |b, _| {
            b.iter(|| ks_2samp(black_box(&p), black_box(&q), KsMethod::Auto))
        });
    }

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let processor = AggregateProcessor::default();
    let mut group = c.benchmark_group("aggregate");
    group.sample_size(20);

    for size in [1_000, 50_000].iter() {
        let counts = generate_counts(*size, 99);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| processor.summarize(black_box(counts.iter().copied())))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_row_divergence,
    bench_column_measures,
    bench_ks,
    bench_aggregate
);
criterion_main!(benches);
