//! Benchmarks for RSketch.
//!
//! Measures performance of:
//! - Insert operations across mapping variants
//! - Quantile queries at different sketch sizes
//! - Merge operations
//! - Collapse under a size cap

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relerr_quantiles::{CollapseStrategy, MappingKind, QuantileSketch, RSketch, StorageKind};

fn new_sketch(mapping: MappingKind, storage: StorageKind, cap: Option<usize>) -> RSketch {
    RSketch::new(0.01, mapping, storage, cap, CollapseStrategy::Low).unwrap()
}

/// Benchmark insert with each mapping variant.
fn bench_rsketch_insert_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsketch_insert_mapping");

    for mapping in [
        MappingKind::Logarithmic,
        MappingKind::LinearInterpolation,
        MappingKind::CubicInterpolation,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{mapping:?}")),
            &mapping,
            |b, &mapping| {
                let mut s = new_sketch(mapping, StorageKind::Contiguous, None);
                let mut counter = 1.0;
                b.iter(|| {
                    s.insert(black_box(counter)).unwrap();
                    counter += 1.0;
                });
            },
        );
    }
    group.finish();
}

/// Benchmark insert with each storage variant.
fn bench_rsketch_insert_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsketch_insert_storage");

    for storage in [StorageKind::Contiguous, StorageKind::Sparse] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{storage:?}")),
            &storage,
            |b, &storage| {
                let mut s = new_sketch(MappingKind::Logarithmic, storage, None);
                let mut counter = 1.0;
                b.iter(|| {
                    s.insert(black_box(counter)).unwrap();
                    counter += 1.0;
                });
            },
        );
    }
    group.finish();
}

/// Benchmark quantile queries on sketches of different sizes.
fn bench_rsketch_quantile(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsketch_quantile");

    for size in [100, 1000, 10000, 100000] {
        let mut s = new_sketch(MappingKind::Logarithmic, StorageKind::Contiguous, None);
        for i in 1..=size {
            s.insert(i as f64).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(s.quantile(black_box(0.99)));
            });
        });
    }
    group.finish();
}

/// Benchmark merge operations at different sketch sizes.
fn bench_rsketch_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsketch_merge");

    for size in [100, 1000, 10000] {
        let mut a = new_sketch(MappingKind::Logarithmic, StorageKind::Contiguous, None);
        let mut b = new_sketch(MappingKind::Logarithmic, StorageKind::Contiguous, None);
        for i in 1..=size {
            a.insert(i as f64).unwrap();
            b.insert((i + size) as f64).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| {
                let mut copy = a.clone();
                copy.merge(black_box(&b)).unwrap();
                black_box(copy);
            });
        });
    }
    group.finish();
}

/// Benchmark sustained insert under a size cap, where every insert may
/// trigger a collapse.
fn bench_rsketch_capped_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("rsketch_capped_insert");

    group.bench_function("cap_128", |b| {
        let mut s = new_sketch(MappingKind::CubicInterpolation, StorageKind::Sparse, Some(128));
        let mut counter = 1.0;
        b.iter(|| {
            s.insert(black_box(counter)).unwrap();
            counter += 1.0;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_rsketch_insert_mapping,
    bench_rsketch_insert_storage,
    bench_rsketch_quantile,
    bench_rsketch_merge,
    bench_rsketch_capped_insert
);
criterion_main!(benches);
