//! Performance suite for periodic Delaunay triangulations.
//!
//! Measures the operations whose cost dominates typical use:
//!
//! 1. Bulk construction, with and without Hilbert sorting
//! 2. Incremental insertion into a one-sheet triangulation
//! 3. Vertex removal, including the covering expansion it may trigger
//! 4. Nearest-vertex queries and the Voronoi dump
//!
//! All point sets come from fixed seeds so runs are comparable.

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use periodic_delaunay::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

/// Point counts for construction benchmarks
const COUNTS: &[usize] = &[100, 500, 2_000];

fn random_points(count: usize, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Point::new([rng.random(), rng.random(), rng.random()]))
        .collect()
}

fn build(points: &[Point], sorted: bool) -> PeriodicDelaunayTriangulation {
    let mut dt = PeriodicDelaunayTriangulation::new();
    dt.insert_range(points.iter().copied(), sorted)
        .expect("benchmark points are finite");
    dt
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(20);

    for &count in COUNTS {
        let points = random_points(count, 0x5eed ^ count as u64);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("hilbert_sorted", count), &points, |b, points| {
            b.iter(|| black_box(build(black_box(points), true)));
        });
        group.bench_with_input(BenchmarkId::new("input_order", count), &points, |b, points| {
            b.iter(|| black_box(build(black_box(points), false)));
        });
    }
    group.finish();
}

fn bench_incremental_insertion(c: &mut Criterion) {
    let base = build(&random_points(1_000, 11), true);
    let extra = random_points(100, 12);

    c.bench_function("insert/100_into_1000", |b| {
        b.iter_batched(
            || base.clone(),
            |mut dt| {
                for point in &extra {
                    black_box(dt.insert(*point).expect("finite point"));
                }
                dt
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

// =============================================================================
// REMOVAL
// =============================================================================

fn bench_removal(c: &mut Criterion) {
    let base = build(&random_points(1_000, 21), true);
    let victims: Vec<VertexKey> = base.vertices().take(50).map(|(k, _)| k).collect();

    c.bench_function("remove/50_from_1000", |b| {
        b.iter_batched(
            || base.clone(),
            |mut dt| {
                black_box(dt.remove_range(victims.iter().copied()).expect("known vertices"));
                dt
            },
            criterion::BatchSize::LargeInput,
        );
    });

    let sparse = build(&random_points(40, 22), false);
    let sparse_victims: Vec<VertexKey> = sparse.vertices().take(30).map(|(k, _)| k).collect();
    c.bench_function("remove/30_from_40_with_expansion", |b| {
        b.iter_batched(
            || sparse.clone(),
            |mut dt| {
                black_box(dt.remove_range(sparse_victims.iter().copied()).expect("known vertices"));
                dt
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

// =============================================================================
// QUERIES
// =============================================================================

fn bench_queries(c: &mut Criterion) {
    let dt = build(&random_points(2_000, 31), true);
    let queries = random_points(1_000, 32);

    c.bench_function("nearest_vertex/1000_queries", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(dt.nearest_vertex(black_box(*query)).expect("finite query"));
            }
        });
    });

    c.bench_function("locate/1000_queries", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(dt.locate(black_box(*query)).expect("finite query"));
            }
        });
    });

    c.bench_function("draw_dual/2000_points", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(1 << 20);
            dt.draw_dual(&mut out).expect("writing to memory");
            black_box(out)
        });
    });
}

criterion_group!(
    benches,
    bench_construction,
    bench_incremental_insertion,
    bench_removal,
    bench_queries
);
criterion_main!(benches);
