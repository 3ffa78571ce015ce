//! Criterion benchmarks for the Forgeline simulation world.
//!
//! Three benchmark groups:
//! - `small_factory`: 20 smelting lines with 8-segment belts -- baseline tick cost
//! - `large_factory`: 100 lines with 20-segment belts (2000 segments) -- scaling
//! - `snapshots`: full snapshot pass over the large factory -- read-path cost

use criterion::{Criterion, criterion_group, criterion_main};
use forgeline_core::test_utils::*;
use forgeline_core::world::World;

/// Warmed-up factory: enough ticks for belts to be mid-flight and smelters
/// mid-cycle, so the bench measures steady-state work.
fn warmed_factory(rows: usize, belt_length: usize) -> World {
    let mut world = build_factory_rows(rows, belt_length);
    run_ticks(&mut world, 200);
    world
}

fn bench_small_factory(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_factory");
    group.sample_size(50);

    let mut world = warmed_factory(20, 8);

    group.bench_function("20_lines_160_segments", |b| {
        b.iter(|| {
            world.step();
        });
    });

    group.finish();
}

fn bench_large_factory(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_factory");
    group.sample_size(20);

    let mut world = warmed_factory(100, 20);

    group.bench_function("100_lines_2000_segments", |b| {
        b.iter(|| {
            world.step();
        });
    });

    group.finish();
}

fn bench_snapshots(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshots");
    group.sample_size(30);

    let world = warmed_factory(100, 20);

    group.bench_function("snapshot_all_2000_segments", |b| {
        b.iter(|| {
            let segments = world.snapshot_all_segments();
            let buildings = world.snapshot_all_buildings();
            (segments.len(), buildings.len())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_small_factory,
    bench_large_factory,
    bench_snapshots
);
criterion_main!(benches);
