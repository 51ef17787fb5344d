//! # Tank Benchmarks
//!
//! Performance benchmarks for identity, absorption and closure.
//!
//! Run with: `cargo bench -p invariant-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use invariant_core::{Kernel, Origin, Reactor, Ring, Tank, get_token_hash, tank_to_bytes};
use std::hint::black_box;

/// Chain n0 → n1 → ... → n(size-1).
fn create_chain(size: usize) -> Tank {
    let mut tank = Tank::new();
    for i in 1..size {
        tank.absorb(
            &format!("n{}", i - 1),
            &format!("n{i}"),
            "IMP",
            1.0,
            Ring::Observed,
            Origin::observation("bench"),
        );
    }
    tank
}

/// Hub with `size` spokes.
fn create_star(size: usize) -> Tank {
    let mut tank = Tank::new();
    for i in 0..size {
        tank.absorb(
            "hub",
            &format!("spoke{i}"),
            "IMP",
            1.0,
            Ring::Observed,
            Origin::observation("bench"),
        );
    }
    tank
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_token_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_hash");

    for len in [4usize, 32, 256].iter() {
        let token = "x".repeat(*len);
        group.bench_with_input(BenchmarkId::new("stateless", len), &token, |b, token| {
            b.iter(|| black_box(get_token_hash(token)));
        });
        group.bench_with_input(BenchmarkId::new("kernel_cached", len), &token, |b, token| {
            let mut kernel = Kernel::new();
            b.iter(|| black_box(kernel.token_hash(token)));
        });
    }

    group.finish();
}

fn bench_absorb(c: &mut Criterion) {
    let mut group = c.benchmark_group("absorb");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_star(size)));
        });
    }

    group.finish();
}

fn bench_closure(c: &mut Criterion) {
    let mut group = c.benchmark_group("closure_fixed_point");
    group.sample_size(10);

    for size in [16, 64].iter() {
        let base = create_chain(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut tank = base.clone();
                black_box(Reactor::default().run_to_fixed_point(&mut tank))
            });
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [100, 1000].iter() {
        let tank = create_star(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(tank_to_bytes(&tank)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_token_hash,
    bench_absorb,
    bench_closure,
    bench_snapshot,
);

criterion_main!(benches);
