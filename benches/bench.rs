//! Criterion benchmarks for the compaction simulator.
//!
//! Covers the hot paths of a run:
//! - whole simulations per merge policy
//! - the merge decisions taken on every eviction
//! - a small parallel sweep

use compaction_sim::cost::DiskModel;
use compaction_sim::engine::run_simulation;
use compaction_sim::merge_policy::ski_rental::price_vector;
use compaction_sim::merge_policy::{MergePolicy, TelescopingConfig};
use compaction_sim::settings::Settings;
use compaction_sim::sweep::{SweepConfig, run_sweep};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_settings(total: u64) -> Settings {
    Settings::default()
        .with_buffer(2_000_000)
        .with_total_postings(total)
        .with_updates_quantum(100_000)
        .with_queries_per_quantum(16)
}

/// Benchmark complete runs of every available policy.
fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    let total = 200_000_000;
    group.throughput(Throughput::Elements(total));

    let settings = bench_settings(total);
    for policy in MergePolicy::standard_set() {
        group.bench_with_input(
            BenchmarkId::from_parameter(policy.name()),
            &policy,
            |b, &policy| b.iter(|| run_simulation(black_box(&settings), policy).unwrap()),
        );
    }

    group.finish();
}

/// Benchmark single merge decisions over long segment histories.
fn bench_decisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("decisions");
    let disk = DiskModel::new(150.0, 7.0, 4);

    for len in [16usize, 256, 4096] {
        let segments: Vec<u64> = (0..len as u64).rev().map(|i| 1_000 + i * 1_000).collect();

        group.bench_with_input(BenchmarkId::new("price_vector", len), &segments, |b, s| {
            b.iter(|| black_box(price_vector(black_box(s), 500, &disk)))
        });

        let config = TelescopingConfig::new(0.5);
        group.bench_with_input(BenchmarkId::new("carry_depth", len), &segments, |b, s| {
            b.iter(|| black_box(config.carry_depth(black_box(s), 1_000_000)))
        });
    }

    group.finish();
}

/// Benchmark a small sweep on the rayon pool.
fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    group.sample_size(10);

    let settings = bench_settings(50_000_000);
    let config = SweepConfig::default().with_buffer_base(4_000_000);
    group.bench_function("standard_set", |b| {
        b.iter(|| run_sweep(black_box(&settings), &config).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_simulation, bench_decisions);

// Separate group for slower benchmarks
criterion_group!(slow_benches, bench_sweep);

criterion_main!(benches, slow_benches);
