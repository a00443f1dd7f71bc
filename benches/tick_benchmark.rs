//! Benchmarks for the tick loop at battle scale.

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lockstep_tactics::content::Content;
use lockstep_tactics::core::types::{Side, Vec2};
use lockstep_tactics::core::SimulationConfig;
use lockstep_tactics::orders::Order;
use lockstep_tactics::terrain::TerrainGrid;
use lockstep_tactics::unit::Posture;
use lockstep_tactics::Simulation;

/// Two facing lines of riflemen, every unit ordered to advance
fn battle(units: usize, config: SimulationConfig) -> Simulation {
    let content = Content::standard().expect("bundled content");
    let mut sim = Simulation::new(config, content, TerrainGrid::open(256, 256, 1.0), 7)
        .expect("simulation");
    let per_side = units / 2;
    for i in 0..units {
        let side = if i < per_side { 0 } else { 1 };
        let slot = (i % per_side) as f32;
        let x = 8.5 + (slot % 50.0) * 4.0;
        let y = if side == 0 { 20.5 + (slot / 50.0).floor() * 3.0 } else { 235.5 - (slot / 50.0).floor() * 3.0 };
        let id = sim
            .spawn("rifleman", Side(side), Vec2::new(x, y), Posture::Standing)
            .expect("spawn");
        sim.issue(id, Order::move_to(Vec2::new(x, 128.5), 0)).expect("issue");
    }
    sim.begin_battle().expect("begin battle");
    sim
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for units in [200usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(units), &units, |b, &units| {
            let mut sim = battle(units, SimulationConfig::default());
            b.iter(|| black_box(sim.tick().expect("tick")));
        });
    }
    group.finish();
}

fn bench_sequential_vs_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("decisions_1000");
    for (label, threshold) in [("sequential", usize::MAX), ("parallel", 1)] {
        group.bench_function(label, |b| {
            let config = SimulationConfig { parallel_threshold: threshold, ..SimulationConfig::default() };
            let mut sim = battle(1000, config);
            b.iter(|| black_box(sim.tick().expect("tick")));
        });
    }
    group.finish();
}

fn bench_state_hash(c: &mut Criterion) {
    let sim = battle(1000, SimulationConfig::default());
    c.bench_function("state_hash_1000", |b| b.iter(|| black_box(sim.state_hash())));
}

criterion_group!(benches, bench_tick, bench_sequential_vs_parallel, bench_state_hash);
criterion_main!(benches);
