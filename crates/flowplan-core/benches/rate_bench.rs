//! Criterion benchmarks for the production graph.
//!
//! Benchmark groups:
//! - `rate_refresh`: re-rate every node of a wide smelting layout
//! - `fuel_change`: swap the shared fuel on every smelter and back
//! - `persistence`: record, snapshot and restore a wide layout

use criterion::{Criterion, criterion_group, criterion_main};
use flowplan_core::graph::ProductionGraph;
use flowplan_core::id::*;
use flowplan_core::settings::GraphSettings;
use flowplan_core::test_utils::*;
use std::sync::Arc;

fn smelters(graph: &ProductionGraph) -> Vec<NodeId> {
    graph
        .nodes()
        .filter(|(_, n)| n.as_recipe().is_some())
        .map(|(id, _)| id)
        .collect()
}

fn bench_rate_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_refresh");
    group.sample_size(30);

    let s = sample_catalog();
    let mut graph = smelting_lines(&s, 500, 1.0);
    let ids: Vec<NodeId> = graph.nodes().map(|(id, _)| id).collect();

    // The shared coal supplier has 500 outgoing links, so every rate change
    // next to it touches the whole fan-out.
    group.bench_function("500_lines_set_every_rate", |b| {
        let mut rate = 1.0;
        b.iter(|| {
            rate += 0.25;
            for &id in &ids {
                graph.set_actual_rate(id, rate).unwrap();
            }
        });
    });

    group.bench_function("500_lines_node_reports", |b| {
        b.iter(|| graph.node_reports());
    });

    group.finish();
}

fn bench_fuel_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuel_change");
    group.sample_size(30);

    let s = sample_catalog();
    let mut graph = smelting_lines(&s, 200, 1.0);
    let targets = smelters(&graph);

    group.bench_function("200_smelters_coal_wood_coal", |b| {
        b.iter(|| {
            for &id in &targets {
                graph.set_fuel(id, Some(s.wood)).unwrap();
            }
            for &id in &targets {
                graph.set_fuel(id, Some(s.coal)).unwrap();
            }
        });
    });

    group.finish();
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    group.sample_size(30);

    let s = sample_catalog();
    let graph = smelting_lines(&s, 500, 1.5);
    let record = graph.to_record();
    let data = graph.snapshot().unwrap();

    group.bench_function("to_record_500_lines", |b| {
        b.iter(|| graph.to_record());
    });

    group.bench_function("from_record_500_lines", |b| {
        b.iter(|| ProductionGraph::from_record(Arc::clone(&s.catalog), GraphSettings::default(), &record));
    });

    group.bench_function("snapshot_round_trip_500_lines", |b| {
        b.iter(|| {
            ProductionGraph::from_snapshot(Arc::clone(&s.catalog), GraphSettings::default(), &data).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rate_refresh, bench_fuel_change, bench_persistence);
criterion_main!(benches);
