//! Criterion benchmarks for the flight planner.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion};
use flight_planner::obstacles::ObstacleSet;
use flight_planner::planner::plan;
use flight_planner::types::PlanRequest;
use flight_planner::visibility::VisibilityGraph;

// -- JSON fixtures --

/// Twelve sensors around four campus buildings at the default scale.
const CAMPUS_12_JSON: &str = r#"{
  "start": { "lng": -3.1878, "lat": 55.9444 },
  "targets": [
    { "label": "a", "location": { "lng": -3.1912, "lat": 55.9455 } },
    { "label": "b", "location": { "lng": -3.1905, "lat": 55.9440 } },
    { "label": "c", "location": { "lng": -3.1892, "lat": 55.9436 } },
    { "label": "d", "location": { "lng": -3.1880, "lat": 55.9430 } },
    { "label": "e", "location": { "lng": -3.1866, "lat": 55.9432 } },
    { "label": "f", "location": { "lng": -3.1855, "lat": 55.9447 } },
    { "label": "g", "location": { "lng": -3.1860, "lat": 55.9455 } },
    { "label": "h", "location": { "lng": -3.1872, "lat": 55.9458 } },
    { "label": "i", "location": { "lng": -3.1885, "lat": 55.9452 } },
    { "label": "j", "location": { "lng": -3.1898, "lat": 55.9460 } },
    { "label": "k", "location": { "lng": -3.1915, "lat": 55.9432 } },
    { "label": "l", "location": { "lng": -3.1848, "lat": 55.9430 } }
  ],
  "no_fly_zones": [
    [
      { "lng": -3.1869, "lat": 55.9445 },
      { "lng": -3.1864, "lat": 55.9445 },
      { "lng": -3.1864, "lat": 55.9440 },
      { "lng": -3.1869, "lat": 55.9440 }
    ],
    [
      { "lng": -3.1875, "lat": 55.9451 },
      { "lng": -3.1868, "lat": 55.9451 },
      { "lng": -3.1868, "lat": 55.9448 },
      { "lng": -3.1875, "lat": 55.9448 }
    ],
    [
      { "lng": -3.1900, "lat": 55.9430 },
      { "lng": -3.1890, "lat": 55.9430 },
      { "lng": -3.1890, "lat": 55.9425 },
      { "lng": -3.1900, "lat": 55.9425 }
    ],
    [
      { "lng": -3.1859, "lat": 55.9440 },
      { "lng": -3.1852, "lat": 55.9440 },
      { "lng": -3.1852, "lat": 55.9435 },
      { "lng": -3.1859, "lat": 55.9435 }
    ]
  ],
  "params": {
    "seed": 42,
    "iterations": 4,
    "threads": 1
  }
}"#;

fn bench_visibility_graph(c: &mut Criterion) {
    let request: PlanRequest = serde_json::from_str(CAMPUS_12_JSON).unwrap();
    let obstacles =
        ObstacleSet::from_rings(request.params.confinement, &request.no_fly_zones).unwrap();
    c.bench_function("visibility_graph_campus", |b| {
        b.iter(|| VisibilityGraph::new(&obstacles));
    });
}

fn bench_plan_serial(c: &mut Criterion) {
    let request: PlanRequest = serde_json::from_str(CAMPUS_12_JSON).unwrap();
    c.bench_function("plan_campus_12_serial", |b| {
        b.iter(|| plan(&request).unwrap());
    });
}

fn bench_plan_parallel(c: &mut Criterion) {
    // Same fixture with 16 seeds spread over the default thread count.
    let json = CAMPUS_12_JSON
        .replace("\"iterations\": 4", "\"iterations\": 16")
        .replace("\"threads\": 1", "\"threads\": 0");
    let request: PlanRequest = serde_json::from_str(&json).unwrap();
    c.bench_function("plan_campus_12_parallel_16", |b| {
        b.iter(|| plan(&request).unwrap());
    });
}

criterion_group!(
    benches,
    bench_visibility_graph,
    bench_plan_serial,
    bench_plan_parallel
);
criterion_main!(benches);
