use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use paramgraph::aggregate::{self, initial_view};
use paramgraph::config::{LayoutConfig, StartDepth};
use paramgraph::ir::{LinkDirection, LinkRecord, VariableRecord};
use paramgraph::layout::{Positions, compute_force_layout};
use paramgraph::query::nearest_neighbors;
use paramgraph::store::GraphStore;
use std::hint::black_box;

/// `subs` submodules x 4 segments x `vars` variables, chained inside each
/// segment plus a stride of cross-submodule links.
fn synthetic_store(subs: usize, vars: usize) -> GraphStore {
    let mut variables = Vec::new();
    let mut links = Vec::new();
    for sub in 0..subs {
        for seg in 0..4 {
            for var in 0..vars {
                let id = format!("m{sub}.s{seg}.v{var}");
                variables.push(VariableRecord::new(
                    &id,
                    &id,
                    &format!("m{sub}"),
                    &format!("s{seg}"),
                ));
                if var > 0 {
                    links.push(LinkRecord::new(&format!("m{sub}.s{seg}.v{}", var - 1), &id));
                }
            }
        }
    }
    let total = variables.len();
    for idx in (0..total).step_by(7) {
        let target = (idx * 31 + 11) % total;
        if target != idx {
            links.push(LinkRecord::new(&variables[idx].id, &variables[target].id));
        }
    }
    GraphStore::new(variables, links).expect("synthetic store")
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    for (subs, vars) in [(4, 8), (8, 16), (16, 24)] {
        let store = synthetic_store(subs, vars);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{subs}x4x{vars}")),
            &store,
            |b, store| {
                b.iter(|| {
                    let mut view = initial_view(store, StartDepth::Submodules);
                    for key in store.submodule_keys() {
                        view = aggregate::expand(store, &view, &key.node_id()).expect("expand");
                    }
                    for key in store.segment_keys() {
                        view = aggregate::expand(store, &view, &key.node_id()).expect("expand");
                    }
                    black_box(view.visible.link_count());
                });
            },
        );
    }
    group.finish();
}

fn bench_force_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_layout");
    group.sample_size(10);
    let config = LayoutConfig::default();
    for (subs, vars) in [(4, 8), (8, 16)] {
        let store = synthetic_store(subs, vars);
        for depth in [StartDepth::Segments, StartDepth::Variables] {
            let view = initial_view(&store, depth);
            group.bench_with_input(
                BenchmarkId::new(format!("{depth:?}"), format!("{subs}x4x{vars}")),
                &view,
                |b, view| {
                    b.iter(|| {
                        black_box(compute_force_layout(
                            &store,
                            &view.visible,
                            &config,
                            None,
                            &Positions::new(),
                        ))
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_neighbors(c: &mut Criterion) {
    let store = synthetic_store(16, 24);
    let view = initial_view(&store, StartDepth::Variables);
    c.bench_function("nearest_neighbors_depth3", |b| {
        b.iter(|| {
            black_box(
                nearest_neighbors(&view.visible, "m0.s0.v0", 3, LinkDirection::Both)
                    .expect("neighbors"),
            )
        });
    });
}

criterion_group!(benches, bench_aggregation, bench_force_layout, bench_neighbors);
criterion_main!(benches);
