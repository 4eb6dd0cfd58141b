use std::collections::BTreeSet;
use std::path::Path;

use paramgraph::aggregate::{self, Activation, ViewState, initial_view};
use paramgraph::ir::{LinkRecord, VariableRecord};
use paramgraph::layout::{Positions, compute_force_layout, compute_neighbor_layout, compute_path_layout};
use paramgraph::query::{nearest_neighbors, shortest_path};
use paramgraph::{
    Config, Dataset, EngineError, EngineState, GraphStore, LayoutConfig, LinkDirection,
    PathResult, StartDepth, VisibleLink,
};
use proptest::prelude::*;

fn fixture(name: &str) -> Dataset {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    Dataset::from_json(&input).expect("fixture parse failed")
}

/// 3 submodules x 2 segments x 4 variables, ids `m{sub}.s{seg}.v{var}`.
fn grid_variables() -> Vec<VariableRecord> {
    let mut variables = Vec::new();
    for sub in 0..3 {
        for seg in 0..2 {
            for var in 0..4 {
                let id = format!("m{sub}.s{seg}.v{var}");
                variables.push(VariableRecord::new(
                    &id,
                    &id,
                    &format!("m{sub}"),
                    &format!("s{seg}"),
                ));
            }
        }
    }
    variables
}

fn grid_store(links: &[(&str, &str)]) -> GraphStore {
    let links = links
        .iter()
        .map(|(source, target)| LinkRecord::new(source, target))
        .collect();
    GraphStore::new(grid_variables(), links).expect("grid store")
}

fn assert_link_invariants(view: &ViewState, store: &GraphStore) {
    let mut pairs = BTreeSet::new();
    for link in view.visible.links() {
        assert_ne!(link.source, link.target, "self link survived");
        assert!(
            pairs.insert(VisibleLink::pair_key(&link.source, &link.target)),
            "duplicate link {}-{}",
            link.source,
            link.target
        );
    }
    if let Err(errors) = view.visible.validate(store) {
        panic!("invalid visible set: {errors:?}");
    }
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn collapsing_everything_leaves_submodule_pairs() {
    let store = grid_store(&[
        ("m0.s0.v0", "m1.s0.v0"),
        ("m1.s1.v2", "m0.s1.v1"),
        ("m1.s0.v3", "m1.s1.v0"),
        ("m0.s0.v1", "m0.s0.v2"),
        ("m2.s0.v0", "m2.s1.v0"),
        ("m2.s1.v3", "m0.s0.v3"),
    ]);
    let mut view = initial_view(&store, StartDepth::Variables);
    assert_eq!(view.visible.len(), 24);

    let segments: Vec<_> = store.segment_keys().cloned().collect();
    for segment in &segments {
        let first = store.children(segment)[0].clone();
        view = aggregate::collapse(&store, &view, &first).unwrap();
        assert_link_invariants(&view, &store);
    }
    assert_eq!(view.visible.len(), 6);

    let submodules: Vec<_> = store.submodule_keys().cloned().collect();
    for submodule in &submodules {
        let first = store.children(submodule)[0].clone();
        view = aggregate::collapse(&store, &view, &first).unwrap();
        assert_link_invariants(&view, &store);
    }

    assert_eq!(
        view.visible.node_ids(),
        ids(&["submodule:m0", "submodule:m1", "submodule:m2"])
    );
    let pairs: BTreeSet<(String, String)> = view.visible.links().map(VisibleLink::key).collect();
    let expected: BTreeSet<(String, String)> = [
        ("submodule:m0", "submodule:m1"),
        ("submodule:m0", "submodule:m2"),
    ]
    .iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect();
    assert_eq!(pairs, expected);
    let m0_m1 = view
        .visible
        .link_between("submodule:m1", "submodule:m0")
        .unwrap();
    assert_eq!(m0_m1.direction, LinkDirection::Both);
    let m0_m2 = view
        .visible
        .link_between("submodule:m0", "submodule:m2")
        .unwrap();
    assert!(m0_m2.runs("submodule:m2", "submodule:m0"));
    assert!(!m0_m2.runs("submodule:m0", "submodule:m2"));

    // Same result as starting collapsed.
    assert_eq!(view, initial_view(&store, StartDepth::Submodules));
}

#[test]
fn expand_then_collapse_restores_view() {
    let store = grid_store(&[
        ("m0.s0.v0", "m1.s0.v0"),
        ("m0.s1.v0", "m1.s1.v1"),
        ("m2.s0.v0", "m0.s0.v1"),
    ]);
    let start = initial_view(&store, StartDepth::Submodules);
    for submodule in ["submodule:m0", "submodule:m1", "submodule:m2"] {
        let expanded = aggregate::expand(&store, &start, submodule).unwrap();
        assert_link_invariants(&expanded, &store);
        let child = expanded
            .visible
            .nodes()
            .find(|id| id.starts_with(&format!("segment:{}/", &submodule[10..])))
            .unwrap()
            .to_string();
        let restored = aggregate::collapse(&store, &expanded, &child).unwrap();
        assert_eq!(restored.visible, start.visible);
        assert_eq!(restored.visible.node_ids(), start.visible.node_ids());
        assert_eq!(restored.states, start.states);
    }
}

#[test]
fn tier_consistency_rejects_mixed_sets() {
    let store = grid_store(&[]);
    let err = aggregate::reconstruct_visible_set(&store, &ids(&["ghost"])).unwrap_err();
    assert_eq!(err, EngineError::UnknownNode("ghost".into()));

    // A submodule listed with one of its own segments: the submodule wins.
    let view =
        aggregate::reconstruct_visible_set(&store, &ids(&["submodule:m0", "segment:m0/s1"]))
            .unwrap();
    assert!(view.visible.contains("submodule:m0"));
    assert!(!view.visible.contains("segment:m0/s1"));
    assert_link_invariants(&view, &store);
}

#[test]
fn neighbors_of_five_variables() {
    let variables = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|id| VariableRecord::new(id, id, "m", "s"))
        .collect();
    let links = vec![
        LinkRecord::new("a", "b"),
        LinkRecord::new("a", "c"),
        LinkRecord::new("c", "d"),
        LinkRecord::new("e", "a"),
        LinkRecord::new("d", "e"),
    ];
    let store = GraphStore::new(variables, links).unwrap();
    let view = initial_view(&store, StartDepth::Variables);

    let result = nearest_neighbors(&view.visible, "a", 2, LinkDirection::Both).unwrap();
    let hits: Vec<(&str, &str, LinkDirection, usize, &str)> = result
        .hits
        .iter()
        .map(|hit| {
            (
                hit.source.as_str(),
                hit.target.as_str(),
                hit.direction,
                hit.depth,
                hit.node.as_str(),
            )
        })
        .collect();
    assert_eq!(
        hits,
        vec![
            ("a", "b", LinkDirection::Outbound, 1, "b"),
            ("a", "c", LinkDirection::Outbound, 1, "c"),
            ("e", "a", LinkDirection::Inbound, 1, "e"),
            ("c", "d", LinkDirection::Outbound, 2, "d"),
            ("d", "e", LinkDirection::Inbound, 2, "d"),
        ]
    );
    assert_eq!(result.node_ids(), ids(&["a", "b", "c", "e", "d"]));

    let mut previous: BTreeSet<String> = BTreeSet::new();
    for depth in 1..=3 {
        let found: BTreeSet<String> = nearest_neighbors(&view.visible, "a", depth, LinkDirection::Both)
            .unwrap()
            .node_ids()
            .into_iter()
            .collect();
        assert!(previous.is_subset(&found), "depth {depth} lost nodes");
        previous = found;
    }

    let outbound = nearest_neighbors(&view.visible, "a", 1, LinkDirection::Outbound).unwrap();
    assert!(outbound.hits.iter().all(|hit| hit.direction == LinkDirection::Outbound));
    assert_eq!(outbound.hits.len(), 2);

    // d is reached both ways at depth 2 and is drawn on the outbound side
    let config = LayoutConfig::default();
    let layout = compute_neighbor_layout(&store, &result, &config);
    let x = |id: &str| layout.position(id).map(|point| point.x).unwrap();
    let y = |id: &str| layout.position(id).map(|point| point.y).unwrap();
    let quarter = config.width / 4.0;
    assert_eq!(layout.positions.len(), 5);
    assert_eq!(x("a"), 0.0);
    assert!((x("b") - quarter).abs() < 1e-3);
    assert!((x("c") - quarter).abs() < 1e-3);
    assert!((x("d") - 2.0 * quarter).abs() < 1e-3);
    assert!((x("e") + quarter).abs() < 1e-3);
    assert!(y("b") < y("c"));
    let (rb, rc) = (layout.radius("b").unwrap(), layout.radius("c").unwrap());
    assert!((y("c") - y("b") - (rb + rc)).abs() < 1e-3);
    assert!(((y("b") - rb) + (y("c") + rc)).abs() < 1e-3);
    assert!(y("d").abs() < 1e-3 && y("e").abs() < 1e-3);
}

#[test]
fn shortest_path_on_a_chain() {
    let variables = ["A", "B", "C", "D"]
        .iter()
        .map(|id| VariableRecord::new(id, id, "m", "s"))
        .collect();
    let links = vec![
        LinkRecord::new("A", "B"),
        LinkRecord::new("B", "C"),
        LinkRecord::new("C", "D"),
    ];
    let store = GraphStore::new(variables, links).unwrap();
    let view = initial_view(&store, StartDepth::Variables);
    assert_eq!(
        shortest_path(&view.visible, "A", "D"),
        PathResult::Found(ids(&["A", "B", "C", "D"]))
    );
    assert_eq!(shortest_path(&view.visible, "D", "A"), PathResult::NoPathFound);

    let path = shortest_path(&view.visible, "A", "D");
    let layout = compute_path_layout(&store, path.nodes(), &LayoutConfig::default());
    assert_eq!(layout, compute_path_layout(&store, path.nodes(), &LayoutConfig::default()));
    assert!(layout.positions.values().all(|point| point.y == 0.0));
}

#[test]
fn layouts_are_idempotent() {
    let store = GraphStore::from_dataset(fixture("plant.json")).unwrap();
    let config = LayoutConfig::default();
    for depth in [StartDepth::Variables, StartDepth::Segments, StartDepth::Submodules] {
        let view = initial_view(&store, depth);
        let first = compute_force_layout(&store, &view.visible, &config, None, &Positions::new());
        let second = compute_force_layout(&store, &view.visible, &config, None, &Positions::new());
        assert_eq!(first, second);
        assert_eq!(first.positions.len(), view.visible.len());
    }

    let view = initial_view(&store, StartDepth::Variables);
    let neighbors = nearest_neighbors(&view.visible, "torque", 3, LinkDirection::Both).unwrap();
    let first = compute_neighbor_layout(&store, &neighbors, &config);
    let second = compute_neighbor_layout(&store, &neighbors, &config);
    assert_eq!(first, second);
    assert_eq!(first.positions.len(), neighbors.node_ids().len());
}

#[test]
fn fixture_drives_the_engine() {
    let dataset = fixture("plant.json");
    assert_eq!(
        dataset.variables[0].attributes.get("unit"),
        Some(&serde_json::json!("1/min"))
    );
    let config = Config {
        start_depth: StartDepth::Submodules,
        ..Config::default()
    };
    let mut engine = EngineState::from_dataset(dataset, config).unwrap();
    assert_eq!(engine.visible().len(), 3);

    assert_eq!(engine.activate("submodule:engine").unwrap(), Activation::Expand);
    assert!(engine.visible().contains("segment:engine/core"));
    assert_eq!(engine.activate("segment:engine/core").unwrap(), Activation::Expand);
    assert!(engine.visible().contains("torque"));
    assert_eq!(engine.activate("torque").unwrap(), Activation::Collapse);
    assert!(engine.visible().contains("segment:engine/core"));
    assert_link_invariants(engine.view(), engine.store());

    let snapshot = engine.snapshot();
    let before = engine.visible().clone();
    engine.collapse_all(StartDepth::Submodules);
    engine.restore(&snapshot).unwrap();
    assert_eq!(engine.visible(), &before);

    match engine.shortest_path("submodule:driver", "segment:engine/core").unwrap() {
        PathResult::Found(path) => {
            assert_eq!(path.first().map(String::as_str), Some("submodule:driver"));
            assert_eq!(path.last().map(String::as_str), Some("segment:engine/core"));
        }
        PathResult::NoPathFound => panic!("driver reaches the engine core"),
    }
}

fn arb_links() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..24, 0usize..24), 0..40)
}

proptest! {
    #[test]
    fn reachable_states_keep_invariants(
        links in arb_links(),
        picks in prop::collection::vec(any::<usize>(), 0..30),
    ) {
        let variables = grid_variables();
        let records = links
            .iter()
            .map(|(s, t)| LinkRecord::new(&variables[*s].id, &variables[*t].id))
            .collect();
        let store = GraphStore::new(variables.clone(), records).unwrap();
        let mut view = initial_view(&store, StartDepth::Variables);
        for pick in picks {
            let ids = view.visible.node_ids();
            let id = &ids[pick % ids.len()];
            let (_, next) = aggregate::activate(&store, &view, id).unwrap();
            view = next;

            let mut pairs = BTreeSet::new();
            for link in view.visible.links() {
                prop_assert_ne!(&link.source, &link.target);
                prop_assert!(pairs.insert(VisibleLink::pair_key(&link.source, &link.target)));
            }
            prop_assert!(view.visible.validate(&store).is_ok());

            let rebuilt = aggregate::reconstruct_visible_set(&store, &view.visible.node_ids()).unwrap();
            prop_assert_eq!(&rebuilt.visible, &view.visible);
        }

        for id in view.visible.node_ids() {
            if !id.starts_with("submodule:") {
                continue;
            }
            let expanded = aggregate::expand(&store, &view, &id).unwrap();
            let child = store.children(&store.node(&id).unwrap().aggregate_key().unwrap())[0].clone();
            let restored = aggregate::collapse(&store, &expanded, &child).unwrap();
            prop_assert_eq!(&restored.visible, &view.visible);
            prop_assert_eq!(restored.visible.node_ids(), view.visible.node_ids());
        }
    }
}
