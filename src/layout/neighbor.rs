use super::*;

/// Mirrored tidy trees around the query origin: outbound hits to the right,
/// inbound hits to the left.
///
/// A level whose nodes fit the available height is stacked edge to edge in
/// discovery order. Crowded levels get a short collision-only relax seeded at
/// their tree coordinates instead.
pub fn compute_neighbor_layout(
    store: &GraphStore,
    neighbors: &NeighborSet,
    config: &LayoutConfig,
) -> Layout {
    let Some(origin) = store.node(&neighbors.origin) else {
        return Layout::empty(LayoutMode::Neighbor);
    };
    let settings = &config.neighbor;
    let scaled_radius = |id: &str| {
        store
            .node(id)
            .map(|node| config.node_radius(node.tier(), node.degree()))
            .unwrap_or(config.radius.variable)
            * settings.radius_scale
    };

    let mut layout = Layout::empty(LayoutMode::Neighbor);
    layout.positions.insert(origin.id().to_string(), Point::default());
    layout
        .radii
        .insert(origin.id().to_string(), scaled_radius(origin.id()));

    let mut levels: Vec<Vec<String>> = Vec::new();
    for (direction, sign) in [(LinkDirection::Outbound, 1.0f32), (LinkDirection::Inbound, -1.0)] {
        let hits: Vec<_> = neighbors.hits_in(direction).collect();
        if hits.is_empty() {
            continue;
        }
        let mut tree = TidyTree::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        slots.insert(neighbors.origin.as_str(), TidyTree::ROOT);
        let mut placed = Vec::with_capacity(hits.len());
        for hit in &hits {
            let parent = slots.get(hit.parent()).copied().unwrap_or(TidyTree::ROOT);
            let slot = tree.add_child(parent);
            slots.insert(hit.node.as_str(), slot);
            placed.push((hit.node.as_str(), slot));
        }
        tree.layout(config.height, config.width / 2.0);
        let (root_breadth, _) = tree.position(TidyTree::ROOT);

        let mut side_levels: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (id, slot) in placed {
            if layout.positions.contains_key(id) {
                continue;
            }
            let (breadth, depth) = tree.position(slot);
            layout
                .positions
                .insert(id.to_string(), Point::new(sign * depth, breadth - root_breadth));
            layout.radii.insert(id.to_string(), scaled_radius(id));
            side_levels
                .entry(tree.depth(slot))
                .or_default()
                .push(id.to_string());
        }
        levels.extend(side_levels.into_values());
    }

    let mut crowded: HashSet<String> = HashSet::new();
    for level in &levels {
        let total: f32 = level
            .iter()
            .map(|id| 2.0 * layout.radius(id).unwrap_or(0.0))
            .sum();
        if total > config.height {
            crowded.extend(level.iter().cloned());
            continue;
        }
        let mut cursor = -total / 2.0;
        for id in level {
            let radius = layout.radius(id).unwrap_or(0.0);
            if let Some(point) = layout.positions.get_mut(id) {
                point.y = cursor + radius;
            }
            cursor += 2.0 * radius;
        }
    }

    if !crowded.is_empty() {
        relax_crowded_levels(&mut layout, &crowded, config);
    }
    debug!(
        origin = %neighbors.origin,
        nodes = layout.positions.len(),
        relaxed = crowded.len(),
        "neighbor layout placed"
    );
    layout
}

/// Collision pass over crowded nodes; everything else is held fixed.
fn relax_crowded_levels(layout: &mut Layout, crowded: &HashSet<String>, config: &LayoutConfig) {
    let settings = &config.neighbor;
    let ids: Vec<String> = layout.positions.keys().cloned().collect();
    let mut bodies = Vec::with_capacity(ids.len());
    let mut targets = Vec::with_capacity(ids.len());
    let mut strength_x = Vec::with_capacity(ids.len());
    let mut strength_y = Vec::with_capacity(ids.len());
    let mut radii = Vec::with_capacity(ids.len());
    for id in &ids {
        let point = layout.positions.get(id).copied().unwrap_or_default();
        if crowded.contains(id) {
            bodies.push(Body::at(point));
        } else {
            bodies.push(Body::pinned(point));
        }
        targets.push(point);
        strength_x.push(settings.column_strength);
        strength_y.push(settings.row_strength);
        radii.push(layout.radius(id).unwrap_or(0.0));
    }

    let mut simulation = Simulation::new(bodies)
        .with_alpha_min(config.force.alpha_min)
        .with_velocity_decay(config.force.velocity_decay)
        .with_force(Force::Position {
            targets,
            strength_x,
            strength_y,
        })
        .with_force(Force::Collide {
            radii,
            strength: config.force.collide_strength,
        });
    simulation.run(settings.relax_ticks);
    for (id, body) in ids.iter().zip(simulation.bodies()) {
        layout.positions.insert(id.clone(), body.point());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::initial_view;
    use crate::config::StartDepth;
    use crate::ir::{LinkRecord, VariableRecord};
    use crate::query::nearest_neighbors;

    fn star(spokes: usize) -> GraphStore {
        let mut variables = vec![VariableRecord::new("hub", "hub", "m", "s")];
        let mut links = Vec::new();
        for idx in 0..spokes {
            let out = format!("out{idx}");
            let inc = format!("in{idx}");
            variables.push(VariableRecord::new(&out, &out, "m", "s"));
            variables.push(VariableRecord::new(&inc, &inc, "m", "s"));
            links.push(LinkRecord::new("hub", &out));
            links.push(LinkRecord::new(&inc, "hub"));
        }
        GraphStore::new(variables, links).unwrap()
    }

    #[test]
    fn outbound_right_inbound_left() {
        let store = star(3);
        let view = initial_view(&store, StartDepth::Variables);
        let hits = nearest_neighbors(&view.visible, "hub", 1, LinkDirection::Both).unwrap();
        let config = LayoutConfig::default();
        let layout = compute_neighbor_layout(&store, &hits, &config);
        assert_eq!(layout.position("hub"), Some(Point::default()));
        for idx in 0..3 {
            let out = layout.position(&format!("out{idx}")).unwrap();
            let inc = layout.position(&format!("in{idx}")).unwrap();
            assert_eq!(out.x, config.width / 2.0);
            assert_eq!(inc.x, -config.width / 2.0);
        }
        // stacked edge to edge, centred, in discovery order
        let ys: Vec<f32> = (0..3)
            .map(|idx| layout.position(&format!("out{idx}")).unwrap().y)
            .collect();
        assert!(ys[0] < ys[1] && ys[1] < ys[2]);
        assert!((ys[0] + ys[2]).abs() < 1e-3);
        assert!(ys[1].abs() < 1e-3);
    }

    #[test]
    fn each_side_spreads_its_own_depth_over_half_the_width() {
        let variables = ["hub", "in1", "in2", "in3", "out1", "out2"]
            .iter()
            .map(|id| VariableRecord::new(id, id, "m", "s"))
            .collect();
        let links = vec![
            LinkRecord::new("in3", "in2"),
            LinkRecord::new("in2", "in1"),
            LinkRecord::new("in1", "hub"),
            LinkRecord::new("hub", "out1"),
            LinkRecord::new("out1", "out2"),
        ];
        let store = GraphStore::new(variables, links).unwrap();
        let view = initial_view(&store, StartDepth::Variables);
        let hits = nearest_neighbors(&view.visible, "hub", 3, LinkDirection::Both).unwrap();
        let config = LayoutConfig::default();
        let layout = compute_neighbor_layout(&store, &hits, &config);
        let half = config.width / 2.0;
        let expected = [
            ("out1", half / 2.0),
            ("out2", half),
            ("in1", -half / 3.0),
            ("in2", -2.0 * half / 3.0),
            ("in3", -half),
        ];
        for (id, x) in expected {
            let point = layout.position(id).unwrap();
            assert!((point.x - x).abs() < 1e-3, "{id} at {point:?}, wanted x={x}");
            assert!(point.y.abs() < 1e-3, "{id} off axis at {point:?}");
        }
    }

    #[test]
    fn crowded_level_is_relaxed_without_overlap() {
        let store = star(40);
        let view = initial_view(&store, StartDepth::Variables);
        let hits = nearest_neighbors(&view.visible, "hub", 1, LinkDirection::Outbound).unwrap();
        let mut config = LayoutConfig::default();
        config.height = 120.0;
        let first = compute_neighbor_layout(&store, &hits, &config);
        let second = compute_neighbor_layout(&store, &hits, &config);
        assert_eq!(first, second);
        assert_eq!(first.positions.len(), 41);
        assert!(first.positions.values().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn unknown_origin_is_empty() {
        let store = star(1);
        let hits = NeighborSet {
            origin: "ghost".into(),
            max_depth: 1,
            direction: LinkDirection::Both,
            hits: Vec::new(),
        };
        assert!(compute_neighbor_layout(&store, &hits, &LayoutConfig::default()).is_empty());
    }
}
