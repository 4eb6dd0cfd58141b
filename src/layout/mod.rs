mod force;
mod neighbor;
mod path;
mod tidy;
pub(crate) mod types;

pub use force::{Body, Force, LinkSpring, Simulation};
pub use neighbor::compute_neighbor_layout;
pub use path::compute_path_layout;
pub use tidy::TidyTree;
pub use types::*;

pub(crate) use force::phyllotaxis;

use crate::aggregate::VisibleSet;
use crate::config::LayoutConfig;
use crate::ir::{LinkDirection, Tier};
use crate::query::NeighborSet;
use crate::store::GraphStore;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Resolve ids against the store; unknown ids are skipped.
pub fn layout_nodes<'a>(
    store: &GraphStore,
    ids: impl IntoIterator<Item = &'a str>,
    config: &LayoutConfig,
) -> Vec<LayoutNode> {
    ids.into_iter()
        .filter_map(|id| store.node(id))
        .map(|node| LayoutNode {
            id: node.id().to_string(),
            tier: node.tier(),
            cluster: store.submodule_index(node.submodule()).unwrap_or(0),
            radius: config.node_radius(node.tier(), node.degree()),
        })
        .collect()
}

/// One home per submodule, evenly spaced on a circle around the origin.
pub fn home_positions(submodule_count: usize, home_radius: f32) -> Vec<Point> {
    if submodule_count <= 1 {
        return vec![Point::default(); submodule_count];
    }
    (0..submodule_count)
        .map(|idx| {
            let angle = std::f32::consts::TAU * idx as f32 / submodule_count as f32
                - std::f32::consts::FRAC_PI_2;
            Point::new(home_radius * angle.cos(), home_radius * angle.sin())
        })
        .collect()
}

/// Overview layout of the visible graph.
///
/// Nodes with a `previous` position restart from it at reduced energy; the
/// others are seeded on a spiral around their anchor. `pins` hold nodes fixed.
pub fn compute_force_layout(
    store: &GraphStore,
    visible: &VisibleSet,
    config: &LayoutConfig,
    previous: Option<&Positions>,
    pins: &Positions,
) -> Layout {
    let nodes = layout_nodes(store, visible.nodes(), config);
    if nodes.is_empty() {
        return Layout::empty(LayoutMode::Force);
    }
    let force = &config.force;
    let center = Point::default();
    let homes = home_positions(store.submodule_count(), force.home_radius);

    let mut anchors = Vec::with_capacity(nodes.len());
    let mut anchor_strengths = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let home = homes.get(node.cluster).copied().unwrap_or(center);
        let (anchor, strength) = match node.tier {
            Tier::Submodule => (home, force.anchor_strength_submodule),
            Tier::Segment => (home, force.anchor_strength_segment),
            Tier::Variable => (center, force.anchor_strength_variable),
        };
        anchors.push(anchor);
        anchor_strengths.push(strength);
    }

    let mut reused = 0usize;
    let mut spiral_slots: HashMap<Option<usize>, usize> = HashMap::new();
    let bodies: Vec<Body> = nodes
        .iter()
        .zip(&anchors)
        .map(|(node, anchor)| {
            if let Some(pin) = pins.get(&node.id) {
                return Body::pinned(*pin);
            }
            if let Some(point) = previous.and_then(|prev| prev.get(&node.id)) {
                reused += 1;
                return Body::at(*point);
            }
            let group = (node.tier != Tier::Variable).then_some(node.cluster);
            let slot = spiral_slots.entry(group).or_insert(0);
            let seed = phyllotaxis(*anchor, *slot);
            *slot += 1;
            Body::at(seed)
        })
        .collect();
    let alpha = if reused > 0 { force.reheat_alpha } else { 1.0 };

    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let edges: Vec<(usize, usize)> = visible
        .links()
        .filter_map(|link| Some((*index.get(link.source.as_str())?, *index.get(link.target.as_str())?)))
        .collect();
    let variable_view = nodes.iter().all(|node| node.tier == Tier::Variable);
    let link_strength = if variable_view { force.link_strength } else { 0.0 };

    let collide_radii = nodes
        .iter()
        .map(|node| (node.radius * force.collide_multiplier).min(force.collide_max))
        .collect();
    let weights = nodes.iter().map(|node| node.radius * node.radius).collect();
    let groups = nodes.iter().map(|node| node.cluster).collect();

    let mut simulation = Simulation::new(bodies)
        .with_alpha(alpha)
        .with_alpha_min(force.alpha_min)
        .with_velocity_decay(force.velocity_decay)
        .with_force(Force::link(nodes.len(), &edges, force.link_distance, link_strength))
        .with_force(Force::Position {
            targets: anchors,
            strength_x: anchor_strengths.clone(),
            strength_y: anchor_strengths,
        })
        .with_force(Force::Collide {
            radii: collide_radii,
            strength: force.collide_strength,
        })
        .with_force(Force::Cluster {
            groups,
            weights,
            strength: force.cluster_strength,
        });
    simulation.run(force.ticks);
    debug!(
        nodes = nodes.len(),
        links = edges.len(),
        reused,
        alpha,
        "force layout settled"
    );

    let mut layout = Layout::empty(LayoutMode::Force);
    for (node, body) in nodes.iter().zip(simulation.bodies()) {
        layout.positions.insert(node.id.clone(), body.point());
        layout.radii.insert(node.id.clone(), node.radius);
    }
    layout
}
