use std::collections::HashMap;

use tracing::{debug, info};

use crate::aggregate::{
    self, Activation, CollapsedStateMap, ViewState, VisibleSet, initial_view,
};
use crate::config::{Config, StartDepth};
use crate::error::{EngineError, Result};
use crate::ir::{Dataset, LinkDirection, Node};
use crate::layout::{
    Layout, Point, Positions, compute_force_layout, compute_neighbor_layout, compute_path_layout,
    phyllotaxis,
};
use crate::layout_dump::VisibleSnapshot;
use crate::query::{self, NeighborSet, PathResult};
use crate::store::GraphStore;

/// Everything a single caller needs to drive the engine: the immutable store,
/// the current view, the configuration and the last overview layout.
///
/// Operations run to completion before returning. A failed operation leaves
/// the state exactly as it was.
#[derive(Debug, Clone)]
pub struct EngineState {
    store: GraphStore,
    config: Config,
    view: ViewState,
    layout: Layout,
    pins: Positions,
}

impl EngineState {
    pub fn new(store: GraphStore, config: Config) -> Self {
        let view = initial_view(&store, config.start_depth);
        let pins = Positions::new();
        let layout = compute_force_layout(&store, &view.visible, &config.layout, None, &pins);
        info!(
            visible = view.visible.len(),
            links = view.visible.link_count(),
            "engine ready"
        );
        Self {
            store,
            config,
            view,
            layout,
            pins,
        }
    }

    pub fn from_dataset(dataset: Dataset, config: Config) -> Result<Self> {
        Ok(Self::new(GraphStore::from_dataset(dataset)?, config))
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn visible(&self) -> &VisibleSet {
        &self.view.visible
    }

    pub fn states(&self) -> &CollapsedStateMap {
        &self.view.states
    }

    /// Last overview layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn pins(&self) -> &Positions {
        &self.pins
    }

    pub fn expand(&mut self, node_id: &str) -> Result<()> {
        let next = aggregate::expand(&self.store, &self.view, node_id)?;
        self.replace_view(next);
        Ok(())
    }

    pub fn collapse(&mut self, node_id: &str) -> Result<()> {
        let next = aggregate::collapse(&self.store, &self.view, node_id)?;
        self.replace_view(next);
        Ok(())
    }

    /// Double activation: expand or collapse according to the state map.
    pub fn activate(&mut self, node_id: &str) -> Result<Activation> {
        let (action, next) = aggregate::activate(&self.store, &self.view, node_id)?;
        self.replace_view(next);
        Ok(action)
    }

    pub fn collapse_all(&mut self, depth: StartDepth) {
        let next = aggregate::collapse_all(&self.store, depth);
        self.replace_view(next);
    }

    pub fn expand_all(&mut self) {
        self.collapse_all(StartDepth::Variables);
    }

    /// Rebuild the view from a persisted snapshot.
    pub fn restore(&mut self, snapshot: &VisibleSnapshot) -> Result<()> {
        let next = aggregate::reconstruct_visible_set(&self.store, &snapshot.visible)?;
        self.replace_view(next);
        Ok(())
    }

    pub fn snapshot(&self) -> VisibleSnapshot {
        VisibleSnapshot {
            visible: self.view.visible.node_ids(),
        }
    }

    pub fn neighbors(
        &self,
        origin: &str,
        max_depth: usize,
        direction: LinkDirection,
    ) -> Result<NeighborSet> {
        self.ensure_known(origin)?;
        query::nearest_neighbors(&self.view.visible, origin, max_depth, direction)
    }

    pub fn shortest_path(&self, start: &str, end: &str) -> Result<PathResult> {
        self.ensure_known(start)?;
        self.ensure_known(end)?;
        Ok(query::shortest_path(&self.view.visible, start, end))
    }

    pub fn neighbor_layout(&self, neighbors: &NeighborSet) -> Layout {
        compute_neighbor_layout(&self.store, neighbors, &self.config.layout)
    }

    pub fn path_layout(&self, path: &PathResult) -> Layout {
        compute_path_layout(&self.store, path.nodes(), &self.config.layout)
    }

    /// Reheat the overview layout from the current positions.
    pub fn relayout(&mut self) -> &Layout {
        let seeds = self.layout.positions.clone();
        self.layout = compute_force_layout(
            &self.store,
            &self.view.visible,
            &self.config.layout,
            Some(&seeds),
            &self.pins,
        );
        &self.layout
    }

    /// Rerun the overview layout from scratch, ignoring previous positions.
    pub fn reset_layout(&mut self) -> &Layout {
        self.layout = compute_force_layout(
            &self.store,
            &self.view.visible,
            &self.config.layout,
            None,
            &self.pins,
        );
        &self.layout
    }

    pub fn pin(&mut self, node_id: &str, point: Point) -> Result<()> {
        self.ensure_known(node_id)?;
        self.pins.insert(node_id.to_string(), point);
        if self.layout.positions.contains_key(node_id) {
            self.layout.positions.insert(node_id.to_string(), point);
        }
        Ok(())
    }

    pub fn unpin(&mut self, node_id: &str) -> bool {
        self.pins.remove(node_id).is_some()
    }

    fn ensure_known(&self, node_id: &str) -> Result<()> {
        if self.store.node(node_id).is_none() {
            return Err(EngineError::UnknownNode(node_id.to_string()));
        }
        Ok(())
    }

    /// Swap in a new view and reheat, seeding new nodes from the nodes they replaced.
    fn replace_view(&mut self, next: ViewState) {
        let seeds = self.inherited_seeds(&next.visible);
        self.view = next;
        self.layout = compute_force_layout(
            &self.store,
            &self.view.visible,
            &self.config.layout,
            Some(&seeds),
            &self.pins,
        );
    }

    fn inherited_seeds(&self, next: &VisibleSet) -> Positions {
        let previous = &self.layout.positions;
        let mut seeds = Positions::new();
        let mut fanned: HashMap<String, usize> = HashMap::new();
        for id in next.nodes() {
            if let Some(point) = previous.get(id) {
                seeds.insert(id.to_string(), *point);
                continue;
            }
            let Some(node) = self.store.node(id) else {
                continue;
            };
            // Expanded children start around the aggregate they came from.
            let parent = [node.segment_key(), Some(node.submodule_key())]
                .into_iter()
                .flatten()
                .map(|key| key.node_id())
                .filter(|parent_id| parent_id != id)
                .find_map(|parent_id| previous.get(&parent_id).map(|p| (parent_id, *p)));
            if let Some((parent_id, center)) = parent {
                let slot = fanned.entry(parent_id).or_insert(0);
                seeds.insert(id.to_string(), phyllotaxis(center, *slot));
                *slot += 1;
                continue;
            }
            // A fresh aggregate starts at the centroid of its former members.
            if let Some(center) = self.member_centroid(node) {
                seeds.insert(id.to_string(), center);
            }
        }
        debug!(
            seeded = seeds.len(),
            visible = next.len(),
            "layout seeds inherited"
        );
        seeds
    }

    fn member_centroid(&self, node: &Node) -> Option<Point> {
        let key = node.aggregate_key()?;
        let previous = &self.layout.positions;
        let mut members: Vec<String> = self
            .store
            .variables_under(&key)
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Node::Submodule(submodule) = node {
            members.extend(submodule.segments.iter().cloned());
        }
        let points: Vec<Point> = members
            .iter()
            .filter_map(|member| previous.get(member).copied())
            .collect();
        if points.is_empty() {
            return None;
        }
        let count = points.len() as f32;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), point| (sx + point.x, sy + point.y));
        Some(Point::new(sx / count, sy / count))
    }
}
