use std::collections::{BTreeMap, HashSet};

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::StartDepth;
use crate::error::{EngineError, Result};
use crate::ir::{AggregateKey, Node, Tier, VisibleLink};
use crate::store::GraphStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateState {
    Collapsed,
    /// Submodule expanded to segments, some of which are still collapsed.
    Partial,
    Expanded,
}

impl AggregateState {
    pub fn is_collapsed(self) -> bool {
        self == Self::Collapsed
    }
}

/// Expanded/collapsed flag per aggregate key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapsedStateMap {
    states: BTreeMap<AggregateKey, AggregateState>,
}

impl CollapsedStateMap {
    /// Keys never touched count as expanded.
    pub fn state(&self, key: &AggregateKey) -> AggregateState {
        self.states
            .get(key)
            .copied()
            .unwrap_or(AggregateState::Expanded)
    }

    pub fn is_collapsed(&self, key: &AggregateKey) -> bool {
        self.state(key).is_collapsed()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AggregateKey, AggregateState)> {
        self.states.iter().map(|(key, state)| (key, *state))
    }

    fn set(&mut self, key: AggregateKey, state: AggregateState) {
        self.states.insert(key, state);
    }
}

/// The nodes currently shown, in display order, and the links derived from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    nodes: IndexSet<String>,
    links: BTreeMap<(String, String), VisibleLink>,
}

impl VisibleSet {
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn links(&self) -> impl Iterator<Item = &VisibleLink> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The link joining `a` and `b`, whichever way round.
    pub fn link_between(&self, a: &str, b: &str) -> Option<&VisibleLink> {
        self.links.get(&VisibleLink::pair_key(a, b))
    }

    /// Check the structural invariants against the store. Returns every violation found.
    pub fn validate(&self, store: &GraphStore) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for id in &self.nodes {
            let Some(node) = store.node(id) else {
                errors.push(format!("visible node `{id}` is not in the store"));
                continue;
            };
            let mut ancestors = Vec::new();
            if let Node::Variable(_) = node
                && let Some(segment) = node.segment_key()
            {
                ancestors.push(segment);
            }
            if node.tier() != Tier::Submodule {
                ancestors.push(node.submodule_key());
            }
            for ancestor in ancestors {
                let ancestor_id = ancestor.node_id();
                if self.nodes.contains(&ancestor_id) {
                    errors.push(format!(
                        "node `{id}` is visible together with its ancestor `{ancestor_id}`"
                    ));
                }
            }
        }

        for variable in store.all_variable_nodes() {
            if representative(store, &self.nodes, &variable.id).is_none() {
                errors.push(format!("variable `{}` has no visible representative", variable.id));
            }
        }

        for link in self.links.values() {
            if link.source == link.target {
                errors.push(format!("self link on `{}`", link.source));
            }
            if !self.nodes.contains(&link.source) || !self.nodes.contains(&link.target) {
                errors.push(format!(
                    "link `{}`-`{}` references a hidden node",
                    link.source, link.target
                ));
            }
        }

        if derive_links(store, &self.nodes) != self.links {
            errors.push("visible links differ from a full re-derivation".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A VisibleSet together with the state map that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub visible: VisibleSet,
    pub states: CollapsedStateMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Expand,
    Collapse,
}

/// Build the starting view at the requested tier.
pub fn initial_view(store: &GraphStore, depth: StartDepth) -> ViewState {
    let mut nodes: IndexSet<String> = IndexSet::new();
    let mut states = CollapsedStateMap::default();

    for submodule_key in store.submodule_keys() {
        let segments = store.segments_of(submodule_key.submodule());
        match depth {
            StartDepth::Submodules => {
                nodes.insert(submodule_key.node_id());
                states.set(submodule_key.clone(), AggregateState::Collapsed);
                for segment in segments {
                    states.set(segment.clone(), AggregateState::Collapsed);
                }
            }
            StartDepth::Segments => {
                states.set(submodule_key.clone(), AggregateState::Partial);
                for segment in segments {
                    nodes.insert(segment.node_id());
                    states.set(segment.clone(), AggregateState::Collapsed);
                }
            }
            StartDepth::Variables => {
                states.set(submodule_key.clone(), AggregateState::Expanded);
                for segment in segments {
                    nodes.extend(store.children(segment).iter().cloned());
                    states.set(segment.clone(), AggregateState::Expanded);
                }
            }
        }
    }

    let links = derive_links(store, &nodes);
    debug!(
        ?depth,
        nodes = nodes.len(),
        links = links.len(),
        "initial view built"
    );
    ViewState {
        visible: VisibleSet { nodes, links },
        states,
    }
}

/// Replace a visible Segment or Submodule by its immediate children.
pub fn expand(store: &GraphStore, view: &ViewState, node_id: &str) -> Result<ViewState> {
    let node = store
        .node(node_id)
        .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
    let Some(key) = node.aggregate_key() else {
        return Err(rejected("expand", node, "leaf nodes have no children"));
    };
    if !view.visible.contains(node_id) {
        return Err(rejected("expand", node, "node is not visible"));
    }
    Ok(expand_key(store, view, &key))
}

/// Collapse the aggregate one tier above `node_id`: a Variable collapses its
/// Segment, a Segment collapses its Submodule.
pub fn collapse(store: &GraphStore, view: &ViewState, node_id: &str) -> Result<ViewState> {
    let node = store
        .node(node_id)
        .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
    let key = match node {
        Node::Variable(_) => node.segment_key(),
        Node::Segment(_) => Some(node.submodule_key()),
        Node::Submodule(_) => None,
    };
    let Some(key) = key else {
        return Err(rejected("collapse", node, "submodules are the top tier"));
    };
    if !view.visible.contains(node_id) {
        return Err(rejected("collapse", node, "node is not visible"));
    }
    Ok(collapse_key(store, view, &key))
}

/// Decide what a double activation on `node_id` does.
///
/// Submodules always expand. Otherwise the node expands only when its segment
/// flag reads collapsed while its submodule flag reads expanded.
pub fn activation_for(store: &GraphStore, states: &CollapsedStateMap, node_id: &str) -> Result<Activation> {
    let node = store
        .node(node_id)
        .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
    let action = match node.segment_key() {
        None => Activation::Expand,
        Some(segment) => {
            let segment_collapsed = states.is_collapsed(&segment);
            let submodule_expanded = !states.is_collapsed(&node.submodule_key());
            if segment_collapsed && submodule_expanded {
                Activation::Expand
            } else {
                Activation::Collapse
            }
        }
    };
    Ok(action)
}

/// Run whichever of expand/collapse the activation rule picks.
pub fn activate(store: &GraphStore, view: &ViewState, node_id: &str) -> Result<(Activation, ViewState)> {
    let action = activation_for(store, &view.states, node_id)?;
    let next = match action {
        Activation::Expand => expand(store, view, node_id)?,
        Activation::Collapse => collapse(store, view, node_id)?,
    };
    Ok((action, next))
}

/// Collapse everything down to `depth`, regardless of the current view.
pub fn collapse_all(store: &GraphStore, depth: StartDepth) -> ViewState {
    initial_view(store, depth)
}

/// Rebuild a view from a persisted list of visible ids by replaying collapses
/// from the fully expanded state. Aggregates win over their own descendants.
pub fn reconstruct_visible_set(store: &GraphStore, visible_ids: &[String]) -> Result<ViewState> {
    let wanted: HashSet<&str> = visible_ids.iter().map(String::as_str).collect();
    for id in &wanted {
        if store.node(id).is_none() {
            return Err(EngineError::UnknownNode(id.to_string()));
        }
    }

    let mut view = initial_view(store, StartDepth::Variables);
    let segment_keys: Vec<AggregateKey> = store
        .segment_keys()
        .filter(|key| {
            wanted.contains(key.node_id().as_str())
                && !wanted.contains(key.submodule_key().node_id().as_str())
        })
        .cloned()
        .collect();
    for key in &segment_keys {
        view = collapse_key(store, &view, key);
    }
    let submodule_keys: Vec<AggregateKey> = store
        .submodule_keys()
        .filter(|key| wanted.contains(key.node_id().as_str()))
        .cloned()
        .collect();
    for key in &submodule_keys {
        view = collapse_key(store, &view, key);
    }

    let shadowed = wanted
        .iter()
        .filter(|id| !view.visible.contains(id))
        .count();
    if shadowed > 0 {
        debug!(shadowed, "persisted ids hidden by a collapsed ancestor");
    }
    Ok(view)
}

/// Every visible link, derived from scratch from the expanded links.
pub fn derive_links(
    store: &GraphStore,
    nodes: &IndexSet<String>,
) -> BTreeMap<(String, String), VisibleLink> {
    let mut links = BTreeMap::new();
    for link in store.expanded_links() {
        let (Some(from), Some(to)) = (
            representative(store, nodes, &link.source),
            representative(store, nodes, &link.target),
        ) else {
            continue;
        };
        insert_merged(&mut links, &from, &to);
    }
    links
}

fn expand_key(store: &GraphStore, view: &ViewState, key: &AggregateKey) -> ViewState {
    let node_id = key.node_id();
    let children = store.children(key);
    let nodes = splice(&view.visible.nodes, |id| id == node_id, children);

    let mut links = view.visible.links.clone();
    links.retain(|_, link| !link.touches(&node_id));
    rewire(store, &nodes, &mut links, key);

    // Only the acted-on flag moves; child segment flags keep their history.
    let mut states = view.states.clone();
    states.set(key.clone(), AggregateState::Expanded);
    refresh_submodule_state(store, &nodes, &mut states, key.submodule());

    info!(aggregate = %node_id, added = children.len(), "expanded");
    ViewState {
        visible: VisibleSet { nodes, links },
        states,
    }
}

fn collapse_key(store: &GraphStore, view: &ViewState, key: &AggregateKey) -> ViewState {
    let aggregate_id = key.node_id();
    let removed: HashSet<&str> = view
        .visible
        .nodes
        .iter()
        .filter(|id| store.node(id).is_some_and(|node| belongs_to(node, key)))
        .map(String::as_str)
        .collect();
    let nodes = splice(
        &view.visible.nodes,
        |id| removed.contains(id),
        std::slice::from_ref(&aggregate_id),
    );

    let mut links = view.visible.links.clone();
    links.retain(|_, link| {
        !removed.contains(link.source.as_str()) && !removed.contains(link.target.as_str())
    });
    rewire(store, &nodes, &mut links, key);

    let mut states = view.states.clone();
    states.set(key.clone(), AggregateState::Collapsed);
    refresh_submodule_state(store, &nodes, &mut states, key.submodule());

    info!(aggregate = %aggregate_id, removed = removed.len(), "collapsed");
    ViewState {
        visible: VisibleSet { nodes, links },
        states,
    }
}

/// Re-derive the links incident to the nodes now standing for `key`.
fn rewire(
    store: &GraphStore,
    nodes: &IndexSet<String>,
    links: &mut BTreeMap<(String, String), VisibleLink>,
    key: &AggregateKey,
) {
    let mut dropped = 0usize;
    for link in store.links_touching(key) {
        let (Some(from), Some(to)) = (
            representative(store, nodes, &link.source),
            representative(store, nodes, &link.target),
        ) else {
            dropped += 1;
            continue;
        };
        insert_merged(links, &from, &to);
    }
    if dropped > 0 {
        debug!(aggregate = %key.node_id(), dropped, "links without a visible endpoint skipped");
    }
}

fn insert_merged(links: &mut BTreeMap<(String, String), VisibleLink>, from: &str, to: &str) {
    if from == to {
        return;
    }
    let candidate = VisibleLink::canonical(from, to);
    links
        .entry(candidate.key())
        .and_modify(|existing| existing.direction = existing.direction.merge(candidate.direction))
        .or_insert(candidate);
}

/// The visible node currently standing in for a variable: itself, its segment
/// or its submodule, in that order.
fn representative(store: &GraphStore, nodes: &IndexSet<String>, variable_id: &str) -> Option<String> {
    if nodes.contains(variable_id) {
        return Some(variable_id.to_string());
    }
    let Some(Node::Variable(variable)) = store.node(variable_id) else {
        return None;
    };
    let segment_id = AggregateKey::segment(&variable.submodule, &variable.segment).node_id();
    if nodes.contains(&segment_id) {
        return Some(segment_id);
    }
    let submodule_id = AggregateKey::Submodule(variable.submodule.clone()).node_id();
    if nodes.contains(&submodule_id) {
        return Some(submodule_id);
    }
    None
}

fn belongs_to(node: &Node, key: &AggregateKey) -> bool {
    match key {
        AggregateKey::Submodule(submodule) => {
            node.tier() != Tier::Submodule && node.submodule() == submodule
        }
        AggregateKey::Segment { .. } => {
            node.tier() == Tier::Variable && node.segment_key().as_ref() == Some(key)
        }
    }
}

/// Copy `nodes`, putting `insert` where the first removed id was.
fn splice(
    nodes: &IndexSet<String>,
    remove: impl Fn(&str) -> bool,
    insert: &[String],
) -> IndexSet<String> {
    let mut out = IndexSet::with_capacity(nodes.len() + insert.len());
    let mut inserted = false;
    for id in nodes {
        if remove(id) {
            if !inserted {
                out.extend(insert.iter().cloned());
                inserted = true;
            }
            continue;
        }
        out.insert(id.clone());
    }
    if !inserted {
        out.extend(insert.iter().cloned());
    }
    out
}

fn refresh_submodule_state(
    store: &GraphStore,
    nodes: &IndexSet<String>,
    states: &mut CollapsedStateMap,
    submodule: &str,
) {
    let key = AggregateKey::Submodule(submodule.to_string());
    let state = if nodes.contains(&key.node_id()) {
        AggregateState::Collapsed
    } else if store
        .segments_of(submodule)
        .iter()
        .any(|segment| nodes.contains(&segment.node_id()))
    {
        AggregateState::Partial
    } else {
        AggregateState::Expanded
    };
    states.set(key, state);
}

fn rejected(action: &'static str, node: &Node, reason: &'static str) -> EngineError {
    warn!(action, node = node.id(), tier = ?node.tier(), reason, "rejected aggregation request");
    EngineError::InvalidOperation {
        action,
        node: node.id().to_string(),
        tier: node.tier(),
        reason,
    }
}
