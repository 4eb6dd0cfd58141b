use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::VisibleSet;
use crate::error::{EngineError, Result};
use crate::ir::{LinkDirection, VisibleLink};

pub const MAX_NEIGHBOR_DEPTH: usize = 3;

/// Directed adjacency over the visible graph. Self loops and parallel edges
/// are already gone by construction of the visible link set.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    successors: IndexMap<String, IndexSet<String>>,
    predecessors: IndexMap<String, IndexSet<String>>,
}

impl Adjacency {
    pub fn from_visible(visible: &VisibleSet) -> Self {
        let mut successors: IndexMap<String, IndexSet<String>> = visible
            .nodes()
            .map(|id| (id.to_string(), IndexSet::new()))
            .collect();
        let mut predecessors = successors.clone();
        for link in visible.links() {
            for (from, to) in link.edges() {
                if from == to {
                    continue;
                }
                if let Some(out) = successors.get_mut(from) {
                    out.insert(to.to_string());
                }
                if let Some(inc) = predecessors.get_mut(to) {
                    inc.insert(from.to_string());
                }
            }
        }
        Self {
            successors,
            predecessors,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.successors.contains_key(id)
    }

    pub fn successors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.successors
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn predecessors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.predecessors
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    fn step(&self, id: &str, direction: LinkDirection) -> Vec<&str> {
        match direction {
            LinkDirection::Inbound => self.predecessors(id).collect(),
            _ => self.successors(id).collect(),
        }
    }
}

/// One newly discovered node, with the edge it was reached through.
///
/// `source -> target` is the real direction of that edge, so for inbound hits
/// the discovered node is the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborHit {
    pub source: String,
    pub target: String,
    pub direction: LinkDirection,
    pub depth: usize,
    pub node: String,
}

impl NeighborHit {
    /// The node one step closer to the origin.
    pub fn parent(&self) -> &str {
        match self.direction {
            LinkDirection::Inbound => &self.target,
            _ => &self.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborSet {
    pub origin: String,
    pub max_depth: usize,
    pub direction: LinkDirection,
    pub hits: Vec<NeighborHit>,
}

impl NeighborSet {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Origin first, then every discovered node once, in discovery order.
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: IndexSet<String> = IndexSet::new();
        ids.insert(self.origin.clone());
        for hit in &self.hits {
            ids.insert(hit.node.clone());
        }
        ids.into_iter().collect()
    }

    pub fn hits_in(&self, direction: LinkDirection) -> impl Iterator<Item = &NeighborHit> {
        self.hits.iter().filter(move |hit| hit.direction == direction)
    }
}

/// Bounded breadth-first search from `origin`, outbound and inbound kept apart.
pub fn nearest_neighbors(
    visible: &VisibleSet,
    origin: &str,
    max_depth: usize,
    direction: LinkDirection,
) -> Result<NeighborSet> {
    if !(1..=MAX_NEIGHBOR_DEPTH).contains(&max_depth) {
        return Err(EngineError::InvalidDepth(max_depth));
    }
    let mut result = NeighborSet {
        origin: origin.to_string(),
        max_depth,
        direction,
        hits: Vec::new(),
    };
    let adjacency = Adjacency::from_visible(visible);
    if !adjacency.contains(origin) {
        debug!(origin, "neighbor query on a node that is not visible");
        return Ok(result);
    }

    let mut walks: Vec<(LinkDirection, HashSet<String>, Vec<String>)> = Vec::new();
    if direction.includes_outbound() {
        walks.push((
            LinkDirection::Outbound,
            HashSet::from([origin.to_string()]),
            vec![origin.to_string()],
        ));
    }
    if direction.includes_inbound() {
        walks.push((
            LinkDirection::Inbound,
            HashSet::from([origin.to_string()]),
            vec![origin.to_string()],
        ));
    }

    for depth in 1..=max_depth {
        for (walk_direction, visited, frontier) in walks.iter_mut() {
            let mut next = Vec::new();
            for parent in frontier.iter() {
                for neighbor in adjacency.step(parent, *walk_direction) {
                    if !visited.insert(neighbor.to_string()) {
                        continue;
                    }
                    let (source, target) = match walk_direction {
                        LinkDirection::Inbound => (neighbor.to_string(), parent.clone()),
                        _ => (parent.clone(), neighbor.to_string()),
                    };
                    result.hits.push(NeighborHit {
                        source,
                        target,
                        direction: *walk_direction,
                        depth,
                        node: neighbor.to_string(),
                    });
                    next.push(neighbor.to_string());
                }
            }
            *frontier = next;
        }
        if walks.iter().all(|(_, _, frontier)| frontier.is_empty()) {
            break;
        }
    }

    if result.is_empty() {
        debug!(origin, max_depth, ?direction, "no neighbors found");
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "nodes", rename_all = "snake_case")]
pub enum PathResult {
    Found(Vec<String>),
    NoPathFound,
}

impl PathResult {
    pub fn nodes(&self) -> &[String] {
        match self {
            Self::Found(nodes) => nodes,
            Self::NoPathFound => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Fewest-hops path following link direction from `start` to `end`.
pub fn shortest_path(visible: &VisibleSet, start: &str, end: &str) -> PathResult {
    let adjacency = Adjacency::from_visible(visible);
    if !adjacency.contains(start) || !adjacency.contains(end) {
        debug!(start, end, "path endpoint not visible");
        return PathResult::NoPathFound;
    }
    if start == end {
        return PathResult::Found(vec![start.to_string()]);
    }

    let mut previous: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::from([start]);
    let mut seen: HashSet<&str> = HashSet::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in adjacency.successors(current) {
            if !seen.insert(next) {
                continue;
            }
            previous.insert(next, current);
            if next == end {
                let mut path = vec![end.to_string()];
                let mut cursor = end;
                while let Some(prev) = previous.get(cursor) {
                    path.push(prev.to_string());
                    cursor = *prev;
                }
                path.reverse();
                return PathResult::Found(path);
            }
            queue.push_back(next);
        }
    }

    debug!(start, end, "no path found");
    PathResult::NoPathFound
}

/// Visible links joining consecutive path nodes; pairs without one are skipped.
pub fn path_links(visible: &VisibleSet, path: &[String]) -> Vec<VisibleLink> {
    path.windows(2)
        .filter_map(|pair| visible.link_between(&pair[0], &pair[1]).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::initial_view;
    use crate::config::StartDepth;
    use crate::ir::{LinkRecord, VariableRecord};
    use crate::store::GraphStore;

    fn chain() -> VisibleSet {
        let variables = ["a", "b", "c", "d"]
            .iter()
            .map(|id| VariableRecord::new(id, id, "m", "s"))
            .collect();
        let links = vec![
            LinkRecord::new("a", "b"),
            LinkRecord::new("b", "c"),
            LinkRecord::new("c", "d"),
        ];
        let store = GraphStore::new(variables, links).unwrap();
        initial_view(&store, StartDepth::Variables).visible
    }

    #[test]
    fn path_follows_direction() {
        let visible = chain();
        assert_eq!(
            shortest_path(&visible, "a", "d"),
            PathResult::Found(vec!["a".into(), "b".into(), "c".into(), "d".into()])
        );
        assert_eq!(shortest_path(&visible, "d", "a"), PathResult::NoPathFound);
        assert_eq!(shortest_path(&visible, "b", "b").nodes(), ["b".to_string()]);
        assert_eq!(shortest_path(&visible, "a", "ghost"), PathResult::NoPathFound);
    }

    #[test]
    fn path_links_skip_gaps() {
        let visible = chain();
        let path: Vec<String> = ["a", "b", "d"].iter().map(|s| s.to_string()).collect();
        let links = path_links(&visible, &path);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].key(), ("a".to_string(), "b".to_string()));
    }

    #[test]
    fn depth_is_bounded() {
        let visible = chain();
        assert_eq!(
            nearest_neighbors(&visible, "a", 0, LinkDirection::Both),
            Err(EngineError::InvalidDepth(0))
        );
        assert_eq!(
            nearest_neighbors(&visible, "a", 4, LinkDirection::Both),
            Err(EngineError::InvalidDepth(4))
        );
        let hits = nearest_neighbors(&visible, "a", 3, LinkDirection::Outbound).unwrap();
        let nodes: Vec<&str> = hits.hits.iter().map(|hit| hit.node.as_str()).collect();
        assert_eq!(nodes, vec!["b", "c", "d"]);
        assert_eq!(hits.hits[2].depth, 3);
    }

    #[test]
    fn inbound_hits_point_at_parent() {
        let visible = chain();
        let set = nearest_neighbors(&visible, "c", 1, LinkDirection::Both).unwrap();
        assert_eq!(set.hits.len(), 2);
        let outbound = &set.hits[0];
        assert_eq!(outbound.direction, LinkDirection::Outbound);
        assert_eq!((outbound.source.as_str(), outbound.target.as_str()), ("c", "d"));
        let inbound = &set.hits[1];
        assert_eq!(inbound.direction, LinkDirection::Inbound);
        assert_eq!((inbound.source.as_str(), inbound.target.as_str()), ("b", "c"));
        assert_eq!(inbound.parent(), "c");
        assert_eq!(set.node_ids(), vec!["c", "d", "b"]);
    }

    #[test]
    fn hidden_origin_gives_empty_result() {
        let visible = chain();
        let set = nearest_neighbors(&visible, "ghost", 2, LinkDirection::Both).unwrap();
        assert!(set.is_empty());
    }
}
