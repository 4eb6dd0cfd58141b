use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::ir::{
    AggregateKey, Dataset, Link, LinkRecord, Node, SegmentNode, SubmoduleNode, Tier,
    VariableNode, VariableRecord,
};

/// Immutable base dataset: every variable, the two derived aggregate tiers,
/// and the leaf-level links annotated with their grouping keys.
#[derive(Debug, Clone)]
pub struct GraphStore {
    nodes: IndexMap<String, Node>,
    segments: IndexMap<AggregateKey, String>,
    submodules: IndexMap<AggregateKey, String>,
    links: Vec<Link>,
    links_by_key: HashMap<AggregateKey, Vec<usize>>,
}

impl GraphStore {
    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        Self::new(dataset.variables, dataset.links)
    }

    pub fn new(variables: Vec<VariableRecord>, links: Vec<LinkRecord>) -> Result<Self> {
        let mut variable_nodes: IndexMap<String, VariableNode> = IndexMap::new();
        let mut segments: IndexMap<AggregateKey, SegmentNode> = IndexMap::new();
        let mut submodules: IndexMap<AggregateKey, SubmoduleNode> = IndexMap::new();

        for record in variables {
            let Some(submodule) = record.submodule_id.clone() else {
                return Err(EngineError::DataIntegrity(format!(
                    "variable `{}` has no submodule reference",
                    record.id
                )));
            };
            let Some(segment) = record.segment_id.clone() else {
                return Err(EngineError::DataIntegrity(format!(
                    "variable `{}` has no segment reference",
                    record.id
                )));
            };
            if variable_nodes.contains_key(&record.id) {
                return Err(EngineError::DataIntegrity(format!(
                    "duplicate variable id `{}`",
                    record.id
                )));
            }

            let submodule_key = AggregateKey::Submodule(submodule.clone());
            let segment_key = AggregateKey::segment(&submodule, &segment);

            let submodule_node =
                submodules
                    .entry(submodule_key.clone())
                    .or_insert_with(|| SubmoduleNode {
                        id: submodule_key.node_id(),
                        name: record
                            .submodule_name
                            .clone()
                            .unwrap_or_else(|| submodule.clone()),
                        submodule: submodule.clone(),
                        segments: Vec::new(),
                        degree: 0,
                    });
            let segment_id = segment_key.node_id();
            if !submodule_node.segments.contains(&segment_id) {
                submodule_node.segments.push(segment_id.clone());
            }

            segments
                .entry(segment_key)
                .or_insert_with(|| SegmentNode {
                    id: segment_id,
                    name: record.segment_name.clone().unwrap_or_else(|| segment.clone()),
                    submodule: submodule.clone(),
                    segment: segment.clone(),
                    variables: Vec::new(),
                    degree: 0,
                })
                .variables
                .push(record.id.clone());

            variable_nodes.insert(
                record.id.clone(),
                VariableNode {
                    id: record.id,
                    name: record.name,
                    submodule,
                    segment,
                    attributes: record.attributes,
                    degree: 0,
                },
            );
        }

        let mut aggregate_ids: HashMap<String, &AggregateKey> = HashMap::new();
        for key in segments.keys().chain(submodules.keys()) {
            let id = key.node_id();
            if variable_nodes.contains_key(&id) {
                return Err(EngineError::DataIntegrity(format!(
                    "variable id `{id}` collides with an aggregate id"
                )));
            }
            if let Some(previous) = aggregate_ids.insert(id.clone(), key) {
                return Err(EngineError::DataIntegrity(format!(
                    "aggregate id `{id}` is produced by both {previous:?} and {key:?}"
                )));
            }
        }

        let mut expanded: Vec<Link> = Vec::with_capacity(links.len());
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for record in links {
            let Some(source) = variable_nodes.get(&record.source) else {
                return Err(EngineError::DataIntegrity(format!(
                    "link references unknown source `{}`",
                    record.source
                )));
            };
            let Some(target) = variable_nodes.get(&record.target) else {
                return Err(EngineError::DataIntegrity(format!(
                    "link references unknown target `{}`",
                    record.target
                )));
            };
            if record.source == record.target {
                warn!(variable = %record.source, "dropping self-link");
                continue;
            }
            if !seen.insert((record.source.clone(), record.target.clone())) {
                debug!(source = %record.source, target = %record.target, "dropping duplicate link");
                continue;
            }
            expanded.push(Link {
                source: record.source,
                target: record.target,
                source_submodule: source.submodule.clone(),
                source_segment: source.segment.clone(),
                target_submodule: target.submodule.clone(),
                target_segment: target.segment.clone(),
            });
        }

        let mut links_by_key: HashMap<AggregateKey, Vec<usize>> = HashMap::new();
        for (idx, link) in expanded.iter().enumerate() {
            let source_segment = link.source_segment_key();
            let target_segment = link.target_segment_key();
            let source_submodule = source_segment.submodule_key();
            let target_submodule = target_segment.submodule_key();
            links_by_key.entry(source_segment.clone()).or_default().push(idx);
            if target_segment != source_segment {
                links_by_key.entry(target_segment).or_default().push(idx);
            }
            links_by_key.entry(source_submodule.clone()).or_default().push(idx);
            if target_submodule != source_submodule {
                links_by_key.entry(target_submodule).or_default().push(idx);
            }

            if let Some(node) = variable_nodes.get_mut(&link.source) {
                node.degree += 1;
            }
            if let Some(node) = variable_nodes.get_mut(&link.target) {
                node.degree += 1;
            }
        }
        for (key, node) in segments.iter_mut() {
            node.degree = links_by_key.get(key).map(Vec::len).unwrap_or(0);
        }
        for (key, node) in submodules.iter_mut() {
            node.degree = links_by_key.get(key).map(Vec::len).unwrap_or(0);
        }

        info!(
            variables = variable_nodes.len(),
            segments = segments.len(),
            submodules = submodules.len(),
            links = expanded.len(),
            "graph store loaded"
        );

        let mut nodes: IndexMap<String, Node> = IndexMap::new();
        let mut segment_ids = IndexMap::new();
        let mut submodule_ids = IndexMap::new();
        for (key, node) in submodules {
            submodule_ids.insert(key, node.id.clone());
            nodes.insert(node.id.clone(), Node::Submodule(node));
        }
        for (key, node) in segments {
            segment_ids.insert(key, node.id.clone());
            nodes.insert(node.id.clone(), Node::Segment(node));
        }
        for (id, node) in variable_nodes {
            nodes.insert(id, Node::Variable(node));
        }

        Ok(Self {
            nodes,
            segments: segment_ids,
            submodules: submodule_ids,
            links: expanded,
            links_by_key,
        })
    }

    pub fn all_variable_nodes(&self) -> impl Iterator<Item = &VariableNode> {
        self.nodes.values().filter_map(|node| match node {
            Node::Variable(variable) => Some(variable),
            _ => None,
        })
    }

    pub fn all_aggregate_nodes(&self, tier: Tier) -> Vec<&Node> {
        let ids = match tier {
            Tier::Submodule => &self.submodules,
            Tier::Segment => &self.segments,
            Tier::Variable => return Vec::new(),
        };
        ids.values().filter_map(|id| self.nodes.get(id)).collect()
    }

    pub fn expanded_links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn aggregate(&self, key: &AggregateKey) -> Option<&Node> {
        let id = match key {
            AggregateKey::Submodule(_) => self.submodules.get(key),
            AggregateKey::Segment { .. } => self.segments.get(key),
        }?;
        self.nodes.get(id)
    }

    pub fn submodule_keys(&self) -> impl Iterator<Item = &AggregateKey> {
        self.submodules.keys()
    }

    pub fn segment_keys(&self) -> impl Iterator<Item = &AggregateKey> {
        self.segments.keys()
    }

    pub fn segments_of(&self, submodule: &str) -> Vec<&AggregateKey> {
        self.segments
            .keys()
            .filter(|key| key.submodule() == submodule)
            .collect()
    }

    /// Position of a submodule in load order; drives colours and home anchors.
    pub fn submodule_index(&self, submodule: &str) -> Option<usize> {
        self.submodules
            .get_index_of(&AggregateKey::Submodule(submodule.to_string()))
    }

    pub fn submodule_count(&self) -> usize {
        self.submodules.len()
    }

    /// Immediate children of an aggregate, as node ids in load order.
    pub fn children(&self, key: &AggregateKey) -> &[String] {
        match self.aggregate(key) {
            Some(Node::Submodule(node)) => &node.segments,
            Some(Node::Segment(node)) => &node.variables,
            _ => &[],
        }
    }

    /// Leaf ids under an aggregate.
    pub fn variables_under(&self, key: &AggregateKey) -> Vec<&str> {
        match self.aggregate(key) {
            Some(Node::Segment(node)) => node.variables.iter().map(String::as_str).collect(),
            Some(Node::Submodule(node)) => node
                .segments
                .iter()
                .filter_map(|id| match self.nodes.get(id) {
                    Some(Node::Segment(segment)) => Some(segment),
                    _ => None,
                })
                .flat_map(|segment| segment.variables.iter().map(String::as_str))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Expanded links with at least one endpoint inside `key`.
    pub fn links_touching<'a>(
        &'a self,
        key: &AggregateKey,
    ) -> impl Iterator<Item = &'a Link> + use<'a> {
        self.links_by_key
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|idx| self.links.get(*idx))
    }
}
