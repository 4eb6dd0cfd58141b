use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Submodule,
    Segment,
    Variable,
}

/// Identifies a Segment or Submodule aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregateKey {
    Submodule(String),
    Segment { submodule: String, segment: String },
}

impl AggregateKey {
    pub fn segment(submodule: &str, segment: &str) -> Self {
        Self::Segment {
            submodule: submodule.to_string(),
            segment: segment.to_string(),
        }
    }

    pub fn node_id(&self) -> String {
        match self {
            Self::Submodule(submodule) => format!("submodule:{submodule}"),
            Self::Segment { submodule, segment } => format!("segment:{submodule}/{segment}"),
        }
    }

    pub fn submodule(&self) -> &str {
        match self {
            Self::Submodule(submodule) => submodule,
            Self::Segment { submodule, .. } => submodule,
        }
    }

    pub fn submodule_key(&self) -> AggregateKey {
        AggregateKey::Submodule(self.submodule().to_string())
    }

    pub fn tier(&self) -> Tier {
        match self {
            Self::Submodule(_) => Tier::Submodule,
            Self::Segment { .. } => Tier::Segment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableNode {
    pub id: String,
    pub name: String,
    pub submodule: String,
    pub segment: String,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentNode {
    pub id: String,
    pub name: String,
    pub submodule: String,
    pub segment: String,
    pub variables: Vec<String>,
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmoduleNode {
    pub id: String,
    pub name: String,
    pub submodule: String,
    pub segments: Vec<String>,
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tier", rename_all = "lowercase")]
pub enum Node {
    Variable(VariableNode),
    Segment(SegmentNode),
    Submodule(SubmoduleNode),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Self::Variable(node) => &node.id,
            Self::Segment(node) => &node.id,
            Self::Submodule(node) => &node.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Variable(node) => &node.name,
            Self::Segment(node) => &node.name,
            Self::Submodule(node) => &node.name,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Self::Variable(_) => Tier::Variable,
            Self::Segment(_) => Tier::Segment,
            Self::Submodule(_) => Tier::Submodule,
        }
    }

    pub fn submodule(&self) -> &str {
        match self {
            Self::Variable(node) => &node.submodule,
            Self::Segment(node) => &node.submodule,
            Self::Submodule(node) => &node.submodule,
        }
    }

    pub fn degree(&self) -> usize {
        match self {
            Self::Variable(node) => node.degree,
            Self::Segment(node) => node.degree,
            Self::Submodule(node) => node.degree,
        }
    }

    pub fn submodule_key(&self) -> AggregateKey {
        AggregateKey::Submodule(self.submodule().to_string())
    }

    /// The segment a variable or segment node belongs to; `None` for submodules.
    pub fn segment_key(&self) -> Option<AggregateKey> {
        match self {
            Self::Variable(node) => Some(AggregateKey::segment(&node.submodule, &node.segment)),
            Self::Segment(node) => Some(AggregateKey::segment(&node.submodule, &node.segment)),
            Self::Submodule(_) => None,
        }
    }

    /// The aggregate this node itself stands for, if it is one.
    pub fn aggregate_key(&self) -> Option<AggregateKey> {
        match self {
            Self::Variable(_) => None,
            Self::Segment(node) => Some(AggregateKey::segment(&node.submodule, &node.segment)),
            Self::Submodule(node) => Some(AggregateKey::Submodule(node.submodule.clone())),
        }
    }
}

/// A directed leaf-level link, annotated with both endpoints' grouping keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub source_submodule: String,
    pub source_segment: String,
    pub target_submodule: String,
    pub target_segment: String,
}

impl Link {
    pub fn source_segment_key(&self) -> AggregateKey {
        AggregateKey::segment(&self.source_submodule, &self.source_segment)
    }

    pub fn target_segment_key(&self) -> AggregateKey {
        AggregateKey::segment(&self.target_submodule, &self.target_segment)
    }

    pub fn touches(&self, key: &AggregateKey) -> bool {
        match key {
            AggregateKey::Submodule(submodule) => {
                &self.source_submodule == submodule || &self.target_submodule == submodule
            }
            AggregateKey::Segment { submodule, segment } => {
                (&self.source_submodule == submodule && &self.source_segment == segment)
                    || (&self.target_submodule == submodule && &self.target_segment == segment)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// source -> target
    Outbound,
    /// target -> source
    Inbound,
    Both,
}

impl LinkDirection {
    pub fn merge(self, other: Self) -> Self {
        if self == other { self } else { Self::Both }
    }

    pub fn includes_outbound(self) -> bool {
        matches!(self, Self::Outbound | Self::Both)
    }

    pub fn includes_inbound(self) -> bool {
        matches!(self, Self::Inbound | Self::Both)
    }
}

/// An edge between whatever nodes currently represent the endpoints.
///
/// Stored in canonical form: `source < target` lexicographically and
/// `direction` relative to that order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VisibleLink {
    pub source: String,
    pub target: String,
    pub direction: LinkDirection,
}

impl VisibleLink {
    /// Canonical link for an original edge running `from -> to`.
    pub fn canonical(from: &str, to: &str) -> Self {
        if from <= to {
            Self {
                source: from.to_string(),
                target: to.to_string(),
                direction: LinkDirection::Outbound,
            }
        } else {
            Self {
                source: to.to_string(),
                target: from.to_string(),
                direction: LinkDirection::Inbound,
            }
        }
    }

    pub fn pair_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.source.clone(), self.target.clone())
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    /// Whether this link carries an edge running `from -> to`.
    pub fn runs(&self, from: &str, to: &str) -> bool {
        if self.source == from && self.target == to {
            self.direction.includes_outbound()
        } else if self.source == to && self.target == from {
            self.direction.includes_inbound()
        } else {
            false
        }
    }

    /// Directed edges carried by this link, as `(from, to)` pairs.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let forward = (self.source.as_str(), self.target.as_str());
        let backward = (self.target.as_str(), self.source.as_str());
        match self.direction {
            LinkDirection::Outbound => vec![forward],
            LinkDirection::Inbound => vec![backward],
            LinkDirection::Both => vec![forward, backward],
        }
    }
}

/// One variable as handed over by the data loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableRecord {
    pub id: String,
    pub name: String,
    pub submodule_id: Option<String>,
    #[serde(default)]
    pub submodule_name: Option<String>,
    pub segment_id: Option<String>,
    #[serde(default)]
    pub segment_name: Option<String>,
    #[serde(default, flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl VariableRecord {
    pub fn new(id: &str, name: &str, submodule: &str, segment: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            submodule_id: Some(submodule.to_string()),
            submodule_name: None,
            segment_id: Some(segment.to_string()),
            segment_name: None,
            attributes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
}

impl LinkRecord {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub variables: Vec<VariableRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl Dataset {
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}
