use crate::engine::EngineState;
use crate::ir::{LinkDirection, Tier, VisibleLink};
use crate::layout::{Layout, LayoutMode};
use crate::query::{NeighborSet, PathResult, path_links};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Serialize)]
pub struct RenderDump {
    pub mode: LayoutMode,
    pub width: f32,
    pub height: f32,
    pub background: String,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbors: Option<NeighborSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathResult>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub tier: Tier,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: String,
    pub highlighted: bool,
}

#[derive(Debug, Serialize)]
pub struct LinkDump {
    pub source: String,
    pub target: String,
    pub direction: LinkDirection,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub color: String,
}

/// The persisted form of a view: just the visible ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleSnapshot {
    pub visible: Vec<String>,
}

impl RenderDump {
    pub fn overview(engine: &EngineState) -> Self {
        let links = engine.visible().links().cloned().collect();
        Self::build(engine, engine.layout(), links, HashSet::new())
    }

    pub fn neighbors(engine: &EngineState, neighbors: &NeighborSet) -> Self {
        let layout = engine.neighbor_layout(neighbors);
        let links = engine
            .visible()
            .links()
            .filter(|link| {
                neighbors
                    .hits
                    .iter()
                    .any(|hit| link.key() == VisibleLink::pair_key(&hit.source, &hit.target))
            })
            .cloned()
            .collect();
        let highlighted = HashSet::from([neighbors.origin.clone()]);
        let mut dump = Self::build(engine, &layout, links, highlighted);
        dump.neighbors = Some(neighbors.clone());
        dump
    }

    pub fn path(engine: &EngineState, path: &PathResult) -> Self {
        let layout = engine.path_layout(path);
        let links = path_links(engine.visible(), path.nodes());
        let highlighted = path.nodes().iter().cloned().collect();
        let mut dump = Self::build(engine, &layout, links, highlighted);
        dump.path = Some(path.clone());
        dump
    }

    fn build(
        engine: &EngineState,
        layout: &Layout,
        links: Vec<VisibleLink>,
        highlighted: HashSet<String>,
    ) -> Self {
        let store = engine.store();
        let theme = &engine.config().theme;
        let nodes = layout
            .positions
            .iter()
            .filter_map(|(id, point)| {
                let node = store.node(id)?;
                let cluster = store.submodule_index(node.submodule()).unwrap_or(0);
                Some(NodeDump {
                    id: id.clone(),
                    name: node.name().to_string(),
                    tier: node.tier(),
                    x: point.x,
                    y: point.y,
                    radius: layout.radius(id).unwrap_or(0.0),
                    color: theme.node_color(cluster, node.tier()),
                    highlighted: highlighted.contains(id),
                })
            })
            .collect();

        let links = links
            .into_iter()
            .filter_map(|link| {
                let from = layout.position(&link.source)?;
                let to = layout.position(&link.target)?;
                let color = if highlighted.contains(&link.source) && highlighted.contains(&link.target)
                {
                    theme.highlight_color.clone()
                } else {
                    theme.link_color.clone()
                };
                Some(LinkDump {
                    source: link.source,
                    target: link.target,
                    direction: link.direction,
                    x1: from.x,
                    y1: from.y,
                    x2: to.x,
                    y2: to.y,
                    color,
                })
            })
            .collect();

        RenderDump {
            mode: layout.mode,
            width: engine.config().layout.width,
            height: engine.config().layout.height,
            background: theme.background.clone(),
            nodes,
            links,
            neighbors: None,
            path: None,
        }
    }
}

pub fn write_layout_dump(path: &Path, dump: &RenderDump) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, dump)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> anyhow::Result<VisibleSnapshot> {
    let file = File::open(path)?;
    let snapshot = serde_json::from_reader(BufReader::new(file))?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::{LinkRecord, VariableRecord};
    use crate::store::GraphStore;

    fn engine() -> EngineState {
        let variables = vec![
            VariableRecord::new("a", "A", "m1", "s1"),
            VariableRecord::new("b", "B", "m1", "s1"),
            VariableRecord::new("c", "C", "m2", "s1"),
        ];
        let links = vec![LinkRecord::new("a", "b"), LinkRecord::new("b", "c")];
        EngineState::new(GraphStore::new(variables, links).unwrap(), Config::default())
    }

    #[test]
    fn overview_carries_every_visible_node_and_link() {
        let engine = engine();
        let dump = RenderDump::overview(&engine);
        assert_eq!(dump.mode, LayoutMode::Force);
        assert_eq!(dump.nodes.len(), 3);
        assert_eq!(dump.links.len(), 2);
        let json = serde_json::to_value(&dump).unwrap();
        assert!(json.get("path").is_none());
        assert_eq!(json["nodes"][0]["tier"], "variable");
    }

    #[test]
    fn path_dump_highlights_the_route() {
        let engine = engine();
        let path = engine.shortest_path("a", "c").unwrap();
        let dump = RenderDump::path(&engine, &path);
        assert_eq!(dump.mode, LayoutMode::Path);
        assert!(dump.nodes.iter().all(|node| node.highlighted));
        assert_eq!(dump.links.len(), 2);
        assert!(dump.links.iter().all(|link| link.y1 == 0.0 && link.y2 == 0.0));
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["path"]["status"], "found");
    }

    #[test]
    fn snapshot_is_plain_json() {
        let snapshot = VisibleSnapshot {
            visible: vec!["submodule:m1".into(), "c".into()],
        };
        let text = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(text, r#"{"visible":["submodule:m1","c"]}"#);
    }
}
