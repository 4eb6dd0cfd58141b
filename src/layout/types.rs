use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

pub type Positions = BTreeMap<String, Point>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Force,
    Neighbor,
    Path,
}

/// A node as the layout engine sees it: identity, grouping and size only.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub tier: Tier,
    /// Submodule index in load order.
    pub cluster: usize,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub mode: LayoutMode,
    pub positions: Positions,
    pub radii: BTreeMap<String, f32>,
}

impl Layout {
    pub fn empty(mode: LayoutMode) -> Self {
        Self {
            mode,
            positions: Positions::new(),
            radii: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn radius(&self, id: &str) -> Option<f32> {
        self.radii.get(id).copied()
    }
}
