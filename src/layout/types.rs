use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ir::{GraphKind, Rank};

/// Display token derived from issue counts. Never a layout input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Normal,
    High,
}

impl Severity {
    pub fn from_issue_count(issue_count: u64, threshold: u64) -> Self {
        if issue_count > threshold {
            Self::High
        } else {
            Self::Normal
        }
    }

    pub fn is_high(self) -> bool {
        self == Self::High
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Normal => "severity-normal",
            Self::High => "severity-high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    pub id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub depth: usize,
    pub rank: Rank,
    pub severity: Severity,
    /// High-severity nodes pulse and open an inspector on click.
    pub interactive: bool,
    pub user_count: Option<u64>,
    pub issue_count: u64,
}

impl NodeLayout {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right_anchor(&self) -> (f32, f32) {
        (self.x + self.width, self.y + self.height / 2.0)
    }

    pub fn left_anchor(&self) -> (f32, f32) {
        (self.x, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayout {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub issue_count: u64,
    pub start: (f32, f32),
    pub control1: (f32, f32),
    pub control2: (f32, f32),
    pub end: (f32, f32),
    pub severity: Severity,
    pub thickness: f32,
}

impl EdgeLayout {
    pub fn points(&self) -> [(f32, f32); 4] {
        [self.start, self.control1, self.control2, self.end]
    }

    /// SVG path data for the cubic curve.
    pub fn path_data(&self) -> String {
        format!(
            "M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
            self.start.0,
            self.start.1,
            self.control1.0,
            self.control1.1,
            self.control2.0,
            self.control2.1,
            self.end.0,
            self.end.1
        )
    }

    /// Point on the curve at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f32) -> (f32, f32) {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let [p0, p1, p2, p3] = self.points();
        let blend = |a: f32, b: f32, c: f32, d: f32| {
            u * u * u * a + 3.0 * u * u * t * b + 3.0 * u * t * t * c + t * t * t * d
        };
        (blend(p0.0, p1.0, p2.0, p3.0), blend(p0.1, p1.1, p2.1, p3.1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub kind: GraphKind,
    pub nodes: BTreeMap<String, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    /// Node ids grouped by depth, top to bottom within each column.
    pub columns: Vec<Vec<String>>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn empty(kind: GraphKind) -> Self {
        Self {
            kind,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            columns: Vec::new(),
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<(f32, f32)> {
        self.nodes.get(id).map(|node| (node.x, node.y))
    }

    pub fn positions(&self) -> BTreeMap<&str, (f32, f32)> {
        self.nodes
            .iter()
            .map(|(id, node)| (id.as_str(), (node.x, node.y)))
            .collect()
    }

    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.nodes.get(id).map(|node| node.depth)
    }
}
