use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a graph was produced, which decides how it is layered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphKind {
    /// Built by aggregating many weighted traces.
    Aggregated,
    /// Built from an explicit rooted hierarchy.
    Tree,
}

/// Earliest position at which a label was seen across a batch.
///
/// `Unassigned` orders after every real rank and is equal to itself, so two
/// unassigned endpoints never satisfy a strict `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rank {
    Seen(usize),
    Unassigned,
}

impl Rank {
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Seen(index) => Some(index),
            Self::Unassigned => None,
        }
    }

    pub fn is_assigned(self) -> bool {
        matches!(self, Self::Seen(_))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Seen(a), Self::Seen(b)) => a.cmp(b),
            (Self::Seen(_), Self::Unassigned) => Ordering::Less,
            (Self::Unassigned, Self::Seen(_)) => Ordering::Greater,
            (Self::Unassigned, Self::Unassigned) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One recorded journey: a delimited list of screens and its share of users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathTrace {
    pub path: String,
    pub weight: f64,
    #[serde(default)]
    pub issue_count: u64,
}

impl PathTrace {
    pub fn new(path: impl Into<String>, weight: f64) -> Self {
        Self {
            path: path.into(),
            weight,
            issue_count: 0,
        }
    }

    pub fn with_issues(mut self, issue_count: u64) -> Self {
        self.issue_count = issue_count;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_count: Option<u64>,
}

impl NodeMetrics {
    pub fn issues(&self) -> u64 {
        self.issue_count.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub rank: Rank,
    pub metrics: NodeMetrics,
}

/// Content reference to the trace whose candidate survived deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceOrigin {
    pub labels: Vec<String>,
    pub weight: f64,
    pub issue_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub weight: f64,
    #[serde(default)]
    pub issue_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<TraceOrigin>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
            issue_count: 0,
            origin: None,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Nodes and retained edges of one engine run.
///
/// Edges are kept sorted by `(source, target)` with at most one entry per
/// pair, and never form a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub kind: GraphKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub nodes: BTreeMap<String, Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(kind: GraphKind) -> Self {
        Self {
            kind,
            root: None,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn ensure_node(&mut self, id: &str) -> &mut Node {
        self.nodes.entry(id.to_string()).or_insert_with(|| Node {
            id: id.to_string(),
            label: id.to_string(),
            rank: Rank::Unassigned,
            metrics: NodeMetrics::default(),
        })
    }

    pub fn rank_of(&self, id: &str) -> Rank {
        self.nodes
            .get(id)
            .map(|node| node.rank)
            .unwrap_or(Rank::Unassigned)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&Edge> {
        self.edges
            .binary_search_by(|edge| {
                (edge.source.as_str(), edge.target.as_str()).cmp(&(source, target))
            })
            .ok()
            .map(|idx| &self.edges[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn sort_edges(&mut self) {
        self.edges
            .sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
    }
}

/// A batch of traces plus optional per-screen metrics from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceBatch {
    pub traces: Vec<PathTrace>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_metrics: BTreeMap<String, NodeMetrics>,
}

impl TraceBatch {
    pub fn new(traces: Vec<PathTrace>) -> Self {
        Self {
            traces,
            node_metrics: BTreeMap::new(),
        }
    }
}

impl From<Vec<PathTrace>> for TraceBatch {
    fn from(traces: Vec<PathTrace>) -> Self {
        Self::new(traces)
    }
}

/// A node of an already hierarchical journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub metrics: NodeMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            metrics: NodeMetrics::default(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Either input shape the engine accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowInput {
    Traces(TraceBatch),
    Tree(TreeNode),
}
