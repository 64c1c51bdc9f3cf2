//! Builds the acyclic, deduplicated flow graph from either input shape.
//!
//! Aggregated traces go through normalization, rank estimation, the forward
//! filter, deduplication and finally the cycle resolver. Trees are walked
//! directly; their edges already point away from the root.

pub mod cycles;
pub mod edges;
pub mod order;

use std::collections::{BTreeMap, HashSet};

use crate::config::GraphConfig;
use crate::error::Warning;
use crate::ir::{Edge, FlowInput, Graph, GraphKind, NodeMetrics, Rank, TraceBatch, TreeNode};
use crate::layout::ranking::topological_order;
use crate::parser::normalize_path;

/// A trace after normalization, remembering where it sat in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrace {
    pub index: usize,
    pub labels: Vec<String>,
    pub weight: f64,
    pub issue_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphBuild {
    pub graph: Graph,
    pub warnings: Vec<Warning>,
}

/// Anything the engine can turn into a [`Graph`].
pub trait NodeSource {
    fn build_graph(&self, config: &GraphConfig) -> GraphBuild;
}

impl NodeSource for TraceBatch {
    fn build_graph(&self, config: &GraphConfig) -> GraphBuild {
        build_graph(self, config)
    }
}

impl NodeSource for TreeNode {
    fn build_graph(&self, _config: &GraphConfig) -> GraphBuild {
        build_tree_graph(self)
    }
}

impl NodeSource for FlowInput {
    fn build_graph(&self, config: &GraphConfig) -> GraphBuild {
        match self {
            FlowInput::Traces(batch) => batch.build_graph(config),
            FlowInput::Tree(root) => root.build_graph(config),
        }
    }
}

/// Normalizes every trace, skipping the ones too short to form an edge.
pub fn normalize_batch(batch: &TraceBatch, delimiter: &str) -> Vec<NormalizedTrace> {
    let mut out = Vec::with_capacity(batch.traces.len());
    for (index, trace) in batch.traces.iter().enumerate() {
        let labels = normalize_path(&trace.path, delimiter);
        if labels.len() < 2 {
            tracing::debug!(index, path = %trace.path, "skipping trace with fewer than two steps");
            continue;
        }
        out.push(NormalizedTrace {
            index,
            labels,
            weight: trace.weight,
            issue_count: trace.issue_count,
        });
    }
    out
}

pub fn build_graph(batch: &TraceBatch, config: &GraphConfig) -> GraphBuild {
    let traces = normalize_batch(batch, &config.delimiter);
    let ranks = order::estimate_ranks(traces.iter().map(|trace| trace.labels.as_slice()));

    let mut graph = Graph::new(GraphKind::Aggregated);
    for (label, rank) in &ranks {
        let node = graph.ensure_node(label);
        node.rank = Rank::Seen(*rank);
        node.metrics = metrics_for(&batch.node_metrics, label);
    }

    let candidates = edges::aggregate_edges(&traces);
    let forward = edges::retain_forward(candidates, &ranks);
    let deduped = edges::dedupe_edges(forward, &traces);
    let resolution = cycles::resolve_cycles(deduped, config.max_cycle_iterations);
    if !resolution.removed.is_empty() {
        tracing::warn!(
            removed = resolution.removed.len(),
            "rank-filtered edges still contained a cycle"
        );
    }

    graph.edges = resolution.edges;
    graph.sort_edges();
    tracing::debug!(
        traces = batch.traces.len(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "built aggregated flow graph"
    );
    GraphBuild {
        graph,
        warnings: resolution.warning.into_iter().collect(),
    }
}

/// Builds a graph from a caller-supplied edge list that never went through
/// the rank filter.
///
/// Parallel edges collapse to the heaviest, self-loops are dropped and cycles
/// are resolved. Ranks are then assigned from a deterministic topological
/// order so that every retained edge still points to a higher rank.
pub fn build_graph_from_edges(
    edges: Vec<Edge>,
    node_metrics: &BTreeMap<String, NodeMetrics>,
    config: &GraphConfig,
) -> GraphBuild {
    let mut graph = Graph::new(GraphKind::Aggregated);
    for edge in &edges {
        graph.ensure_node(&edge.source);
        graph.ensure_node(&edge.target);
    }
    for node in graph.nodes.values_mut() {
        node.metrics = metrics_for(node_metrics, &node.id);
    }

    let edges: Vec<Edge> = edges.into_iter().filter(|edge| !edge.is_self_loop()).collect();
    let resolution = cycles::resolve_cycles(edges::dedupe_prebuilt(edges), config.max_cycle_iterations);
    graph.edges = resolution.edges;
    graph.sort_edges();

    if let Some(order) = topological_order(&graph) {
        for (rank, id) in order.into_iter().enumerate() {
            if let Some(node) = graph.nodes.get_mut(&id) {
                node.rank = Rank::Seen(rank);
            }
        }
    }

    GraphBuild {
        graph,
        warnings: resolution.warning.into_iter().collect(),
    }
}

/// Walks a rooted hierarchy depth first. Ranks are preorder positions, edges
/// run parent to child and carry the child's metrics.
pub fn build_tree_graph(root: &TreeNode) -> GraphBuild {
    let mut graph = Graph::new(GraphKind::Tree);
    graph.root = Some(root.id.clone());
    let mut warnings = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<(&TreeNode, Option<&str>)> = vec![(root, None)];
    let mut preorder = 0usize;

    while let Some((tree_node, parent)) = stack.pop() {
        if !seen.insert(tree_node.id.as_str()) {
            tracing::warn!(id = %tree_node.id, "duplicate tree node skipped");
            warnings.push(Warning::DuplicateTreeNode {
                id: tree_node.id.clone(),
            });
            continue;
        }

        let node = graph.ensure_node(&tree_node.id);
        node.label = tree_node.display_label().to_string();
        node.rank = Rank::Seen(preorder);
        node.metrics = tree_node.metrics.clone();
        preorder += 1;

        if let Some(parent) = parent {
            graph.edges.push(Edge {
                source: parent.to_string(),
                target: tree_node.id.clone(),
                weight: tree_node.metrics.user_count.unwrap_or(0) as f64,
                issue_count: tree_node.metrics.issues(),
                origin: None,
            });
        }

        for child in tree_node.children.iter().rev() {
            stack.push((child, Some(tree_node.id.as_str())));
        }
    }

    graph.sort_edges();
    GraphBuild { graph, warnings }
}

fn metrics_for(metrics: &BTreeMap<String, NodeMetrics>, id: &str) -> NodeMetrics {
    metrics.get(id).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PathTrace;

    fn batch(traces: &[(&str, f64)]) -> TraceBatch {
        TraceBatch::new(
            traces
                .iter()
                .map(|(path, weight)| PathTrace::new(*path, *weight))
                .collect(),
        )
    }

    fn pairs(graph: &Graph) -> Vec<(&str, &str, f64)> {
        graph
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.weight))
            .collect()
    }

    #[test]
    fn checkout_scenario_keeps_forward_edges() {
        let build = build_graph(
            &batch(&[("A>B>C", 50.0), ("A>B>D", 30.0), ("A>C>B", 20.0)]),
            &GraphConfig::default(),
        );
        let graph = &build.graph;
        assert_eq!(graph.rank_of("A"), Rank::Seen(0));
        assert_eq!(graph.rank_of("B"), Rank::Seen(1));
        assert_eq!(graph.rank_of("C"), Rank::Seen(1));
        assert_eq!(graph.rank_of("D"), Rank::Seen(2));
        assert_eq!(pairs(graph), vec![("A", "B", 50.0), ("A", "C", 20.0), ("B", "D", 30.0)]);
        let origin = |s: &str, t: &str| {
            graph
                .edge(s, t)
                .and_then(|e| e.origin.as_ref())
                .map(|o| o.labels.join(">"))
        };
        assert_eq!(origin("A", "B").as_deref(), Some("A>B>C"));
        assert_eq!(origin("A", "C").as_deref(), Some("A>C>B"));
        assert_eq!(origin("B", "D").as_deref(), Some("A>B>D"));
        // B and C share a rank, so neither direction survives.
        assert!(graph.edge("B", "C").is_none());
        assert!(graph.edge("C", "B").is_none());
        assert!(build.warnings.is_empty());
    }

    #[test]
    fn opposing_traces_tie_and_drop_both_edges() {
        let build = build_graph(&batch(&[("X>Y", 10.0), ("Y>X", 40.0)]), &GraphConfig::default());
        assert_eq!(build.graph.nodes.len(), 2);
        assert!(build.graph.edges.is_empty());
    }

    #[test]
    fn short_traces_contribute_nothing() {
        let build = build_graph(&batch(&[("", 5.0), ("Home", 9.0), ("A>B", 1.0)]), &GraphConfig::default());
        assert_eq!(build.graph.nodes.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(build.graph.edges.len(), 1);
    }

    #[test]
    fn node_metrics_are_attached() {
        let mut input = batch(&[("Home>Cart", 3.0)]);
        input.node_metrics.insert(
            "Cart".to_string(),
            NodeMetrics {
                user_count: Some(12),
                issue_count: Some(2),
            },
        );
        let build = build_graph(&input, &GraphConfig::default());
        assert_eq!(build.graph.nodes["Cart"].metrics.issues(), 2);
        assert_eq!(build.graph.nodes["Home"].metrics, NodeMetrics::default());
    }

    #[test]
    fn prebuilt_edges_are_deduped_and_made_acyclic() {
        let edges = vec![
            Edge::new("A", "B", 1.0),
            Edge::new("A", "B", 4.0),
            Edge::new("B", "C", 2.0),
            Edge::new("C", "A", 0.5),
            Edge::new("C", "C", 9.0),
        ];
        let build = build_graph_from_edges(edges, &BTreeMap::new(), &GraphConfig::default());
        let graph = &build.graph;
        assert_eq!(pairs(graph), vec![("A", "B", 4.0), ("B", "C", 2.0)]);
        for edge in &graph.edges {
            assert!(graph.rank_of(&edge.source) < graph.rank_of(&edge.target));
        }
    }

    #[test]
    fn tree_edges_follow_hierarchy() {
        let root = TreeNode::new("Home").with_child(TreeNode::new("Product").with_child(TreeNode::new("Cart")));
        let build = build_tree_graph(&root);
        let graph = &build.graph;
        assert_eq!(graph.kind, GraphKind::Tree);
        assert_eq!(graph.root.as_deref(), Some("Home"));
        assert_eq!(graph.rank_of("Cart"), Rank::Seen(2));
        assert_eq!(
            pairs(graph),
            vec![("Home", "Product", 0.0), ("Product", "Cart", 0.0)]
        );
    }

    #[test]
    fn duplicate_tree_ids_warn_and_skip() {
        let root = TreeNode::new("Home")
            .with_child(TreeNode::new("Cart"))
            .with_child(TreeNode::new("Search").with_child(TreeNode::new("Cart")));
        let build = build_tree_graph(&root);
        assert_eq!(build.graph.nodes.len(), 3);
        assert_eq!(
            build.warnings,
            vec![Warning::DuplicateTreeNode {
                id: "Cart".to_string()
            }]
        );
        assert!(build.graph.edge("Search", "Cart").is_none());
    }

    #[test]
    fn flow_input_dispatches_by_shape() {
        let input = FlowInput::Tree(TreeNode::new("Solo"));
        let build = input.build_graph(&GraphConfig::default());
        assert_eq!(build.graph.nodes.len(), 1);
        assert!(build.graph.edges.is_empty());
    }
}
