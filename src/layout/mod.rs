pub mod ranking;
mod routing;
mod tree;
pub(crate) mod types;
pub use types::*;
use routing::*;
use tree::*;

use crate::config::LayoutConfig;
use crate::ir::{Graph, GraphKind};
use std::collections::BTreeMap;

/// Positions every node of `graph` in depth columns and curves its edges.
///
/// Tree graphs are layered by distance from the root, aggregated graphs by
/// longest path from any source. An empty graph yields an empty layout.
pub fn compute_layout(graph: &Graph, config: &LayoutConfig) -> Layout {
    if graph.is_empty() {
        return Layout::empty(graph.kind);
    }

    let depths = match graph.kind {
        GraphKind::Tree => tree_depths(graph).unwrap_or_else(|| {
            tracing::debug!("tree graph is not fully reachable from its root; layering as DAG");
            ranking::longest_path_depths(graph)
        }),
        GraphKind::Aggregated => ranking::longest_path_depths(graph),
    };

    let columns = build_columns(graph, &depths);
    let (nodes, width, height) = place_nodes(graph, &columns, config);
    let edges = route_edges(graph, &nodes, config);

    Layout {
        kind: graph.kind,
        nodes,
        edges,
        columns,
        width,
        height,
    }
}

/// Groups node ids by depth, each column ordered by `(rank, id)`.
fn build_columns(graph: &Graph, depths: &BTreeMap<String, usize>) -> Vec<Vec<String>> {
    let column_count = depths.values().copied().max().map_or(0, |max| max + 1);
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); column_count];
    for (id, depth) in depths {
        columns[*depth].push(id.clone());
    }
    for column in &mut columns {
        column.sort_by(|a, b| graph.rank_of(a).cmp(&graph.rank_of(b)).then_with(|| a.cmp(b)));
    }
    columns
}

fn stack_height(count: usize, config: &LayoutConfig) -> f32 {
    if count == 0 {
        return 0.0;
    }
    count as f32 * config.node_height + (count - 1) as f32 * config.row_gap
}

fn place_nodes(
    graph: &Graph,
    columns: &[Vec<String>],
    config: &LayoutConfig,
) -> (BTreeMap<String, NodeLayout>, f32, f32) {
    let tallest = columns.iter().map(Vec::len).max().unwrap_or(0);
    let inner_height = stack_height(tallest, config);
    let column_step = config.node_width + config.column_gap;
    let row_step = config.node_height + config.row_gap;

    let mut nodes = BTreeMap::new();
    for (depth, column) in columns.iter().enumerate() {
        let offset = if config.center_columns {
            (inner_height - stack_height(column.len(), config)) / 2.0
        } else {
            0.0
        };
        let x = config.padding + depth as f32 * column_step;
        for (row, id) in column.iter().enumerate() {
            let Some(node) = graph.nodes.get(id) else {
                continue;
            };
            let issue_count = node.metrics.issues();
            let severity = Severity::from_issue_count(issue_count, config.severity_threshold);
            nodes.insert(
                id.clone(),
                NodeLayout {
                    id: id.clone(),
                    label: node.label.clone(),
                    x,
                    y: config.padding + offset + row as f32 * row_step,
                    width: config.node_width,
                    height: config.node_height,
                    depth,
                    rank: node.rank,
                    severity,
                    interactive: severity.is_high(),
                    user_count: node.metrics.user_count,
                    issue_count,
                },
            );
        }
    }

    let width = if columns.is_empty() {
        0.0
    } else {
        config.padding * 2.0
            + columns.len() as f32 * config.node_width
            + (columns.len() - 1) as f32 * config.column_gap
    };
    let height = config.padding * 2.0 + inner_height;
    (nodes, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::{build_graph, build_graph_from_edges, build_tree_graph};
    use crate::ir::{Edge, NodeMetrics, PathTrace, TraceBatch, TreeNode};

    fn traces(items: &[(&str, f64)]) -> Graph {
        let batch = TraceBatch::new(
            items
                .iter()
                .map(|(path, weight)| PathTrace::new(*path, *weight))
                .collect(),
        );
        build_graph(&batch, &GraphConfig::default()).graph
    }

    #[test]
    fn empty_graph_yields_empty_layout() {
        let layout = compute_layout(&Graph::new(GraphKind::Aggregated), &LayoutConfig::default());
        assert!(layout.is_empty());
        assert!(layout.columns.is_empty());
        assert_eq!(layout.width, 0.0);
    }

    #[test]
    fn tree_mode_layers_by_distance_from_root() {
        let root = TreeNode::new("Home").with_child(TreeNode::new("Product").with_child(TreeNode::new("Cart")));
        let layout = compute_layout(&build_tree_graph(&root).graph, &LayoutConfig::default());
        assert_eq!(layout.depth_of("Home"), Some(0));
        assert_eq!(layout.depth_of("Product"), Some(1));
        assert_eq!(layout.depth_of("Cart"), Some(2));
        assert_eq!(
            layout.columns,
            vec![vec!["Home".to_string()], vec!["Product".to_string()], vec!["Cart".to_string()]]
        );
    }

    #[test]
    fn dag_mode_uses_longest_path() {
        let edges = vec![
            Edge::new("A", "B", 5.0),
            Edge::new("B", "C", 4.0),
            Edge::new("A", "C", 3.0),
            Edge::new("B", "D", 2.0),
        ];
        let graph = build_graph_from_edges(edges, &BTreeMap::new(), &GraphConfig::default()).graph;
        let layout = compute_layout(&graph, &LayoutConfig::default());
        assert_eq!(layout.depth_of("A"), Some(0));
        assert_eq!(layout.depth_of("B"), Some(1));
        assert_eq!(layout.depth_of("C"), Some(2));
        assert_eq!(layout.depth_of("D"), Some(2));
        assert_eq!(layout.columns[2], vec!["C".to_string(), "D".to_string()]);
    }

    #[test]
    fn columns_never_overlap_vertically() {
        let config = LayoutConfig::default();
        let graph = traces(&[("S>A", 1.0), ("S>B", 1.0), ("S>C", 1.0), ("S>D", 1.0)]);
        let layout = compute_layout(&graph, &config);
        for column in &layout.columns {
            let mut ys: Vec<f32> = column.iter().filter_map(|id| layout.position(id)).map(|p| p.1).collect();
            ys.sort_by(f32::total_cmp);
            for pair in ys.windows(2) {
                assert!(pair[1] - pair[0] >= config.node_height + config.row_gap - 1e-3);
            }
        }
    }

    #[test]
    fn canvas_fits_every_node() {
        let config = LayoutConfig::default();
        let graph = traces(&[("S>A>B", 1.0), ("S>C", 1.0), ("S>D", 1.0)]);
        let layout = compute_layout(&graph, &config);
        assert_eq!(layout.columns.len(), 3);
        assert_eq!(layout.width, 2.0 * 32.0 + 3.0 * 180.0 + 2.0 * 80.0);
        assert_eq!(layout.height, 2.0 * 32.0 + 3.0 * 56.0 + 2.0 * 24.0);
        for node in layout.nodes.values() {
            assert!(node.x >= config.padding && node.x + node.width <= layout.width - config.padding + 1e-3);
            assert!(node.y >= config.padding && node.y + node.height <= layout.height - config.padding + 1e-3);
        }
    }

    #[test]
    fn shorter_columns_are_centered() {
        let config = LayoutConfig::default();
        let graph = traces(&[("S>A", 1.0), ("S>B", 1.0), ("S>C", 1.0)]);
        let layout = compute_layout(&graph, &config);
        let source_center = layout.nodes["S"].center().1;
        let middle_center = layout.nodes["B"].center().1;
        assert!((source_center - middle_center).abs() < 1e-3);

        let flush = LayoutConfig {
            center_columns: false,
            ..LayoutConfig::default()
        };
        let layout = compute_layout(&graph, &flush);
        assert_eq!(layout.nodes["S"].y, flush.padding);
    }

    #[test]
    fn severity_marks_nodes_and_edges() {
        let mut batch = TraceBatch::new(vec![
            PathTrace::new("Home>Cart", 10.0).with_issues(2),
            PathTrace::new("Home>Help", 5.0),
        ]);
        batch.node_metrics.insert(
            "Cart".to_string(),
            NodeMetrics {
                user_count: Some(10),
                issue_count: Some(1),
            },
        );
        let graph = build_graph(&batch, &GraphConfig::default()).graph;
        let layout = compute_layout(&graph, &LayoutConfig::default());
        assert_eq!(layout.nodes["Cart"].severity, Severity::High);
        assert!(layout.nodes["Cart"].interactive);
        assert_eq!(layout.nodes["Help"].severity, Severity::Normal);
        let edge = |t: &str| layout.edges.iter().find(|e| e.target == t).map(|e| e.severity);
        assert_eq!(edge("Cart"), Some(Severity::High));
        assert_eq!(edge("Help"), Some(Severity::Normal));
    }

    #[test]
    fn fan_out_edges_leave_from_distinct_ports() {
        let graph = traces(&[("S>A", 3.0), ("S>B", 2.0), ("S>C", 1.0)]);
        let layout = compute_layout(&graph, &LayoutConfig::default());
        let mut starts: Vec<f32> = layout.edges.iter().map(|e| e.start.1).collect();
        starts.sort_by(f32::total_cmp);
        starts.dedup();
        assert_eq!(starts.len(), 3);
        for edge in &layout.edges {
            let source = &layout.nodes[&edge.source];
            let target = &layout.nodes[&edge.target];
            assert_eq!(edge.start.0, source.x + source.width);
            assert_eq!(edge.end.0, target.x);
        }
    }

    #[test]
    fn wide_fan_out_never_shares_a_port() {
        let paths: Vec<String> = (0..11).map(|i| format!("Home>S{i:02}")).collect();
        let items: Vec<(&str, f64)> = paths.iter().map(|p| (p.as_str(), 1.0)).collect();
        let layout = compute_layout(&traces(&items), &LayoutConfig::default());
        assert_eq!(layout.edges.len(), 11);
        let mut starts: Vec<f32> = layout.edges.iter().map(|e| e.start.1).collect();
        starts.sort_by(f32::total_cmp);
        starts.dedup();
        assert_eq!(starts.len(), 11);
        let home = &layout.nodes["Home"];
        assert!(starts.iter().all(|y| *y > home.y && *y < home.y + home.height));
    }
}
