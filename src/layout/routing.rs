use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::ir::Graph;

use super::{EdgeLayout, NodeLayout, Severity};

// ── Curve shaping ───────────────────────────────────────────────────
/// Floor for the control-point span as a ratio of `column_gap`, so edges
/// between nearly aligned endpoints still bend.
const MIN_PULL_RATIO: f32 = 0.5;

// ── Port slots ──────────────────────────────────────────────────────
/// Share of a node's height that sibling ports may spread across.
const PORT_SPREAD_RATIO: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EdgeSide {
    /// Incoming edges attach on the left.
    Left,
    /// Outgoing edges leave on the right.
    Right,
}

pub(super) fn apply_port_offset(point: (f32, f32), offset: f32) -> (f32, f32) {
    (point.0, point.1 + offset)
}

/// Vertical offset of sibling `index` out of `count`, centered on zero.
///
/// When `count` siblings at `spacing` would spill past the box, the step
/// shrinks so the whole fan fits while every port stays distinct.
pub(super) fn slot_offset(index: usize, count: usize, spacing: f32, height: f32) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    let span = (count - 1) as f32;
    let limit = (height * PORT_SPREAD_RATIO / 2.0).max(0.0);
    let step = spacing.min(2.0 * limit / span);
    (index as f32 - span / 2.0) * step
}

/// Offsets for every edge on one side of its node. Siblings are ordered by
/// the vertical position of the node at their other end, then by id, so the
/// fan never crosses itself.
fn port_slots(
    graph: &Graph,
    nodes: &BTreeMap<String, NodeLayout>,
    side: EdgeSide,
    config: &LayoutConfig,
) -> Vec<f32> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, edge) in graph.edges.iter().enumerate() {
        let key = match side {
            EdgeSide::Right => edge.source.as_str(),
            EdgeSide::Left => edge.target.as_str(),
        };
        groups.entry(key).or_default().push(idx);
    }

    let mut slots = vec![0.0; graph.edges.len()];
    for (node_id, mut members) in groups {
        let Some(node) = nodes.get(node_id) else {
            continue;
        };
        let far_end = |idx: usize| {
            let edge = &graph.edges[idx];
            let id = match side {
                EdgeSide::Right => edge.target.as_str(),
                EdgeSide::Left => edge.source.as_str(),
            };
            let y = nodes.get(id).map(|n| n.center().1).unwrap_or(0.0);
            (y, id)
        };
        members.sort_by(|a, b| {
            let (ay, aid) = far_end(*a);
            let (by, bid) = far_end(*b);
            ay.total_cmp(&by).then_with(|| aid.cmp(bid))
        });
        let count = members.len();
        for (position, idx) in members.into_iter().enumerate() {
            slots[idx] = slot_offset(position, count, config.sibling_offset, node.height);
        }
    }
    slots
}

fn control_points(
    start: (f32, f32),
    end: (f32, f32),
    config: &LayoutConfig,
) -> ((f32, f32), (f32, f32)) {
    let span = (end.0 - start.0).abs();
    let pull = span.max(config.column_gap * MIN_PULL_RATIO) * config.curvature;
    ((start.0 + pull, start.1), (end.0 - pull, end.1))
}

fn edge_thickness(weight: f64, max_weight: f64, config: &LayoutConfig) -> f32 {
    if max_weight <= 0.0 || !weight.is_finite() {
        return config.min_edge_thickness;
    }
    let ratio = (weight / max_weight).clamp(0.0, 1.0) as f32;
    config.min_edge_thickness + (config.max_edge_thickness - config.min_edge_thickness) * ratio
}

/// Curves every retained edge from the right side of its source box to the
/// left side of its target box.
pub(super) fn route_edges(
    graph: &Graph,
    nodes: &BTreeMap<String, NodeLayout>,
    config: &LayoutConfig,
) -> Vec<EdgeLayout> {
    let out_slots = port_slots(graph, nodes, EdgeSide::Right, config);
    let in_slots = port_slots(graph, nodes, EdgeSide::Left, config);
    let max_weight = graph
        .edges
        .iter()
        .map(|edge| edge.weight)
        .filter(|weight| weight.is_finite())
        .fold(0.0, f64::max);

    graph
        .edges
        .iter()
        .enumerate()
        .filter_map(|(idx, edge)| {
            let from = nodes.get(&edge.source)?;
            let to = nodes.get(&edge.target)?;
            let start = apply_port_offset(from.right_anchor(), out_slots[idx]);
            let end = apply_port_offset(to.left_anchor(), in_slots[idx]);
            let (control1, control2) = control_points(start, end, config);
            Some(EdgeLayout {
                source: edge.source.clone(),
                target: edge.target.clone(),
                weight: edge.weight,
                issue_count: edge.issue_count,
                start,
                control1,
                control2,
                end,
                severity: Severity::from_issue_count(edge.issue_count, config.severity_threshold),
                thickness: edge_thickness(edge.weight, max_weight, config),
            })
        })
        .collect()
}
