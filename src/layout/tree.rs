use std::collections::{BTreeMap, HashMap};

use crate::ir::Graph;

/// Distance from the root for every node, walking parent-to-child edges
/// with an explicit stack.
///
/// Returns `None` when the graph has no root or some node cannot be reached
/// from it; the caller then layers the graph as a general DAG instead.
pub(super) fn tree_depths(graph: &Graph) -> Option<BTreeMap<String, usize>> {
    let root = graph.root.as_deref()?;
    if !graph.nodes.contains_key(root) {
        return None;
    }

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        children
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut depths: BTreeMap<String, usize> = BTreeMap::new();
    let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
    while let Some((id, depth)) = stack.pop() {
        if depths.contains_key(id) {
            continue;
        }
        depths.insert(id.to_string(), depth);
        if let Some(kids) = children.get(id) {
            for kid in kids.iter().rev() {
                stack.push((*kid, depth + 1));
            }
        }
    }

    (depths.len() == graph.nodes.len()).then_some(depths)
}
