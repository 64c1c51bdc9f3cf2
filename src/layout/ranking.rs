use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use crate::ir::{Graph, Rank};

/// Topological walk of the graph; ready nodes leave in `(rank, id)` order.
///
/// If a cycle stalls the walk, the unprocessed node earliest in that order is
/// forced out next and its remaining incoming edges are treated as back
/// edges. The second value reports whether that ever happened.
fn ordered_walk(graph: &Graph) -> (Vec<&str>, bool) {
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indeg: HashMap<&str, usize> = graph.nodes.keys().map(|id| (id.as_str(), 0)).collect();

    for edge in &graph.edges {
        let (from, to) = (edge.source.as_str(), edge.target.as_str());
        if !graph.nodes.contains_key(from) || !graph.nodes.contains_key(to) {
            continue;
        }
        adj.entry(from).or_default().push(to);
        if let Some(deg) = indeg.get_mut(to) {
            *deg += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<(Rank, &str)>> = BinaryHeap::new();
    for (id, deg) in &indeg {
        if *deg == 0 {
            ready.push(Reverse((graph.rank_of(id), *id)));
        }
    }

    let mut order = Vec::with_capacity(graph.nodes.len());
    let mut processed: HashSet<&str> = HashSet::new();
    let mut acyclic = true;
    loop {
        while let Some(Reverse((_key, id))) = ready.pop() {
            if !processed.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(nexts) = adj.get(id) {
                for next in nexts {
                    if processed.contains(next) {
                        continue;
                    }
                    if let Some(deg) = indeg.get_mut(next) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.push(Reverse((graph.rank_of(next), *next)));
                        }
                    }
                }
            }
        }

        if processed.len() >= graph.nodes.len() {
            break;
        }

        acyclic = false;
        let forced = graph
            .nodes
            .keys()
            .map(String::as_str)
            .filter(|id| !processed.contains(id))
            .min_by_key(|id| (graph.rank_of(id), *id));
        match forced {
            Some(id) => ready.push(Reverse((graph.rank_of(id), id))),
            None => break,
        }
    }

    (order, acyclic)
}

/// Deterministic topological order, or `None` if the graph has a cycle.
pub fn topological_order(graph: &Graph) -> Option<Vec<String>> {
    let (order, acyclic) = ordered_walk(graph);
    acyclic.then(|| order.into_iter().map(str::to_string).collect())
}

/// Longest distance from any source node, per node.
///
/// Computed over the walk order; edges that point backwards in that order
/// (only possible if a cycle slipped through) are ignored.
pub fn longest_path_depths(graph: &Graph) -> BTreeMap<String, usize> {
    let (order, _) = ordered_walk(graph);
    let order_index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx))
        .collect();

    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        adj.entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut depths: HashMap<&str, usize> = HashMap::new();
    for node in &order {
        let depth = *depths.entry(*node).or_insert(0);
        let Some(nexts) = adj.get(node) else {
            continue;
        };
        let from_idx = order_index.get(node).copied().unwrap_or(0);
        for next in nexts {
            let Some(&to_idx) = order_index.get(next) else {
                continue;
            };
            if to_idx <= from_idx {
                continue;
            }
            let entry = depths.entry(*next).or_insert(0);
            *entry = (*entry).max(depth + 1);
        }
    }

    depths
        .into_iter()
        .map(|(id, depth)| (id.to_string(), depth))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, GraphKind};

    fn graph(edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new(GraphKind::Aggregated);
        for (source, target) in edges {
            graph.ensure_node(source);
            graph.ensure_node(target);
            graph.edges.push(Edge::new(*source, *target, 1.0));
        }
        graph.sort_edges();
        graph
    }

    #[test]
    fn longest_path_wins_over_shortcut() {
        let g = graph(&[("A", "B"), ("B", "C"), ("A", "C"), ("C", "D")]);
        let depths = longest_path_depths(&g);
        assert_eq!(depths["A"], 0);
        assert_eq!(depths["B"], 1);
        assert_eq!(depths["C"], 2);
        assert_eq!(depths["D"], 3);
    }

    #[test]
    fn isolated_nodes_sit_in_first_column() {
        let mut g = graph(&[("A", "B")]);
        g.ensure_node("Lonely");
        assert_eq!(longest_path_depths(&g)["Lonely"], 0);
    }

    #[test]
    fn topological_order_respects_rank_then_id() {
        let mut g = graph(&[("Home", "Search"), ("Home", "Deals")]);
        for (id, rank) in [("Home", 0), ("Search", 1), ("Deals", 2)] {
            g.ensure_node(id).rank = Rank::Seen(rank);
        }
        assert_eq!(
            topological_order(&g),
            Some(vec!["Home".to_string(), "Search".to_string(), "Deals".to_string()])
        );
    }

    #[test]
    fn cyclic_graphs_have_no_topological_order_but_still_get_depths() {
        let g = graph(&[("A", "B"), ("B", "A"), ("B", "C")]);
        assert!(topological_order(&g).is_none());
        let depths = longest_path_depths(&g);
        assert_eq!(depths.len(), 3);
        assert_eq!(depths["A"], 0);
        assert_eq!(depths["C"], 2);
    }
}
