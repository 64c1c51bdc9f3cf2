//! Cycle detection and removal for edge lists that skipped the rank filter.
//!
//! Traversal is iterative over an arena: labels are interned into a node
//! table once per pass and every edge refers to its endpoints by index, so
//! long journeys never hit recursion limits.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::error::Warning;
use crate::ir::Edge;

#[derive(Debug, Clone, PartialEq)]
pub struct CycleResolution {
    /// Surviving edges, acyclic.
    pub edges: Vec<Edge>,
    /// Edges removed, in removal order.
    pub removed: Vec<Edge>,
    pub warning: Option<Warning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

struct EdgeArena {
    outgoing: Vec<Vec<usize>>,
    targets: Vec<usize>,
}

impl EdgeArena {
    fn new(edges: &[Edge]) -> Self {
        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for edge in edges {
            index.entry(edge.source.as_str()).or_insert(0);
            index.entry(edge.target.as_str()).or_insert(0);
        }
        for (slot, value) in index.values_mut().enumerate() {
            *value = slot;
        }

        let mut outgoing = vec![Vec::new(); index.len()];
        let mut targets = Vec::with_capacity(edges.len());
        for (edge_idx, edge) in edges.iter().enumerate() {
            outgoing[index[edge.source.as_str()]].push(edge_idx);
            targets.push(index[edge.target.as_str()]);
        }
        Self { outgoing, targets }
    }

    /// Depth-first walk over every node. `on_back_edge` receives the back
    /// edge and the edges that close the cycle through it.
    fn walk<F>(&self, mut on_back_edge: F)
    where
        F: FnMut(usize, Vec<usize>) -> ControlFlow<()>,
    {
        let mut state = vec![Visit::New; self.outgoing.len()];
        for start in 0..self.outgoing.len() {
            if state[start] != Visit::New {
                continue;
            }
            state[start] = Visit::OnStack;
            // frames[i] is entered through path[i - 1]
            let mut frames: Vec<(usize, usize)> = vec![(start, 0)];
            let mut path: Vec<usize> = Vec::new();

            while let Some(frame) = frames.last_mut() {
                let (node, cursor) = *frame;
                let Some(&edge) = self.outgoing[node].get(cursor) else {
                    state[node] = Visit::Done;
                    frames.pop();
                    path.pop();
                    continue;
                };
                frame.1 += 1;
                let next = self.targets[edge];
                match state[next] {
                    Visit::New => {
                        state[next] = Visit::OnStack;
                        frames.push((next, 0));
                        path.push(edge);
                    }
                    Visit::OnStack => {
                        let entry = frames.iter().position(|(id, _)| *id == next).unwrap_or(0);
                        let mut cycle = path[entry.min(path.len())..].to_vec();
                        cycle.push(edge);
                        if on_back_edge(edge, cycle).is_break() {
                            return;
                        }
                    }
                    Visit::Done => {}
                }
            }
        }
    }

    fn find_cycle(&self) -> Option<Vec<usize>> {
        let mut found = None;
        self.walk(|_, cycle| {
            found = Some(cycle);
            ControlFlow::Break(())
        });
        found
    }

    fn back_edges(&self) -> Vec<usize> {
        let mut back = Vec::new();
        self.walk(|edge, _| {
            back.push(edge);
            ControlFlow::Continue(())
        });
        back
    }
}

/// Returns `true` when the edge list contains at least one cycle.
pub fn has_cycle(edges: &[Edge]) -> bool {
    EdgeArena::new(edges).find_cycle().is_some()
}

/// Repeatedly breaks the first cycle found by removing its weakest edge.
///
/// At most `min(max_iterations, edges.len())` edges are removed this way.
/// If a cycle survives the budget, every back edge of one final traversal is
/// dropped, which always leaves an acyclic graph, and a warning is returned.
pub fn resolve_cycles(mut edges: Vec<Edge>, max_iterations: usize) -> CycleResolution {
    let budget = max_iterations.min(edges.len());
    let mut removed = Vec::new();
    let mut iterations = 0;

    loop {
        let arena = EdgeArena::new(&edges);
        let Some(cycle) = arena.find_cycle() else {
            return CycleResolution {
                edges,
                removed,
                warning: None,
            };
        };

        if iterations >= budget {
            let mut back = arena.back_edges();
            back.sort_unstable_by(|a, b| b.cmp(a));
            back.dedup();
            let dropped = back.len();
            for idx in back {
                removed.push(edges.remove(idx));
            }
            let warning = Warning::CycleBudgetExhausted {
                iterations,
                dropped,
            };
            tracing::warn!(iterations, dropped, "{warning}");
            return CycleResolution {
                edges,
                removed,
                warning: Some(warning),
            };
        }

        let weakest = cycle
            .iter()
            .copied()
            .min_by(|&a, &b| {
                edges[a].weight.total_cmp(&edges[b].weight).then_with(|| {
                    (&edges[b].source, &edges[b].target).cmp(&(&edges[a].source, &edges[a].target))
                })
            })
            .unwrap_or(cycle[0]);
        let edge = edges.remove(weakest);
        tracing::debug!(
            source = %edge.source,
            target = %edge.target,
            weight = edge.weight,
            cycle_len = cycle.len(),
            "removed weakest edge of cycle"
        );
        removed.push(edge);
        iterations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, weight: f64) -> Edge {
        Edge::new(source, target, weight)
    }

    #[test]
    fn acyclic_input_is_untouched() {
        let edges = vec![edge("A", "B", 1.0), edge("B", "C", 1.0), edge("A", "C", 1.0)];
        let resolution = resolve_cycles(edges.clone(), 100);
        assert_eq!(resolution.edges, edges);
        assert!(resolution.removed.is_empty());
        assert!(resolution.warning.is_none());
    }

    #[test]
    fn removes_weakest_edge_of_cycle() {
        let edges = vec![edge("A", "B", 5.0), edge("B", "C", 2.0), edge("C", "A", 3.0)];
        let resolution = resolve_cycles(edges, 100);
        assert_eq!(resolution.removed.len(), 1);
        assert_eq!(resolution.removed[0].source, "B");
        assert_eq!(resolution.removed[0].target, "C");
        assert!(!has_cycle(&resolution.edges));
    }

    #[test]
    fn equal_weights_remove_greatest_pair() {
        let edges = vec![edge("A", "B", 1.0), edge("B", "A", 1.0)];
        let resolution = resolve_cycles(edges, 100);
        assert_eq!(resolution.removed.len(), 1);
        assert_eq!(resolution.removed[0].source, "B");
    }

    #[test]
    fn self_loops_are_cycles() {
        let resolution = resolve_cycles(vec![edge("A", "A", 1.0), edge("A", "B", 1.0)], 100);
        assert_eq!(resolution.edges, vec![edge("A", "B", 1.0)]);
    }

    #[test]
    fn only_the_cycle_segment_is_considered() {
        // X -> A is the weakest edge overall but is not part of the cycle.
        let edges = vec![
            edge("X", "A", 0.5),
            edge("A", "B", 4.0),
            edge("B", "C", 3.0),
            edge("C", "B", 6.0),
        ];
        let resolution = resolve_cycles(edges, 100);
        assert_eq!(resolution.removed, vec![edge("B", "C", 3.0)]);
    }

    #[test]
    fn exhausted_budget_degrades_to_acyclic() {
        let edges = vec![
            edge("A", "B", 1.0),
            edge("B", "A", 1.0),
            edge("C", "D", 1.0),
            edge("D", "C", 1.0),
        ];
        let resolution = resolve_cycles(edges, 1);
        assert!(!has_cycle(&resolution.edges));
        assert_eq!(resolution.edges.len(), 2);
        assert_eq!(
            resolution.warning,
            Some(Warning::CycleBudgetExhausted {
                iterations: 1,
                dropped: 1
            })
        );
    }

    #[test]
    fn zero_budget_still_returns_dag() {
        let edges = vec![edge("A", "B", 1.0), edge("B", "C", 1.0), edge("C", "A", 1.0)];
        let resolution = resolve_cycles(edges, 0);
        assert!(!has_cycle(&resolution.edges));
        assert!(resolution.warning.is_some());
    }

    #[test]
    fn long_chains_do_not_overflow() {
        let mut edges: Vec<Edge> = (0..50_000)
            .map(|i| edge(&format!("n{i:05}"), &format!("n{:05}", i + 1), 1.0))
            .collect();
        edges.push(edge("n50000", "n00000", 0.1));
        let resolution = resolve_cycles(edges, 100);
        assert_eq!(resolution.removed.len(), 1);
        assert_eq!(resolution.removed[0].source, "n50000");
    }
}
