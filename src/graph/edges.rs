use std::collections::BTreeMap;

use super::NormalizedTrace;
use super::order::rank_of;
use crate::ir::{Edge, TraceOrigin};

/// A single observed transition before filtering and deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCandidate<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub weight: f64,
    pub issue_count: u64,
    /// Position of the originating trace in the normalized batch.
    pub trace: usize,
}

/// Emits one candidate per consecutive pair of every sequence.
pub fn aggregate_edges(traces: &[NormalizedTrace]) -> Vec<EdgeCandidate<'_>> {
    let mut candidates = Vec::new();
    for (trace_idx, trace) in traces.iter().enumerate() {
        for pair in trace.labels.windows(2) {
            let (source, target) = (pair[0].as_str(), pair[1].as_str());
            if source == target {
                tracing::debug!(label = source, "discarding self-loop candidate");
                continue;
            }
            candidates.push(EdgeCandidate {
                source,
                target,
                weight: trace.weight,
                issue_count: trace.issue_count,
                trace: trace_idx,
            });
        }
    }
    candidates
}

/// Keeps candidates whose rank strictly increases along the edge.
pub fn retain_forward<'a>(
    candidates: Vec<EdgeCandidate<'a>>,
    ranks: &BTreeMap<String, usize>,
) -> Vec<EdgeCandidate<'a>> {
    let before = candidates.len();
    let kept: Vec<EdgeCandidate<'a>> = candidates
        .into_iter()
        .filter(|candidate| rank_of(ranks, candidate.source) < rank_of(ranks, candidate.target))
        .collect();
    if kept.len() < before {
        tracing::debug!(
            dropped = before - kept.len(),
            kept = kept.len(),
            "dropped transitions that do not move forward in rank"
        );
    }
    kept
}

/// Collapses parallel candidates to the strongest one.
///
/// Winner per `(source, target)`: highest weight, then the lexicographically
/// smallest origin sequence, then the highest issue count, then the earliest
/// trace. Only the last key depends on input order, and it is reached only
/// when the competing traces are identical in content.
pub fn dedupe_edges(mut candidates: Vec<EdgeCandidate<'_>>, traces: &[NormalizedTrace]) -> Vec<Edge> {
    candidates.sort_by(|a, b| {
        let (trace_a, trace_b) = (&traces[a.trace], &traces[b.trace]);
        (a.source, a.target)
            .cmp(&(b.source, b.target))
            .then_with(|| b.weight.total_cmp(&a.weight))
            .then_with(|| trace_a.labels.cmp(&trace_b.labels))
            .then_with(|| b.issue_count.cmp(&a.issue_count))
            .then_with(|| trace_a.index.cmp(&trace_b.index))
    });
    candidates.dedup_by(|later, kept| later.source == kept.source && later.target == kept.target);

    candidates
        .into_iter()
        .map(|candidate| {
            let trace = &traces[candidate.trace];
            Edge {
                source: candidate.source.to_string(),
                target: candidate.target.to_string(),
                weight: candidate.weight,
                issue_count: candidate.issue_count,
                origin: Some(TraceOrigin {
                    labels: trace.labels.clone(),
                    weight: trace.weight,
                    issue_count: trace.issue_count,
                }),
            }
        })
        .collect()
}

/// Same collapse for caller-built edge lists; equal weights keep the edge
/// that came first in the input.
pub fn dedupe_prebuilt(mut edges: Vec<Edge>) -> Vec<Edge> {
    edges.sort_by(|a, b| {
        (&a.source, &a.target)
            .cmp(&(&b.source, &b.target))
            .then_with(|| b.weight.total_cmp(&a.weight))
    });
    edges.dedup_by(|later, kept| later.source == kept.source && later.target == kept.target);
    edges
}
