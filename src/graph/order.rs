use std::collections::BTreeMap;

use crate::ir::Rank;

/// Earliest-seen position of every label across all sequences.
///
/// A label's rank is the smallest index at which it occurs in any sequence.
/// `min` is order independent, so shuffling the batch never changes ranks.
pub fn estimate_ranks<'a, I>(sequences: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut ranks: BTreeMap<String, usize> = BTreeMap::new();
    for sequence in sequences {
        for (idx, label) in sequence.iter().enumerate() {
            ranks
                .entry(label.clone())
                .and_modify(|rank| *rank = (*rank).min(idx))
                .or_insert(idx);
        }
    }
    ranks
}

pub fn rank_of(ranks: &BTreeMap<String, usize>, label: &str) -> Rank {
    ranks
        .get(label)
        .copied()
        .map(Rank::Seen)
        .unwrap_or(Rank::Unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    #[test]
    fn first_global_appearance_wins() {
        let sequences = [seq(&["A", "B", "C"]), seq(&["A", "B", "D"]), seq(&["A", "C", "B"])];
        let ranks = estimate_ranks(sequences.iter().map(Vec::as_slice));
        assert_eq!(ranks["A"], 0);
        assert_eq!(ranks["B"], 1);
        assert_eq!(ranks["C"], 1);
        assert_eq!(ranks["D"], 2);
    }

    #[test]
    fn batch_order_does_not_matter() {
        let forward = [seq(&["X", "Y", "Z"]), seq(&["Z", "Q"]), seq(&["Y", "X"])];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(
            estimate_ranks(forward.iter().map(Vec::as_slice)),
            estimate_ranks(reversed.iter().map(Vec::as_slice))
        );
    }

    #[test]
    fn unseen_labels_are_unassigned() {
        let ranks = estimate_ranks([seq(&["A", "B"])].iter().map(Vec::as_slice));
        assert_eq!(rank_of(&ranks, "B"), Rank::Seen(1));
        assert_eq!(rank_of(&ranks, "Z"), Rank::Unassigned);
    }
}
