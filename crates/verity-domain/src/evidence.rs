//! EvidenceSet module - the ranked passage set grounding one run

use crate::passage::{Passage, PassageId};
use std::collections::HashSet;

/// The ranked, deduplicated set of passages used to ground one reasoning
/// attempt.
///
/// Invariants, enforced by [`EvidenceSet::assemble`]:
/// - passages are unique by identity key
/// - passages are sorted by effective score descending, with a stable
///   tie-break on the order they were handed in (retrieval rank)
/// - size is bounded by the configured maximum
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvidenceSet {
    passages: Vec<Passage>,
}

impl EvidenceSet {
    /// Build an evidence set from ranked candidates.
    ///
    /// Duplicates (by identity key) keep their first occurrence; the result
    /// is sorted by effective score descending and truncated to `max_size`.
    pub fn assemble(candidates: Vec<Passage>, max_size: usize) -> Self {
        let mut seen: HashSet<PassageId> = HashSet::new();
        let mut passages: Vec<Passage> = candidates
            .into_iter()
            .filter(|p| seen.insert(p.identity()))
            .collect();

        // sort_by is stable, so equal scores keep their incoming order
        passages.sort_by(|a, b| {
            b.effective_score()
                .partial_cmp(&a.effective_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(max_size);

        Self { passages }
    }

    /// Passages in rank order.
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// Look up a passage by its identity key.
    pub fn get(&self, id: &PassageId) -> Option<&Passage> {
        self.passages.iter().find(|p| &p.identity() == id)
    }

    /// Whether the set contains a passage with this identity.
    pub fn contains(&self, id: &PassageId) -> bool {
        self.get(id).is_some()
    }

    /// Rank of a passage within the set (0 = most relevant).
    pub fn rank_of(&self, id: &PassageId) -> Option<usize> {
        self.passages.iter().position(|p| &p.identity() == id)
    }

    /// Number of passages in the set.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passage::SourceLocation;

    fn passage(text: &str, doc: &str, sim: f64, rerank: Option<f64>) -> Passage {
        let mut p = Passage::new(text, doc, SourceLocation::default(), sim);
        p.rerank_score = rerank;
        p
    }

    #[test]
    fn test_assemble_sorts_by_score_descending() {
        let set = EvidenceSet::assemble(
            vec![
                passage("a", "d1", 0.1, Some(0.3)),
                passage("b", "d2", 0.2, Some(0.9)),
                passage("c", "d3", 0.3, Some(0.6)),
            ],
            10,
        );
        let scores: Vec<f64> = set.passages().iter().map(|p| p.effective_score()).collect();
        assert_eq!(scores, vec![0.9, 0.6, 0.3]);
    }

    #[test]
    fn test_assemble_dedups_by_identity() {
        let set = EvidenceSet::assemble(
            vec![
                passage("same text", "doc", 0.9, Some(0.9)),
                passage("same text", "doc", 0.1, Some(0.1)),
                passage("other text", "doc", 0.5, Some(0.5)),
            ],
            10,
        );
        assert_eq!(set.len(), 2);
        // First occurrence wins
        assert_eq!(set.passages()[0].effective_score(), 0.9);
    }

    #[test]
    fn test_assemble_truncates() {
        let candidates = (0..8)
            .map(|i| passage(&format!("p{}", i), "doc", 0.5, Some(i as f64 / 10.0)))
            .collect();
        let set = EvidenceSet::assemble(candidates, 3);
        assert_eq!(set.len(), 3);
        assert_eq!(set.passages()[0].effective_score(), 0.7);
    }

    #[test]
    fn test_stable_tie_break() {
        let set = EvidenceSet::assemble(
            vec![
                passage("first", "doc", 0.5, Some(0.5)),
                passage("second", "doc", 0.5, Some(0.5)),
            ],
            10,
        );
        assert_eq!(set.passages()[0].text, "first");
        assert_eq!(set.passages()[1].text, "second");
    }

    #[test]
    fn test_rank_and_lookup() {
        let p = passage("needle", "doc", 0.5, Some(0.5));
        let id = p.identity();
        let set = EvidenceSet::assemble(vec![passage("other", "doc", 0.9, Some(0.9)), p], 10);
        assert_eq!(set.rank_of(&id), Some(1));
        assert!(set.contains(&id));
        assert_eq!(set.get(&id).unwrap().text, "needle");
    }
}
