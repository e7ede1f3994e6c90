//! Reranking stage
//!
//! Re-scores the K retrieved candidates with a finer relevance signal and
//! keeps the top N. Reranking is a quality refinement, not a correctness
//! requirement: if the signal is unavailable the stage falls back to
//! retrieval order, logged as degraded, never fatal.

use crate::stages::blocking_call;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use verity_domain::traits::RerankModel;
use verity_domain::{EvidenceSet, Passage, PassageId, Query};

/// Rerank candidates into the run's evidence set.
///
/// Returns the assembled evidence set and whether the stage ran degraded
/// (fell back to retrieval order).
pub(crate) async fn rerank<R>(
    model: Arc<R>,
    query: &Query,
    candidates: Vec<Passage>,
    n: usize,
    deadline: Duration,
) -> (EvidenceSet, bool)
where
    R: RerankModel + Send + Sync + 'static,
    R::Error: std::fmt::Display,
{
    if candidates.is_empty() {
        return (EvidenceSet::default(), false);
    }

    let search_text = query.normalized_text.clone();
    let call_candidates = candidates.clone();
    let call_model = Arc::clone(&model);
    let scores = blocking_call(deadline, move || {
        call_model
            .score(&search_text, &call_candidates)
            .map_err(|e| e.to_string())
    })
    .await;

    match scores {
        Ok(scores) => {
            let by_id: HashMap<PassageId, f64> = scores.into_iter().collect();
            let rescored: Vec<Passage> = candidates
                .into_iter()
                .map(|mut p| {
                    // A passage the model did not score ranks last, not at
                    // its retrieval score
                    p.rerank_score = Some(by_id.get(&p.identity()).copied().unwrap_or(0.0));
                    p
                })
                .collect();
            let evidence = EvidenceSet::assemble(rescored, n);
            debug!("Reranked evidence set of {} passages", evidence.len());
            (evidence, false)
        }
        Err(e) => {
            warn!("Reranker unavailable, falling back to retrieval order: {}", e);
            let fallback: Vec<Passage> = candidates
                .into_iter()
                .map(|mut p| {
                    p.rerank_score = Some(p.similarity_score);
                    p
                })
                .collect();
            (EvidenceSet::assemble(fallback, n), true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_domain::SourceLocation;
    use verity_llm::MockReranker;

    fn passage(text: &str, sim: f64) -> Passage {
        Passage::new(text, "doc", SourceLocation::default(), sim)
    }

    #[tokio::test]
    async fn test_rerank_reorders_by_model_score() {
        let reranker = MockReranker::new();
        reranker.set_score("low similarity, high relevance", 0.95);
        reranker.set_score("high similarity, low relevance", 0.10);

        let candidates = vec![
            passage("high similarity, low relevance", 0.9),
            passage("low similarity, high relevance", 0.2),
        ];
        let query = Query::new("q", None);
        let (evidence, degraded) =
            rerank(Arc::new(reranker), &query, candidates, 5, Duration::from_secs(1)).await;

        assert!(!degraded);
        assert_eq!(evidence.passages()[0].text, "low similarity, high relevance");
        assert_eq!(evidence.passages()[0].rerank_score, Some(0.95));
    }

    #[tokio::test]
    async fn test_rerank_truncates_to_n() {
        let reranker = MockReranker::new();
        let candidates = (0..5)
            .map(|i| passage(&format!("passage {}", i), 0.5 + i as f64 / 100.0))
            .collect();
        let query = Query::new("q", None);
        let (evidence, _) =
            rerank(Arc::new(reranker), &query, candidates, 3, Duration::from_secs(1)).await;
        assert_eq!(evidence.len(), 3);
    }

    #[tokio::test]
    async fn test_rerank_failure_degrades_to_retrieval_order() {
        let reranker = MockReranker::new();
        reranker.set_unavailable();

        let candidates = vec![passage("first", 0.9), passage("second", 0.5)];
        let query = Query::new("q", None);
        let (evidence, degraded) =
            rerank(Arc::new(reranker), &query, candidates, 5, Duration::from_secs(1)).await;

        assert!(degraded);
        assert_eq!(evidence.passages()[0].text, "first");
        assert_eq!(evidence.passages()[0].rerank_score, Some(0.9));
    }

    #[tokio::test]
    async fn test_rerank_empty_candidates() {
        let reranker = MockReranker::new();
        let query = Query::new("q", None);
        let (evidence, degraded) =
            rerank(Arc::new(reranker), &query, vec![], 5, Duration::from_secs(1)).await;
        assert!(evidence.is_empty());
        assert!(!degraded);
    }
}
