//! Reranking model providers
//!
//! The pipeline consumes reranking scores through the `RerankModel` trait;
//! this module provides a deterministic mock and a prompt-based
//! implementation that rides on any `LanguageModel`.

use crate::LlmError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use verity_domain::traits::{LanguageModel, RerankModel};
use verity_domain::{Passage, PassageId};

/// Deterministic reranking stub for tests.
///
/// Scores are looked up by passage text; unscored passages fall back to
/// their retrieval similarity, so an unconfigured mock is a pass-through.
#[derive(Clone, Default)]
pub struct MockReranker {
    scores: Arc<Mutex<HashMap<String, f64>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockReranker {
    /// Create a pass-through reranker (scores mirror retrieval similarity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a rerank score to the passage with exactly this text.
    pub fn set_score(&self, text: impl Into<String>, score: f64) {
        self.scores.lock().unwrap().insert(text.into(), score);
    }

    /// Make every subsequent `score` call fail, to exercise the pipeline's
    /// degraded-rerank fallback.
    pub fn set_unavailable(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

impl RerankModel for MockReranker {
    type Error = LlmError;

    fn score(
        &self,
        _query: &str,
        passages: &[Passage],
    ) -> Result<Vec<(PassageId, f64)>, Self::Error> {
        if *self.fail.lock().unwrap() {
            return Err(LlmError::Communication("Mock reranker unavailable".to_string()));
        }
        let scores = self.scores.lock().unwrap();
        Ok(passages
            .iter()
            .map(|p| {
                let score = scores.get(&p.text).copied().unwrap_or(p.similarity_score);
                (p.identity(), score)
            })
            .collect())
    }
}

/// One scored entry in the reranking model's JSON reply.
#[derive(Debug, Deserialize)]
struct ScoredIndex {
    index: usize,
    score: f64,
}

/// Reranks passages by prompting a language model to score each one.
///
/// The passages are listed with indices; the model replies with a JSON
/// array of `{"index": n, "score": s}` entries. Entries with unknown
/// indices are ignored; a missing entry leaves that passage at score 0.0.
pub struct PromptReranker<L> {
    model: Arc<L>,
}

impl<L> PromptReranker<L>
where
    L: LanguageModel,
    L::Error: std::fmt::Display,
{
    /// Wrap a language model as a reranker.
    pub fn new(model: Arc<L>) -> Self {
        Self { model }
    }

    fn build_prompt(query: &str, passages: &[Passage]) -> String {
        let mut prompt = String::from(RERANK_INSTRUCTIONS);
        prompt.push_str("\n\nQuestion: ");
        prompt.push_str(query);
        prompt.push_str("\n\nPassages:\n");
        for (i, passage) in passages.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i, passage.text));
        }
        prompt.push_str("\nOutput format (JSON array only):\n");
        prompt.push_str(r#"[{"index": 0, "score": 0.0}]"#);
        prompt
    }
}

const RERANK_INSTRUCTIONS: &str = "Score each passage for how directly it helps answer \
the question, from 0.0 (irrelevant) to 10.0 (directly answers it). \
Score every passage.";

impl<L> RerankModel for PromptReranker<L>
where
    L: LanguageModel,
    L::Error: std::fmt::Display,
{
    type Error = LlmError;

    fn score(
        &self,
        query: &str,
        passages: &[Passage],
    ) -> Result<Vec<(PassageId, f64)>, Self::Error> {
        let prompt = Self::build_prompt(query, passages);
        let response = self
            .model
            .generate(&prompt)
            .map_err(|e| LlmError::Communication(e.to_string()))?;

        let json = crate::ollama::strip_code_fences(&response);
        let scored: Vec<ScoredIndex> = serde_json::from_str(json.trim())
            .map_err(|e| LlmError::InvalidResponse(format!("Rerank parse error: {}", e)))?;

        let mut out: Vec<(PassageId, f64)> =
            passages.iter().map(|p| (p.identity(), 0.0)).collect();
        for entry in scored {
            if let Some(slot) = out.get_mut(entry.index) {
                slot.1 = entry.score;
            }
        }
        Ok(out)
    }
}
