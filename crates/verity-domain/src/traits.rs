//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the pipeline and its
//! infrastructure: the evidence store, the reranking model, and the
//! language-model backend. Implementations live in other crates; the
//! pipeline is testable entirely against deterministic stubs.

use crate::passage::{Passage, PassageId};

/// Similarity search over the document corpus.
///
/// Implemented by the infrastructure layer (verity-evidence).
pub trait EvidenceStore {
    /// Error type for store operations
    type Error;

    /// Return the top-`k` passages for a query, ordered by similarity
    /// descending, optionally restricted to one department.
    ///
    /// An empty result means "no matches". Unavailability must be reported
    /// as an `Err`, never as an empty list; the pipeline treats the two
    /// very differently.
    fn search(
        &self,
        query: &str,
        k: usize,
        department: Option<&str>,
    ) -> Result<Vec<Passage>, Self::Error>;
}

/// Fine-grained relevance scoring of retrieved passages.
///
/// Implemented by the infrastructure layer (verity-llm).
pub trait RerankModel {
    /// Error type for reranking operations
    type Error;

    /// Score each passage's relevance to the query.
    ///
    /// A valid all-zero scoring and a failed scoring are distinct outcomes:
    /// failure must be an `Err`, which the pipeline degrades to retrieval
    /// order rather than treating as zeros.
    fn score(
        &self,
        query: &str,
        passages: &[Passage],
    ) -> Result<Vec<(PassageId, f64)>, Self::Error>;
}

/// Text generation backend shared by the drafting, claim-extraction,
/// fact-checking, and query-normalization prompts.
///
/// Implemented by the infrastructure layer (verity-llm). Providers may
/// retry transport failures internally, but stage-level retry policy
/// belongs to the orchestrator.
pub trait LanguageModel {
    /// Error type for model operations
    type Error;

    /// Generate a completion for the prompt.
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;
}
