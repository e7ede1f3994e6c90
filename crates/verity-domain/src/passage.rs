//! Passage module - retrieved source text with provenance

use std::fmt;
use std::hash::{Hash, Hasher};

/// Location of a passage within its source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    /// Page number, if the source is paginated
    pub page: Option<u32>,

    /// Section heading or chunk label, if known
    pub section: Option<String>,
}

impl SourceLocation {
    /// Location given by page number only.
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            section: None,
        }
    }

    /// Location given by section label only.
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            page: None,
            section: Some(section.into()),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.page, &self.section) {
            (Some(p), Some(s)) => write!(f, "p.{} §{}", p, s),
            (Some(p), None) => write!(f, "p.{}", p),
            (None, Some(s)) => write!(f, "§{}", s),
            (None, None) => write!(f, "-"),
        }
    }
}

/// Identity key of a passage: `(source_document, source_location, text_hash)`.
///
/// The same text retrieved twice, even through different stages, maps to
/// the same key, which is what evidence deduplication and citations rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassageId {
    /// Source document identifier (title or path)
    pub source_document: String,

    /// Rendered source location
    pub location: String,

    /// Stable 64-bit hash of the passage text
    pub text_hash: u64,
}

impl fmt::Display for PassageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}#{:016x}",
            self.source_document, self.location, self.text_hash
        )
    }
}

/// A retrieved unit of source text.
///
/// Immutable once retrieved; the reranker enriches a copy with a
/// `rerank_score` rather than mutating stored passages.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    /// The passage text
    pub text: String,

    /// Source document identifier
    pub source_document: String,

    /// Where in the document the text came from
    pub location: SourceLocation,

    /// Similarity score assigned by the evidence store
    pub similarity_score: f64,

    /// Finer-grained relevance score assigned by the reranker, if any
    pub rerank_score: Option<f64>,
}

impl Passage {
    /// Create a freshly retrieved passage (no rerank score yet).
    pub fn new(
        text: impl Into<String>,
        source_document: impl Into<String>,
        location: SourceLocation,
        similarity_score: f64,
    ) -> Self {
        Self {
            text: text.into(),
            source_document: source_document.into(),
            location,
            similarity_score,
            rerank_score: None,
        }
    }

    /// Derive the identity key for this passage.
    pub fn identity(&self) -> PassageId {
        PassageId {
            source_document: self.source_document.clone(),
            location: self.location.to_string(),
            text_hash: stable_text_hash(&self.text),
        }
    }

    /// The score the passage is ranked by: rerank score when present,
    /// retrieval similarity otherwise.
    pub fn effective_score(&self) -> f64 {
        self.rerank_score.unwrap_or(self.similarity_score)
    }
}

/// Stable hash of passage text.
///
/// Uses SipHash with fixed keys so the same text hashes identically across
/// processes; passage identities (and therefore citations) must be
/// reproducible for identical inputs.
pub fn stable_text_hash(text: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_same_text_same_key() {
        let a = Passage::new("SLA is 99.9%", "handbook.txt", SourceLocation::page(3), 0.9);
        let b = Passage::new("SLA is 99.9%", "handbook.txt", SourceLocation::page(3), 0.4);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_differs_by_text() {
        let a = Passage::new("SLA is 99.9%", "handbook.txt", SourceLocation::page(3), 0.9);
        let b = Passage::new("SLA is 99.5%", "handbook.txt", SourceLocation::page(3), 0.9);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_differs_by_location() {
        let a = Passage::new("Refunds in 30 days", "policy.md", SourceLocation::page(1), 0.8);
        let b = Passage::new("Refunds in 30 days", "policy.md", SourceLocation::page(2), 0.8);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_effective_score_prefers_rerank() {
        let mut p = Passage::new("text", "doc", SourceLocation::default(), 0.4);
        assert_eq!(p.effective_score(), 0.4);
        p.rerank_score = Some(0.95);
        assert_eq!(p.effective_score(), 0.95);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(SourceLocation::page(7).to_string(), "p.7");
        assert_eq!(SourceLocation::section("Refunds").to_string(), "§Refunds");
        assert_eq!(SourceLocation::default().to_string(), "-");
    }

    #[test]
    fn test_stable_hash_is_deterministic() {
        // Fixed-key SipHash: the same input must always produce the same value
        assert_eq!(stable_text_hash("abc"), stable_text_hash("abc"));
        assert_ne!(stable_text_hash("abc"), stable_text_hash("abd"));
    }
}
