//! Query module - one user question per pipeline run

/// A user question, created once per turn and immutable after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The question exactly as the user asked it
    pub raw_text: String,

    /// Retrieval-optimized rewrite of the question
    pub normalized_text: String,

    /// Optional department scope for retrieval
    pub department_filter: Option<String>,
}

impl Query {
    /// Create a query from raw user input.
    ///
    /// Until normalization runs, the normalized text is the raw text, so a
    /// query is always usable for retrieval.
    pub fn new(raw_text: impl Into<String>, department_filter: Option<String>) -> Self {
        let raw_text = raw_text.into();
        Self {
            normalized_text: raw_text.clone(),
            raw_text,
            department_filter,
        }
    }

    /// Attach the normalized rewrite, consuming the un-normalized query.
    ///
    /// A blank rewrite is ignored and the raw text is kept, so normalization
    /// can never make a query unusable.
    pub fn with_normalized(mut self, normalized: impl Into<String>) -> Self {
        let normalized = normalized.into();
        if !normalized.trim().is_empty() {
            self.normalized_text = normalized;
        }
        self
    }
}
