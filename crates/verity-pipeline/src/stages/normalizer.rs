//! Query normalization stage
//!
//! Rewrites the raw question into a retrieval-optimized query. This stage
//! can never fail the run: any provider error, timeout, or unusable model
//! output degrades to passing the raw text through unchanged.

use crate::prompts;
use crate::stages::generate_with_retries;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use verity_domain::traits::LanguageModel;
use verity_domain::Query;

/// Normalize a query. Always returns a usable query.
pub(crate) async fn normalize<L>(
    model: Arc<L>,
    query: Query,
    retry_budget: u32,
    backoff: Duration,
    deadline: Duration,
) -> Query
where
    L: LanguageModel + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    if query.raw_text.trim().is_empty() {
        return query;
    }

    let prompt = prompts::normalize_prompt(&query);
    match generate_with_retries(model, prompt, retry_budget, backoff, deadline).await {
        Ok(response) => {
            let rewritten = response.trim();
            if rewritten.is_empty() {
                debug!("Normalizer returned nothing; keeping raw question");
                query
            } else {
                // A rewrite much longer than the question is usually the
                // model explaining itself; keep the raw text instead.
                if rewritten.len() > query.raw_text.len().max(32) * 4 {
                    warn!("Normalizer output looks like prose; keeping raw question");
                    query
                } else {
                    debug!("Normalized query: {}", rewritten);
                    let rewritten = rewritten.to_string();
                    query.with_normalized(rewritten)
                }
            }
        }
        Err(e) => {
            warn!("Normalizer degraded to pass-through: {}", e);
            query
        }
    }
}
