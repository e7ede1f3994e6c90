//! Reasoning stage
//!
//! Drafts an answer grounded only in the evidence passages. Grounding is a
//! soft constraint here; the fact checker enforces it downstream. Provider
//! failure after the local retry budget is run-fatal.

use crate::error::PipelineError;
use crate::prompts;
use crate::stages::generate_with_retries;
use crate::state::PipelineState;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use verity_domain::traits::LanguageModel;
use verity_domain::{DraftAnswer, EvidenceSet, Query};

/// Draft an answer for the given attempt.
///
/// `flagged_claims` carries the claims rejected by verification in the
/// previous attempt; the prompt instructs the model to avoid them.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn draft<L>(
    model: Arc<L>,
    query: &Query,
    evidence: &EvidenceSet,
    flagged_claims: &[String],
    attempt: u32,
    retry_budget: u32,
    backoff: Duration,
    deadline: Duration,
) -> Result<DraftAnswer, PipelineError>
where
    L: LanguageModel + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let prompt = prompts::draft_prompt(query, evidence, flagged_claims);
    let text = generate_with_retries(model, prompt, retry_budget, backoff, deadline)
        .await
        .map_err(|detail| PipelineError::ModelUnavailable {
            stage: PipelineState::Reasoning,
            detail,
        })?;

    debug!("Drafted answer for attempt {} ({} chars)", attempt, text.len());
    Ok(DraftAnswer::new(text.trim(), attempt))
}
