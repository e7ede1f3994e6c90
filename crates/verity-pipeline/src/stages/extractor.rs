//! Claim extraction stage
//!
//! Decomposes a drafted answer into atomic, self-contained claims. An
//! unparseable model response is retried within the local budget and then
//! run-fatal; an individual malformed claim entry is dropped and counted,
//! never fatal. Zero claims is a valid outcome.

use crate::error::PipelineError;
use crate::parser;
use crate::prompts;
use crate::stages::generate_with_retries;
use crate::state::PipelineState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use verity_domain::traits::LanguageModel;
use verity_domain::{Claim, DraftAnswer};

/// Extract claims from a draft. Returns the claims in draft order plus the
/// number of malformed entries dropped.
pub(crate) async fn extract<L>(
    model: Arc<L>,
    draft: &DraftAnswer,
    retry_budget: u32,
    backoff: Duration,
    deadline: Duration,
) -> Result<(Vec<Claim>, usize), PipelineError>
where
    L: LanguageModel + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let prompt = prompts::extract_prompt(&draft.text);

    // A response that fails to parse is treated like a failed call: the
    // model gets another chance within the same local budget.
    let attempts = retry_budget + 1;
    let mut last_error = String::new();
    for attempt in 0..attempts {
        let response = generate_with_retries(
            Arc::clone(&model),
            prompt.clone(),
            0,
            backoff,
            deadline,
        )
        .await;

        match response.and_then(|r| parser::parse_claim_texts(&r)) {
            Ok((texts, dropped)) => {
                if dropped > 0 {
                    warn!("Dropped {} malformed claim entries", dropped);
                }
                let claims: Vec<Claim> = texts
                    .into_iter()
                    .map(|text| Claim::new(text, draft.attempt))
                    .collect();
                info!("Extracted {} claims from attempt {}", claims.len(), draft.attempt);
                return Ok((claims, dropped));
            }
            Err(e) => {
                warn!("Claim extraction failed (attempt {}/{}): {}", attempt + 1, attempts, e);
                last_error = e;
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(backoff * 2u32.pow(attempt)).await;
        }
    }

    Err(PipelineError::ModelUnavailable {
        stage: PipelineState::Extracting,
        detail: last_error,
    })
}
