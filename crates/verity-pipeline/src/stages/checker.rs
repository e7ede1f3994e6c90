//! Fact-checking stage
//!
//! Judges each claim against the evidence set. Claims are independent, so
//! checks fan out concurrently (one task per claim) and join before the
//! verdict set is recombined in claim order.
//!
//! The model labels each passage supports/contradicts/silent; the status
//! derivation itself is deterministic code:
//! - any contradicting passage → Contradicted (precedence over support)
//! - else any supporting passage → Supported
//! - else → Unverifiable

use crate::error::PipelineError;
use crate::parser::{self, PassageRelation};
use crate::prompts;
use crate::stages::generate_with_retries;
use crate::state::PipelineState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use verity_domain::traits::LanguageModel;
use verity_domain::{Claim, EvidenceSet, Verdict, VerdictStatus};

/// Check every claim against the evidence, concurrently.
///
/// Returns one verdict per claim, in claim order. A model failure (or an
/// unparseable response) after the local retry budget fails the run.
pub(crate) async fn check<L>(
    model: Arc<L>,
    claims: &[Claim],
    evidence: &EvidenceSet,
    retry_budget: u32,
    backoff: Duration,
    deadline: Duration,
) -> Result<Vec<Verdict>, PipelineError>
where
    L: LanguageModel + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    if claims.is_empty() {
        return Ok(Vec::new());
    }

    let mut tasks = JoinSet::new();
    for (index, claim) in claims.iter().enumerate() {
        let model = Arc::clone(&model);
        let claim = claim.clone();
        let evidence = evidence.clone();
        tasks.spawn(async move {
            let verdict =
                check_one(model, &claim, &evidence, retry_budget, backoff, deadline).await;
            (index, verdict)
        });
    }

    let mut verdicts: Vec<Option<Verdict>> = vec![None; claims.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, verdict) = joined.map_err(|e| PipelineError::ModelUnavailable {
            stage: PipelineState::Checking,
            detail: format!("check task failed: {}", e),
        })?;
        verdicts[index] = Some(verdict?);
    }

    // Every slot was filled exactly once by its task
    Ok(verdicts.into_iter().flatten().collect())
}

/// Check a single claim.
async fn check_one<L>(
    model: Arc<L>,
    claim: &Claim,
    evidence: &EvidenceSet,
    retry_budget: u32,
    backoff: Duration,
    deadline: Duration,
) -> Result<Verdict, PipelineError>
where
    L: LanguageModel + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    // No evidence can address any claim
    if evidence.is_empty() {
        return Ok(Verdict::new(claim.id, VerdictStatus::Unverifiable, 0.0, vec![]));
    }

    let prompt = prompts::check_prompt(&claim.text, evidence);

    let attempts = retry_budget + 1;
    let mut last_error = String::new();
    for attempt in 0..attempts {
        let response =
            generate_with_retries(Arc::clone(&model), prompt.clone(), 0, backoff, deadline).await;

        match response.and_then(|r| parser::parse_claim_check(&r, evidence.len())) {
            Ok(check) => return Ok(derive_verdict(claim, evidence, check)),
            Err(e) => {
                warn!(
                    "Fact check failed for claim {} (attempt {}/{}): {}",
                    claim.id,
                    attempt + 1,
                    attempts,
                    e
                );
                last_error = e;
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(backoff * 2u32.pow(attempt)).await;
        }
    }

    Err(PipelineError::ModelUnavailable {
        stage: PipelineState::Checking,
        detail: last_error,
    })
}

/// Derive the verdict from per-passage judgments. Contradiction takes
/// precedence over support; supporting passages are listed in evidence
/// rank order.
fn derive_verdict(claim: &Claim, evidence: &EvidenceSet, check: parser::ClaimCheck) -> Verdict {
    let mut supporting_ranks: Vec<usize> = Vec::new();
    let mut contradicted = false;

    for (rank, relation) in &check.judgments {
        match relation {
            PassageRelation::Contradicts => contradicted = true,
            PassageRelation::Supports => {
                if !supporting_ranks.contains(rank) {
                    supporting_ranks.push(*rank);
                }
            }
            PassageRelation::Silent => {}
        }
    }

    let status = if contradicted {
        VerdictStatus::Contradicted
    } else if !supporting_ranks.is_empty() {
        VerdictStatus::Supported
    } else {
        VerdictStatus::Unverifiable
    };

    let supporting_passages = if status == VerdictStatus::Supported {
        supporting_ranks.sort_unstable();
        supporting_ranks
            .into_iter()
            .filter_map(|rank| evidence.passages().get(rank).map(|p| p.identity()))
            .collect()
    } else {
        Vec::new()
    };

    debug!("Claim {} judged {}", claim.id, status);
    Verdict::new(claim.id, status, check.confidence, supporting_passages)
}
