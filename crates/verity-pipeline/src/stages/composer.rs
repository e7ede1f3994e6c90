//! Answer composition stage
//!
//! Aggregates per-claim verdicts into one final answer. The decision policy
//! is deterministic and evaluated in order:
//! 1. any contradicted claim → reject the attempt
//! 2. unverifiable fraction above the threshold → reject the attempt
//! 3. otherwise accept
//!
//! A rejected attempt retries when the budget allows; otherwise the run
//! still emits exactly one FinalAnswer, degraded and visibly marked, with its
//! confidence capped below acceptance level.

use crate::config::PipelineConfig;
use std::collections::HashSet;
use tracing::info;
use verity_domain::{
    Claim, DraftAnswer, EvidenceSet, FinalAnswer, PassageId, Verdict, VerdictStatus,
    VerificationSummary,
};

/// Why an attempt was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// The evidence contradicts one or more claims
    Contradicted {
        /// Number of contradicted claims
        count: usize,
    },

    /// Too large a share of the claims could not be verified
    TooManyUnverifiable {
        /// Observed unverifiable fraction
        fraction: f64,
        /// Configured threshold
        threshold: f64,
    },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::Contradicted { count } => {
                write!(f, "{} claim(s) contradicted by the evidence", count)
            }
            RejectionReason::TooManyUnverifiable { fraction, threshold } => write!(
                f,
                "{:.0}% of claims unverifiable (threshold {:.0}%)",
                fraction * 100.0,
                threshold * 100.0
            ),
        }
    }
}

/// Outcome of evaluating one attempt's verdicts.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Accept the draft as the final answer
    Accept,

    /// Reject the draft; retry if the budget allows
    Retry {
        /// Why the attempt was rejected
        reasons: Vec<RejectionReason>,
        /// Claim texts to flag in the next drafting prompt
        flagged: Vec<String>,
    },
}

/// Apply the decision policy to one attempt.
pub(crate) fn evaluate(
    claims: &[Claim],
    verdicts: &[Verdict],
    config: &PipelineConfig,
) -> Disposition {
    let summary = VerificationSummary::from_verdicts(verdicts, 0);

    if summary.contradicted > 0 {
        let flagged = claim_texts_with_status(claims, verdicts, VerdictStatus::Contradicted);
        return Disposition::Retry {
            reasons: vec![RejectionReason::Contradicted {
                count: summary.contradicted,
            }],
            flagged,
        };
    }

    let fraction = summary.unverifiable_fraction();
    if summary.total() > 0 && fraction > config.unverifiable_threshold {
        let flagged = claim_texts_with_status(claims, verdicts, VerdictStatus::Unverifiable);
        return Disposition::Retry {
            reasons: vec![RejectionReason::TooManyUnverifiable {
                fraction,
                threshold: config.unverifiable_threshold,
            }],
            flagged,
        };
    }

    Disposition::Accept
}

/// Compose the final answer for an accepted attempt.
pub(crate) fn accept(
    draft: &DraftAnswer,
    verdicts: &[Verdict],
    evidence: &EvidenceSet,
    config: &PipelineConfig,
    dropped_claims: usize,
) -> FinalAnswer {
    let summary = VerificationSummary::from_verdicts(verdicts, dropped_claims);
    let overall_confidence = config
        .aggregation
        .aggregate(verdicts, config.no_claims_confidence);

    info!(
        "Accepted attempt {}: {} supported, {} unverifiable, confidence {:.2}",
        draft.attempt, summary.supported, summary.unverifiable, overall_confidence
    );

    FinalAnswer {
        text: draft.text.clone(),
        overall_confidence,
        citations: collect_citations(verdicts, evidence),
        summary,
        attempt_count: draft.attempt,
        verified: true,
    }
}

/// Compose a degraded final answer once retries are exhausted.
///
/// The degraded answer keeps the draft text but appends an explicit
/// unverified notice, and its confidence is capped below acceptance level.
pub(crate) fn degrade(
    draft: &DraftAnswer,
    claims: &[Claim],
    verdicts: &[Verdict],
    evidence: &EvidenceSet,
    config: &PipelineConfig,
    dropped_claims: usize,
    reasons: &[RejectionReason],
) -> FinalAnswer {
    let summary = VerificationSummary::from_verdicts(verdicts, dropped_claims);
    let aggregate = config
        .aggregation
        .aggregate(verdicts, config.no_claims_confidence);
    let overall_confidence = aggregate.min(config.degraded_confidence_cap);

    let mut text = draft.text.clone();
    text.push_str("\n\n[UNVERIFIED] This answer could not be fully verified: ");
    let reason_list: Vec<String> = reasons.iter().map(|r| r.to_string()).collect();
    text.push_str(&reason_list.join("; "));
    text.push('.');
    let contradicted = claim_texts_with_status(claims, verdicts, VerdictStatus::Contradicted);
    if !contradicted.is_empty() {
        text.push_str("\nStatements in question:\n");
        for claim_text in &contradicted {
            text.push_str(&format!("- {}\n", claim_text));
        }
    }

    info!(
        "Degraded answer after attempt {}: {} contradicted, {} unverifiable, confidence {:.2}",
        draft.attempt, summary.contradicted, summary.unverifiable, overall_confidence
    );

    FinalAnswer {
        text,
        overall_confidence,
        citations: collect_citations(verdicts, evidence),
        summary,
        attempt_count: draft.attempt,
        verified: false,
    }
}

/// Citations are the union of supporting passages across supported
/// verdicts, ordered by evidence rank. A passage outside the evidence set
/// can never appear: supporting ids are derived from the set itself.
fn collect_citations(verdicts: &[Verdict], evidence: &EvidenceSet) -> Vec<PassageId> {
    let cited: HashSet<&PassageId> = verdicts
        .iter()
        .filter(|v| v.is_supported())
        .flat_map(|v| v.supporting_passages.iter())
        .collect();

    evidence
        .passages()
        .iter()
        .map(|p| p.identity())
        .filter(|id| cited.contains(id))
        .collect()
}

fn claim_texts_with_status(
    claims: &[Claim],
    verdicts: &[Verdict],
    status: VerdictStatus,
) -> Vec<String> {
    verdicts
        .iter()
        .filter(|v| v.status == status)
        .filter_map(|v| claims.iter().find(|c| c.id == v.claim_id))
        .map(|c| c.text.clone())
        .collect()
}
