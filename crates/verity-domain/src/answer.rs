//! Answer module - drafts and the terminal FinalAnswer artifact

use crate::passage::PassageId;
use crate::verdict::{Verdict, VerdictStatus};

/// One drafted answer, grounded in the run's evidence set. A run may
/// produce several drafts across retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftAnswer {
    /// The drafted answer text
    pub text: String,

    /// Which attempt produced this draft (1-based)
    pub attempt: u32,
}

impl DraftAnswer {
    /// Create a draft for the given attempt.
    pub fn new(text: impl Into<String>, attempt: u32) -> Self {
        Self {
            text: text.into(),
            attempt,
        }
    }
}

/// Per-status claim counts for one attempt, surfaced on the final answer so
/// uncertainty is visible rather than hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerificationSummary {
    /// Claims supported by the evidence
    pub supported: usize,

    /// Claims contradicted by the evidence
    pub contradicted: usize,

    /// Claims no passage addressed
    pub unverifiable: usize,

    /// Malformed claims dropped before verification
    pub dropped: usize,
}

impl VerificationSummary {
    /// Tally a verdict set, with `dropped` counting claims that never
    /// reached verification.
    pub fn from_verdicts(verdicts: &[Verdict], dropped: usize) -> Self {
        let mut summary = Self {
            dropped,
            ..Self::default()
        };
        for verdict in verdicts {
            match verdict.status {
                VerdictStatus::Supported => summary.supported += 1,
                VerdictStatus::Contradicted => summary.contradicted += 1,
                VerdictStatus::Unverifiable => summary.unverifiable += 1,
            }
        }
        summary
    }

    /// Total verified claims (excludes dropped ones).
    pub fn total(&self) -> usize {
        self.supported + self.contradicted + self.unverifiable
    }

    /// Fraction of verified claims that were unverifiable; 0.0 when there
    /// were no claims.
    pub fn unverifiable_fraction(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.unverifiable as f64 / self.total() as f64
        }
    }
}

/// The terminal artifact of one pipeline run. Immutable once emitted;
/// exactly one per fatal-error-free run.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalAnswer {
    /// The answer text delivered to the caller
    pub text: String,

    /// Aggregate confidence derived from the verdict set, in [0, 1]
    pub overall_confidence: f64,

    /// Passages actually cited, ordered by evidence rank. Always a subset
    /// of the supporting passages of the accepted attempt's verdicts.
    pub citations: Vec<PassageId>,

    /// Per-status claim counts for the accepted attempt
    pub summary: VerificationSummary,

    /// How many reasoning attempts the run used
    pub attempt_count: u32,

    /// False marks a degraded answer: unresolved contradictions or too many
    /// unverifiable claims after retries were exhausted
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimId;

    fn verdict(status: VerdictStatus) -> Verdict {
        Verdict::new(ClaimId::new(), status, 0.9, vec![])
    }

    #[test]
    fn test_summary_counts() {
        let verdicts = vec![
            verdict(VerdictStatus::Supported),
            verdict(VerdictStatus::Supported),
            verdict(VerdictStatus::Contradicted),
            verdict(VerdictStatus::Unverifiable),
        ];
        let summary = VerificationSummary::from_verdicts(&verdicts, 1);
        assert_eq!(summary.supported, 2);
        assert_eq!(summary.contradicted, 1);
        assert_eq!(summary.unverifiable, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_unverifiable_fraction() {
        let verdicts = vec![
            verdict(VerdictStatus::Supported),
            verdict(VerdictStatus::Unverifiable),
        ];
        let summary = VerificationSummary::from_verdicts(&verdicts, 0);
        assert!((summary.unverifiable_fraction() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unverifiable_fraction_empty() {
        let summary = VerificationSummary::default();
        assert_eq!(summary.unverifiable_fraction(), 0.0);
    }
}
