//! Overall-confidence aggregation policies
//!
//! How per-claim verdict confidences combine into one overall confidence is
//! a policy choice, kept behind a single interface so the formula can be
//! swapped without touching the composer. Whatever the policy, the result
//! is a deterministic function of the verdict set, never hand-set.

use crate::verdict::Verdict;

/// Aggregates per-claim verdict confidences into one overall confidence.
///
/// Implementations must be deterministic and monotonic: raising any
/// supported verdict's confidence must never lower the aggregate.
pub trait ConfidenceAggregator {
    /// Aggregate the supported verdicts' confidences into a value in [0, 1].
    ///
    /// `no_claims_confidence` is returned when the verdict set contains no
    /// supported verdicts (including the empty set, a draft with nothing
    /// to verify).
    fn aggregate(&self, verdicts: &[Verdict], no_claims_confidence: f64) -> f64;
}

/// Conservative bound: the minimum confidence among supported verdicts.
///
/// The answer is only as trustworthy as its shakiest supported claim.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumOfSupported;

impl ConfidenceAggregator for MinimumOfSupported {
    fn aggregate(&self, verdicts: &[Verdict], no_claims_confidence: f64) -> f64 {
        let mut minimum: Option<f64> = None;
        for verdict in verdicts.iter().filter(|v| v.is_supported()) {
            minimum = Some(match minimum {
                Some(m) => m.min(verdict.confidence),
                None => verdict.confidence,
            });
        }
        minimum.unwrap_or(no_claims_confidence)
    }
}

/// Mean confidence among supported verdicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanOfSupported;

impl ConfidenceAggregator for MeanOfSupported {
    fn aggregate(&self, verdicts: &[Verdict], no_claims_confidence: f64) -> f64 {
        let supported: Vec<f64> = verdicts
            .iter()
            .filter(|v| v.is_supported())
            .map(|v| v.confidence)
            .collect();
        if supported.is_empty() {
            no_claims_confidence
        } else {
            supported.iter().sum::<f64>() / supported.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimId;
    use crate::verdict::VerdictStatus;

    fn verdict(status: VerdictStatus, confidence: f64) -> Verdict {
        Verdict::new(ClaimId::new(), status, confidence, vec![])
    }

    #[test]
    fn test_minimum_of_supported() {
        let verdicts = vec![
            verdict(VerdictStatus::Supported, 0.96),
            verdict(VerdictStatus::Supported, 0.94),
            verdict(VerdictStatus::Unverifiable, 0.2),
        ];
        let agg = MinimumOfSupported.aggregate(&verdicts, 0.25);
        assert!((agg - 0.94).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mean_of_supported() {
        let verdicts = vec![
            verdict(VerdictStatus::Supported, 0.96),
            verdict(VerdictStatus::Supported, 0.94),
        ];
        let agg = MeanOfSupported.aggregate(&verdicts, 0.25);
        assert!((agg - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_no_supported_verdicts_falls_back() {
        let verdicts = vec![verdict(VerdictStatus::Unverifiable, 0.8)];
        assert_eq!(MinimumOfSupported.aggregate(&verdicts, 0.25), 0.25);
        assert_eq!(MeanOfSupported.aggregate(&verdicts, 0.25), 0.25);
    }

    #[test]
    fn test_empty_verdict_set_falls_back() {
        assert_eq!(MinimumOfSupported.aggregate(&[], 0.3), 0.3);
        assert_eq!(MeanOfSupported.aggregate(&[], 0.3), 0.3);
    }
}
