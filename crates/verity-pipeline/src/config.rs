//! Configuration for the pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;
use verity_domain::{ConfidenceAggregator, MeanOfSupported, MinimumOfSupported, Verdict};

/// Which aggregation formula turns per-claim confidences into an overall
/// confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    /// Minimum of supported verdict confidences (conservative bound)
    Minimum,
    /// Mean of supported verdict confidences
    Mean,
}

impl AggregationKind {
    /// Apply the selected formula.
    pub fn aggregate(&self, verdicts: &[Verdict], no_claims_confidence: f64) -> f64 {
        match self {
            AggregationKind::Minimum => {
                MinimumOfSupported.aggregate(verdicts, no_claims_confidence)
            }
            AggregationKind::Mean => MeanOfSupported.aggregate(verdicts, no_claims_confidence),
        }
    }
}

impl Default for AggregationKind {
    fn default() -> Self {
        AggregationKind::Minimum
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum candidates requested from the evidence store (K)
    pub retrieve_k: usize,

    /// Evidence set size after reranking (N ≤ K)
    pub evidence_n: usize,

    /// Maximum feedback-edge retries; a run makes at most
    /// `max_retries + 1` attempts
    pub max_retries: u32,

    /// Reject an attempt when the fraction of unverifiable claims exceeds
    /// this threshold
    pub unverifiable_threshold: f64,

    /// Overall confidence assigned when a draft yields no checkable claims
    pub no_claims_confidence: f64,

    /// Ceiling on the overall confidence of a degraded answer; keeps
    /// unverified answers visibly below acceptance level
    pub degraded_confidence_cap: f64,

    /// Overall-confidence aggregation formula
    #[serde(default)]
    pub aggregation: AggregationKind,

    /// Deadline for each model call (seconds)
    pub model_timeout_secs: u64,

    /// Deadline for the evidence store call (seconds)
    pub search_timeout_secs: u64,

    /// Additional local attempts for a failing model call before the run
    /// fails
    pub model_retry_budget: u32,

    /// Base backoff between local model retries (milliseconds, doubled per
    /// retry)
    pub model_retry_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieve_k: 12,
            evidence_n: 4,
            max_retries: 2,
            unverifiable_threshold: 0.3,
            no_claims_confidence: 0.25,
            degraded_confidence_cap: 0.35,
            aggregation: AggregationKind::Minimum,
            model_timeout_secs: 120,
            search_timeout_secs: 10,
            model_retry_budget: 2,
            model_retry_backoff_ms: 500,
        }
    }
}

impl PipelineConfig {
    /// Conservative preset: stricter verification, tighter timeouts.
    pub fn conservative() -> Self {
        Self {
            evidence_n: 3,
            unverifiable_threshold: 0.2,
            no_claims_confidence: 0.15,
            degraded_confidence_cap: 0.25,
            model_timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Lenient preset: more evidence, mean aggregation, higher tolerance
    /// for unverifiable claims.
    pub fn lenient() -> Self {
        Self {
            retrieve_k: 20,
            evidence_n: 8,
            unverifiable_threshold: 0.5,
            aggregation: AggregationKind::Mean,
            model_timeout_secs: 300,
            ..Self::default()
        }
    }

    /// Deadline for each model call.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Deadline for the evidence store call.
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Base backoff between local model retries.
    pub fn model_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.model_retry_backoff_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.retrieve_k == 0 {
            return Err("retrieve_k must be greater than 0".to_string());
        }
        if self.evidence_n == 0 {
            return Err("evidence_n must be greater than 0".to_string());
        }
        if self.evidence_n > self.retrieve_k {
            return Err("evidence_n cannot exceed retrieve_k".to_string());
        }
        if !(0.0..=1.0).contains(&self.unverifiable_threshold) {
            return Err("unverifiable_threshold must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.no_claims_confidence) {
            return Err("no_claims_confidence must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.degraded_confidence_cap) {
            return Err("degraded_confidence_cap must be in [0, 1]".to_string());
        }
        if self.model_timeout_secs == 0 || self.search_timeout_secs == 0 {
            return Err("timeouts must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(PipelineConfig::conservative().validate().is_ok());
        assert!(PipelineConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_evidence_n() {
        let mut config = PipelineConfig::default();
        config.evidence_n = config.retrieve_k + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_threshold() {
        let mut config = PipelineConfig::default();
        config.unverifiable_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = PipelineConfig::default();
        config.model_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.retrieve_k, config.retrieve_k);
        assert_eq!(parsed.aggregation, AggregationKind::Mean);
        assert_eq!(parsed.unverifiable_threshold, config.unverifiable_threshold);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let toml_str = r#"
            retrieve_k = 4
            evidence_n = 8
            max_retries = 1
            unverifiable_threshold = 0.3
            no_claims_confidence = 0.25
            degraded_confidence_cap = 0.35
            model_timeout_secs = 60
            search_timeout_secs = 10
            model_retry_budget = 2
            model_retry_backoff_ms = 500
        "#;
        assert!(PipelineConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_aggregation_kinds_differ() {
        use verity_domain::{ClaimId, Verdict, VerdictStatus};
        let verdicts = vec![
            Verdict::new(ClaimId::new(), VerdictStatus::Supported, 0.9, vec![]),
            Verdict::new(ClaimId::new(), VerdictStatus::Supported, 0.5, vec![]),
        ];
        assert_eq!(AggregationKind::Minimum.aggregate(&verdicts, 0.0), 0.5);
        assert!((AggregationKind::Mean.aggregate(&verdicts, 0.0) - 0.7).abs() < 1e-9);
    }
}
