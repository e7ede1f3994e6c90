//! Error types for the pipeline

use crate::state::PipelineState;
use thiserror::Error;

/// Run-fatal pipeline errors.
///
/// Only unrecoverable conditions appear here. Exhausted verification
/// retries are not an error: the run still emits a degraded `FinalAnswer`
/// with `verified == false`. Malformed claims are dropped and counted, not
/// raised.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The evidence store is unreachable or erroring. With no evidence, no
    /// verifiable answer is possible.
    #[error("Evidence store unavailable: {detail}")]
    EvidenceUnavailable {
        /// Underlying store error
        detail: String,
    },

    /// An LLM-backed call failed after its local retry budget.
    #[error("Model unavailable during {stage}: {detail}")]
    ModelUnavailable {
        /// The stage the call belonged to
        stage: PipelineState,
        /// Underlying provider error
        detail: String,
    },

    /// The run was cancelled between states; no FinalAnswer was produced.
    #[error("Run cancelled during {stage}")]
    Cancelled {
        /// The state the run was in when cancellation was observed
        stage: PipelineState,
    },

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// The stage the run failed in, if applicable.
    pub fn stage(&self) -> Option<PipelineState> {
        match self {
            PipelineError::EvidenceUnavailable { .. } => Some(PipelineState::Retrieving),
            PipelineError::ModelUnavailable { stage, .. } => Some(*stage),
            PipelineError::Cancelled { stage } => Some(*stage),
            PipelineError::Config(_) => None,
        }
    }
}
