//! Pipeline orchestrator
//!
//! Sequences the stages as a state machine, threads the run context
//! forward, and owns the retry/fallback policy. Control flow is strictly
//! linear except the bounded Composing → Reasoning feedback edge.
//!
//! Concurrent runs are independent: `submit` takes `&self`, and the only
//! shared state is the evidence store handle.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::progress::{self, ProgressSender};
use crate::stages::composer::{self, Disposition};
use crate::stages::{checker, extractor, normalizer, reasoner, reranker, retriever};
use crate::state::{PipelineState, RunContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use verity_domain::traits::{EvidenceStore, LanguageModel, RerankModel};
use verity_domain::{FinalAnswer, Query};

/// Cooperative cancellation handle for a run.
///
/// Cancellation is observed between states: a cancelled run stops at the
/// next checkpoint and never reaches `Done`, so no partial verdict data can
/// surface as a FinalAnswer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The verification pipeline.
///
/// Generic over the three collaborator seams so the whole pipeline runs
/// against deterministic stubs in tests.
pub struct Pipeline<E, R, L> {
    store: Arc<Mutex<E>>,
    reranker: Arc<R>,
    model: Arc<L>,
    config: PipelineConfig,
}

impl<E, R, L> Pipeline<E, R, L>
where
    E: EvidenceStore + Send + 'static,
    E::Error: std::fmt::Display,
    R: RerankModel + Send + Sync + 'static,
    R::Error: std::fmt::Display,
    L: LanguageModel + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a pipeline. Fails on invalid configuration.
    pub fn new(
        store: E,
        reranker: R,
        model: L,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            reranker: Arc::new(reranker),
            model: Arc::new(model),
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer a question, blocking until the FinalAnswer is ready.
    pub async fn submit(
        &self,
        question: &str,
        department: Option<&str>,
    ) -> Result<FinalAnswer, PipelineError> {
        self.submit_with_progress(question, department, None, CancelToken::new())
            .await
    }

    /// Answer a question, emitting one progress event per state transition
    /// and honoring the cancellation token between states.
    pub async fn submit_with_progress(
        &self,
        question: &str,
        department: Option<&str>,
        progress: Option<ProgressSender>,
        cancel: CancelToken,
    ) -> Result<FinalAnswer, PipelineError> {
        let backoff = self.config.model_retry_backoff();
        let model_deadline = self.config.model_timeout();

        // NORMALIZING
        progress::emit(&progress, PipelineState::Normalizing);
        checkpoint(&cancel, PipelineState::Normalizing)?;
        let query = Query::new(question, department.map(str::to_string));
        let query = normalizer::normalize(
            Arc::clone(&self.model),
            query,
            self.config.model_retry_budget,
            backoff,
            model_deadline,
        )
        .await;

        // RETRIEVING
        progress::emit(&progress, PipelineState::Retrieving);
        checkpoint(&cancel, PipelineState::Retrieving)?;
        let candidates = match retriever::retrieve(
            Arc::clone(&self.store),
            &query,
            self.config.retrieve_k,
            self.config.search_timeout(),
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(e) => return fail(&progress, e),
        };

        // RERANKING
        progress::emit(&progress, PipelineState::Reranking);
        checkpoint(&cancel, PipelineState::Reranking)?;
        let (evidence, degraded_rerank) = reranker::rerank(
            Arc::clone(&self.reranker),
            &query,
            candidates,
            self.config.evidence_n,
            model_deadline,
        )
        .await;

        let mut ctx = RunContext::new(query, evidence, degraded_rerank);

        // The one feedback edge: Composing → Reasoning, bounded by
        // max_retries. The evidence set stays fixed across attempts.
        loop {
            let attempt = ctx.begin_attempt();

            // REASONING
            progress::emit(&progress, PipelineState::Reasoning);
            checkpoint(&cancel, PipelineState::Reasoning)?;
            let draft = match reasoner::draft(
                Arc::clone(&self.model),
                &ctx.query,
                &ctx.evidence,
                &ctx.flagged,
                attempt,
                self.config.model_retry_budget,
                backoff,
                model_deadline,
            )
            .await
            {
                Ok(draft) => draft,
                Err(e) => return fail(&progress, e),
            };

            // EXTRACTING
            progress::emit(&progress, PipelineState::Extracting);
            checkpoint(&cancel, PipelineState::Extracting)?;
            let (claims, dropped) = match extractor::extract(
                Arc::clone(&self.model),
                &draft,
                self.config.model_retry_budget,
                backoff,
                model_deadline,
            )
            .await
            {
                Ok(extracted) => extracted,
                Err(e) => return fail(&progress, e),
            };

            // CHECKING
            progress::emit(&progress, PipelineState::Checking);
            checkpoint(&cancel, PipelineState::Checking)?;
            let verdicts = match checker::check(
                Arc::clone(&self.model),
                &claims,
                &ctx.evidence,
                self.config.model_retry_budget,
                backoff,
                model_deadline,
            )
            .await
            {
                Ok(verdicts) => verdicts,
                Err(e) => return fail(&progress, e),
            };

            // COMPOSING
            progress::emit(&progress, PipelineState::Composing);
            checkpoint(&cancel, PipelineState::Composing)?;
            match composer::evaluate(&claims, &verdicts, &self.config) {
                Disposition::Accept => {
                    let answer =
                        composer::accept(&draft, &verdicts, &ctx.evidence, &self.config, dropped);
                    progress::emit(&progress, PipelineState::Done);
                    return Ok(answer);
                }
                Disposition::Retry { reasons, flagged } => {
                    if attempt <= self.config.max_retries {
                        info!(
                            "Attempt {} rejected ({}), retrying",
                            attempt,
                            reasons
                                .iter()
                                .map(|r| r.to_string())
                                .collect::<Vec<_>>()
                                .join("; ")
                        );
                        ctx.flagged = flagged;
                        continue;
                    }
                    warn!("Verification exhausted after {} attempts, degrading", attempt);
                    let answer = composer::degrade(
                        &draft,
                        &claims,
                        &verdicts,
                        &ctx.evidence,
                        &self.config,
                        dropped,
                        &reasons,
                    );
                    progress::emit(&progress, PipelineState::Done);
                    return Ok(answer);
                }
            }
        }
    }
}

fn checkpoint(cancel: &CancelToken, stage: PipelineState) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled { stage })
    } else {
        Ok(())
    }
}

fn fail<T>(progress: &Option<ProgressSender>, err: PipelineError) -> Result<T, PipelineError> {
    progress::emit(progress, PipelineState::Failed);
    Err(err)
}
