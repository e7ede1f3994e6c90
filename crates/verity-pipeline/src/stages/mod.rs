//! Stage implementations
//!
//! Each stage invokes at most one external collaborator. Providers are
//! synchronous traits; every call goes through `spawn_blocking` under a
//! bounded deadline, so an external call is the only suspension point a
//! stage introduces.

pub mod checker;
pub mod composer;
pub mod extractor;
pub mod normalizer;
pub mod reasoner;
pub mod reranker;
pub mod retriever;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;
use verity_domain::traits::LanguageModel;

/// Run a blocking provider call under a deadline.
///
/// Timeouts are reported as plain errors: exceeding the deadline follows
/// the same fatal/degraded rules as a hard provider failure.
pub(crate) async fn blocking_call<T, F>(deadline: Duration, f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, String> + Send + 'static,
    T: Send + 'static,
{
    match timeout(deadline, tokio::task::spawn_blocking(f)).await {
        Err(_) => Err(format!("deadline of {:?} exceeded", deadline)),
        Ok(Err(join_err)) => Err(format!("task join error: {}", join_err)),
        Ok(Ok(result)) => result,
    }
}

/// Call the language model with a local retry budget and exponential
/// backoff. Each attempt gets its own deadline.
///
/// `retry_budget` counts additional attempts: a budget of 2 means up to
/// three calls before the error is promoted to the caller.
pub(crate) async fn generate_with_retries<L>(
    model: Arc<L>,
    prompt: String,
    retry_budget: u32,
    backoff: Duration,
    deadline: Duration,
) -> Result<String, String>
where
    L: LanguageModel + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let attempts = retry_budget + 1;
    let mut last_error = String::new();

    for attempt in 0..attempts {
        let model = Arc::clone(&model);
        let prompt = prompt.clone();
        let result = blocking_call(deadline, move || {
            model.generate(&prompt).map_err(|e| e.to_string())
        })
        .await;

        match result {
            Ok(response) => return Ok(response),
            Err(e) => {
                warn!("Model call failed (attempt {}/{}): {}", attempt + 1, attempts, e);
                last_error = e;
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(backoff * 2u32.pow(attempt)).await;
        }
    }

    Err(last_error)
}
