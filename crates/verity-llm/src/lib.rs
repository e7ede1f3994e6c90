//! Verity LLM Provider Layer
//!
//! Pluggable language-model and reranking-model providers.
//!
//! # Architecture
//!
//! This crate implements the `LanguageModel` and `RerankModel` traits from
//! `verity-domain`. Deterministic mocks cover testing; `OllamaModel` covers
//! local inference.
//!
//! # Providers
//!
//! - `MockModel`: deterministic mock for testing, with rule-based responses
//! - `MockReranker`: deterministic reranking stub
//! - `OllamaModel`: local Ollama API integration
//! - `PromptReranker`: reranking via scoring prompts against any
//!   `LanguageModel`
//!
//! # Examples
//!
//! ```
//! use verity_llm::MockModel;
//! use verity_domain::traits::LanguageModel;
//!
//! let model = MockModel::new("Hello from the model");
//! let result = model.generate("any prompt").unwrap();
//! assert_eq!(result, "Hello from the model");
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod rerank;

use std::sync::{Arc, Mutex};
use thiserror::Error;
use verity_domain::traits::LanguageModel;

pub use ollama::OllamaModel;
pub use rerank::{MockReranker, PromptReranker};

/// Errors that can occur during model operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("Model error: {0}")]
    Other(String),
}

enum RuleAction {
    Reply(String),
    Fail,
    FailTimes(usize),
}

struct Rule {
    needle: String,
    action: RuleAction,
}

/// Deterministic mock language model for testing.
///
/// Pipeline prompts are composed (instructions + context + payload), so
/// exact-prompt matching is impractical. Rules instead match on a substring
/// of the prompt; the first matching rule, in insertion order, wins, and a
/// default response covers everything else.
///
/// # Examples
///
/// ```
/// use verity_llm::MockModel;
/// use verity_domain::traits::LanguageModel;
///
/// let model = MockModel::new("default");
/// model.respond_when("draft", "The SLA is 99.9%.");
/// model.fail_when("broken");
///
/// assert_eq!(model.generate("please draft an answer").unwrap(), "The SLA is 99.9%.");
/// assert_eq!(model.generate("anything else").unwrap(), "default");
/// assert!(model.generate("broken prompt").is_err());
/// ```
#[derive(Clone)]
pub struct MockModel {
    default_response: String,
    rules: Arc<Mutex<Vec<Rule>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockModel {
    /// Create a mock with a fixed default response for unmatched prompts.
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            default_response: default_response.into(),
            rules: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Respond with `response` to any prompt containing `needle`.
    pub fn respond_when(&self, needle: impl Into<String>, response: impl Into<String>) {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.into(),
            action: RuleAction::Reply(response.into()),
        });
    }

    /// Fail every prompt containing `needle`.
    pub fn fail_when(&self, needle: impl Into<String>) {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.into(),
            action: RuleAction::Fail,
        });
    }

    /// Fail the first `times` prompts containing `needle`, then stop
    /// matching (later rules or the default take over).
    pub fn fail_times(&self, needle: impl Into<String>, times: usize) {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.into(),
            action: RuleAction::FailTimes(times),
        });
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LanguageModel for MockModel {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        *self.call_count.lock().unwrap() += 1;

        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if !prompt.contains(&rule.needle) {
                continue;
            }
            match &mut rule.action {
                RuleAction::Reply(response) => return Ok(response.clone()),
                RuleAction::Fail => {
                    return Err(LlmError::Other(format!("Mock failure for '{}'", rule.needle)))
                }
                RuleAction::FailTimes(remaining) => {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(LlmError::Other(format!(
                            "Mock transient failure for '{}'",
                            rule.needle
                        )));
                    }
                    // Exhausted: fall through to later rules / default
                }
            }
        }

        Ok(self.default_response.clone())
    }
}
