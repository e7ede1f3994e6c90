//! Ollama Provider Implementation
//!
//! Integration with Ollama's local LLM API, so the pipeline can run against
//! local models.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use verity_llm::OllamaModel;
//!
//! let model = OllamaModel::new("http://localhost:11434", "llama3");
//! // `generate` is async; the LanguageModel trait impl provides a
//! // blocking wrapper for use inside spawn_blocking.
//! ```

use crate::LlmError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use verity_domain::traits::LanguageModel;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for model requests (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API provider for local LLM inference.
pub struct OllamaModel {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

/// Request body for the Ollama generate API
#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from the Ollama generate API
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaModel {
    /// Create a new Ollama provider.
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: model name (e.g., "llama3", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap();

        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a provider against the default local endpoint.
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Generate text using the Ollama API.
    ///
    /// # Errors
    ///
    /// Returns an error if Ollama is unreachable, the model is not
    /// installed, or the response cannot be parsed.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request_body = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        // Retry with exponential backoff: 1s, 2s, 4s, ...
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&request_body).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return match response.json::<GenerateResponse>().await {
                            Ok(body) => Ok(body.response),
                            Err(e) => Err(LlmError::InvalidResponse(format!(
                                "Failed to parse response: {}",
                                e
                            ))),
                        };
                    } else if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else {
                        let status = response.status();
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

impl LanguageModel for OllamaModel {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        // Blocking wrapper for the async call; the pipeline invokes this
        // from spawn_blocking, where building a runtime is permitted.
        tokio::runtime::Runtime::new()
            .map_err(|e| LlmError::Other(format!("Runtime error: {}", e)))?
            .block_on(async { self.generate(prompt).await })
    }
}

/// Strip a surrounding markdown code fence from a model reply, if present.
///
/// Models frequently wrap JSON in ```` ```json ```` blocks despite
/// instructions not to.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening fence line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => return trimmed,
    };
    body.strip_suffix("```").map(str::trim).unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_model_creation() {
        let model = OllamaModel::new("http://localhost:11434", "llama3");
        assert_eq!(model.endpoint, "http://localhost:11434");
        assert_eq!(model.model, "llama3");
        assert_eq!(model.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_ollama_default_endpoint() {
        let model = OllamaModel::default_endpoint("mistral");
        assert_eq!(model.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(model.model, "mistral");
    }

    #[test]
    fn test_ollama_with_max_retries() {
        let model = OllamaModel::new("http://localhost:11434", "llama3").with_max_retries(5);
        assert_eq!(model.max_retries, 5);
    }

    #[test]
    fn test_strip_code_fences_plain() {
        assert_eq!(strip_code_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_strip_code_fences_with_language() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), r#"{"a": 1}"#);
    }

    #[test]
    fn test_strip_code_fences_without_language() {
        let fenced = "```\n[1, 2]\n```";
        assert_eq!(strip_code_fences(fenced), "[1, 2]");
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Invalid port: connection must fail after retries
        let model = OllamaModel::new("http://localhost:1", "llama3").with_max_retries(1);
        let result = model.generate("test").await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }

    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_ollama_generate_integration() {
        let model = OllamaModel::default_endpoint("llama3");
        if let Ok(response) = model.generate("Say 'hello' and nothing else").await {
            assert!(!response.is_empty());
        }
    }
}
