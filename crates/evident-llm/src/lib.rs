//! Evident Completion Service Layer
//!
//! Pluggable completion providers behind the `CompletionClient` trait from
//! `evident-domain`, plus the web search client and typed parsing of JSON
//! completion output.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama chat API
//! - `AnthropicProvider`: Anthropic messages API
//! - `OpenAiProvider`: OpenAI-compatible chat completions API
//! - `FallbackClient`: Primary/fallback pair that reports which model answered
//!
//! # Examples
//!
//! ```
//! use evident_llm::MockProvider;
//! use evident_domain::{CompletionClient, CompletionRequest};
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let request = CompletionRequest::new("system", "test prompt");
//! let result = provider.complete(&request).await.unwrap();
//! assert_eq!(result.text, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod anthropic;
pub mod config;
pub mod fallback;
pub mod ollama;
pub mod openai;
pub mod parse;
mod retry;
pub mod web;

use async_trait::async_trait;
use evident_domain::{Completion, CompletionClient, CompletionRequest, PipelineError, PipelineResult};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use anthropic::AnthropicProvider;
pub use config::{LlmConfig, ProviderKind};
pub use fallback::FallbackClient;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use parse::{complete_json, extract_json, parse_completion};
pub use web::{MockWebSearch, SonarSearchClient};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        PipelineError::ExternalServiceFailure(err.to_string())
    }
}

/// Mock completion provider for deterministic testing
///
/// Responses are routed by substring: the first registered pattern found in
/// the request's system prompt or messages wins. Requests matching nothing
/// get the default response.
///
/// # Examples
///
/// ```
/// use evident_llm::MockProvider;
/// use evident_domain::{CompletionClient, CompletionRequest};
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::default();
/// provider.add_response("refund", r#"{"answer": "30 days"}"#);
/// provider.add_error("timeout please");
///
/// let ok = provider.complete(&CompletionRequest::new("s", "refund window?")).await;
/// assert!(ok.unwrap().text.contains("30 days"));
/// let err = provider.complete(&CompletionRequest::new("s", "timeout please")).await;
/// assert!(err.is_err());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    responses: Arc<Mutex<Vec<(String, String)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

const MOCK_ERROR: &str = "ERROR";

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock-model".to_string(),
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Name reported as `model_used`
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Respond with `response` when `pattern` appears in the request
    pub fn add_response(&self, pattern: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).push((pattern.into(), response.into()));
    }

    /// Fail when `pattern` appears in the request
    pub fn add_error(&self, pattern: impl Into<String>) {
        lock(&self.responses).push((pattern.into(), MOCK_ERROR.to_string()));
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Number of calls whose request contained `pattern`
    pub fn calls_containing(&self, pattern: &str) -> usize {
        lock(&self.prompts).iter().filter(|p| p.contains(pattern)).count()
    }

    /// Reset the recorded calls
    pub fn reset_call_count(&self) {
        lock(&self.prompts).clear();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl CompletionClient for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<Completion> {
        let text = request.full_text();
        lock(&self.prompts).push(text.clone());

        let routed = lock(&self.responses)
            .iter()
            .find(|(pattern, _)| text.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match routed {
            Some(response) if response == MOCK_ERROR => {
                Err(LlmError::Other("Mock error".to_string()).into())
            }
            Some(response) => Ok(Completion {
                text: response,
                model_used: self.model.clone(),
            }),
            None => Ok(Completion {
                text: self.default_response.clone(),
                model_used: self.model.clone(),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: &str) -> CompletionRequest {
        CompletionRequest::new("system", user)
    }

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.complete(&request("any prompt")).await.unwrap();
        assert_eq!(result.text, "Test response");
        assert_eq!(result.model_used, "mock-model");
    }

    #[tokio::test]
    async fn test_mock_provider_routes_by_substring() {
        let provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.complete(&request("say hello")).await.unwrap().text, "world");
        assert_eq!(provider.complete(&request("foo?")).await.unwrap().text, "bar");
        assert_eq!(
            provider.complete(&request("unknown")).await.unwrap().text,
            "Default mock response"
        );
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.complete(&request("prompt1")).await.unwrap();
        provider.complete(&request("prompt2")).await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.calls_containing("prompt1"), 1);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let provider = MockProvider::default();
        provider.add_error("bad prompt");

        let result = provider.complete(&request("bad prompt")).await;
        assert!(matches!(result, Err(PipelineError::ExternalServiceFailure(_))));
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.complete(&request("test")).await.unwrap();
        assert_eq!(provider2.call_count(), 1);
    }
}
