//! Anthropic messages API provider

use crate::retry::{http_client, send_json};
use crate::LlmError;
use async_trait::async_trait;
use evident_domain::{Completion, CompletionClient, CompletionRequest, PipelineResult, Role};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Anthropic API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// API version header value
pub const API_VERSION: &str = "2023-06-01";

/// Default timeout for completion requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Provider for the Anthropic messages API
pub struct AnthropicProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
}

impl AnthropicProvider {
    /// Create a provider for `model` using `api_key`
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: 2,
        }
    }

    /// Override the endpoint (for proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[async_trait]
impl CompletionClient for AnthropicProvider {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<Completion> {
        if self.api_key.is_empty() {
            return Err(LlmError::Unauthorized("missing Anthropic API key".to_string()).into());
        }

        let url = format!("{}/v1/messages", self.endpoint);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: request
                .messages
                .iter()
                .map(|m| MessageParam {
                    role: match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: &m.content,
                })
                .collect(),
        };

        let response: MessagesResponse = send_json(
            || {
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", API_VERSION)
                    .json(&body)
            },
            self.max_retries,
            &self.model,
        )
        .await?;

        let text = response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(LlmError::InvalidResponse("empty content".to_string()).into());
        }

        Ok(Completion {
            text,
            model_used: response.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_domain::PipelineError;

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let provider = AnthropicProvider::new("", "claude-sonnet");
        let result = provider.complete(&CompletionRequest::new("s", "hi")).await;
        match result {
            Err(PipelineError::ExternalServiceFailure(msg)) => assert!(msg.contains("API key")),
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_endpoint_override() {
        let provider = AnthropicProvider::new("k", "m").with_endpoint("http://proxy/");
        assert_eq!(provider.endpoint, "http://proxy");
    }
}
