//! OpenAI-compatible chat completions provider

use crate::retry::{http_client, send_json};
use crate::LlmError;
use async_trait::async_trait;
use evident_domain::{Completion, CompletionClient, CompletionRequest, PipelineResult, Role};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

/// Provider for any `/v1/chat/completions` compatible API
pub struct OpenAiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatMessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessageParam<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider for `model` using `api_key`
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: http_client(Duration::from_secs(60)),
            max_retries: 2,
        }
    }

    /// Override the endpoint (for compatible servers)
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
impl CompletionClient for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<Completion> {
        if self.api_key.is_empty() {
            return Err(LlmError::Unauthorized("missing OpenAI API key".to_string()).into());
        }

        let url = format!("{}/v1/chat/completions", self.endpoint);
        let mut messages = vec![ChatMessageParam {
            role: "system",
            content: &request.system_prompt,
        }];
        messages.extend(request.messages.iter().map(|m| ChatMessageParam {
            role: match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &m.content,
        }));
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response: ChatResponse = send_json(
            || self.client.post(&url).bearer_auth(&self.api_key).json(&body),
            self.max_retries,
            &self.model,
        )
        .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices returned".to_string()))?;

        Ok(Completion {
            text,
            model_used: response.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let provider = OpenAiProvider::new("", "gpt-4o");
        assert!(provider.complete(&CompletionRequest::new("s", "hi")).await.is_err());
    }
}
