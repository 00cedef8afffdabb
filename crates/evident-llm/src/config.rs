//! Provider configuration

use crate::{AnthropicProvider, FallbackClient, OllamaProvider, OpenAiProvider};
use evident_domain::CompletionClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Which completion backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic messages API
    Anthropic,
    /// OpenAI-compatible chat completions API
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Configuration for one completion provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend
    pub provider: ProviderKind,

    /// Model name
    pub model: String,

    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// API key (usually supplied from the environment, never written back)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout (seconds)
    pub timeout_secs: u64,

    /// Retry attempts for transient failures
    pub max_retries: u32,
}

impl LlmConfig {
    /// Local Ollama defaults
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Ollama,
            model: model.into(),
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }

    /// Anthropic defaults
    pub fn anthropic(model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Anthropic,
            model: model.into(),
            endpoint: None,
            api_key: None,
            timeout_secs: 60,
            max_retries: 2,
        }
    }

    /// OpenAI defaults
    pub fn openai(model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: model.into(),
            endpoint: None,
            api_key: None,
            timeout_secs: 60,
            max_retries: 2,
        }
    }

    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        Ok(())
    }

    /// Build the provider
    pub fn build(&self) -> Arc<dyn CompletionClient> {
        let key = self.api_key.clone().unwrap_or_default();
        match self.provider {
            ProviderKind::Anthropic => {
                let mut p = AnthropicProvider::new(key, &self.model)
                    .with_timeout(self.timeout())
                    .with_max_retries(self.max_retries);
                if let Some(endpoint) = &self.endpoint {
                    p = p.with_endpoint(endpoint);
                }
                Arc::new(p)
            }
            ProviderKind::OpenAi => {
                let mut p = OpenAiProvider::new(key, &self.model)
                    .with_timeout(self.timeout())
                    .with_max_retries(self.max_retries);
                if let Some(endpoint) = &self.endpoint {
                    p = p.with_endpoint(endpoint);
                }
                Arc::new(p)
            }
            ProviderKind::Ollama => {
                let endpoint = self
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| crate::ollama::DEFAULT_ENDPOINT.to_string());
                Arc::new(
                    OllamaProvider::new(endpoint, &self.model)
                        .with_timeout(self.timeout())
                        .with_max_retries(self.max_retries),
                )
            }
        }
    }

    /// Build a primary/fallback pair
    pub fn build_pair(primary: &LlmConfig, fallback: Option<&LlmConfig>) -> FallbackClient {
        match fallback {
            Some(fallback) => FallbackClient::new(primary.build(), fallback.build()),
            None => FallbackClient::single(primary.build()),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::ollama("llama3.1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LlmConfig::default().validate().is_ok());
        assert!(LlmConfig::anthropic("claude-sonnet-4").validate().is_ok());
    }

    #[test]
    fn test_invalid_model() {
        let mut config = LlmConfig::openai("gpt-4o");
        config.model = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = LlmConfig::openai("gpt-4o");
        config.api_key = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"openai\""));
    }
}
