//! Web search through an online-model chat API
//!
//! The search service is an OpenAI-style chat endpoint backed by a model with
//! live web access; citations come back alongside the answer text.

use crate::retry::{http_client, send_json};
use crate::LlmError;
use async_trait::async_trait;
use evident_domain::{PipelineResult, WebSearchClient, WebSearchResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default search endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai";

/// Default online model
pub const DEFAULT_MODEL: &str = "llama-3.1-sonar-small-128k-online";

const SYSTEM_PROMPT: &str = "You are a payment processing and merchant services industry expert. \
Provide accurate, current information about payment processing, merchant services, \
point-of-sale systems, and related business topics. Focus on facts and cite sources.";

const INDUSTRY_TERMS: &[&str] = &["payment", "merchant", "processing", "pos", "card", "transaction"];

/// Web search client for an online chat model
pub struct SonarSearchClient {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct SearchMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    model: &'a str,
    messages: Vec<SearchMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    search_recency_filter: &'a str,
}

#[derive(Deserialize)]
struct SearchChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct SearchChoice {
    message: SearchChoiceMessage,
}

#[derive(Deserialize)]
struct SearchResponse {
    choices: Vec<SearchChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

impl SonarSearchClient {
    /// Create a client with the default endpoint and model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            client: http_client(Duration::from_secs(30)),
            max_tokens: 800,
            temperature: 0.2,
        }
    }

    /// Override the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Append industry context to queries that lack it
pub fn enhance_industry_query(query: &str) -> String {
    let lower = query.to_lowercase();
    if INDUSTRY_TERMS.iter().any(|t| lower.contains(t)) {
        query.to_string()
    } else {
        format!("{} payment processing merchant services", query)
    }
}

/// Heuristic confidence for a web answer
pub fn web_confidence(content: &str, citations: &[String]) -> f64 {
    let mut confidence: f64 = 0.5;
    if !citations.is_empty() {
        confidence += 0.2;
    }
    if citations.len() > 2 {
        confidence += 0.1;
    }
    if content.chars().count() > 50 {
        confidence += 0.2;
    }
    confidence.min(1.0)
}

#[async_trait]
impl WebSearchClient for SonarSearchClient {
    async fn search(&self, query: &str) -> PipelineResult<WebSearchResult> {
        if self.api_key.is_empty() {
            return Err(LlmError::Unauthorized("missing web search API key".to_string()).into());
        }

        let url = format!("{}/chat/completions", self.endpoint);
        let enhanced = enhance_industry_query(query);
        let body = SearchRequest {
            model: &self.model,
            messages: vec![
                SearchMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                SearchMessage {
                    role: "user",
                    content: &enhanced,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            search_recency_filter: "month",
        };

        let response: SearchResponse = send_json(
            || self.client.post(&url).bearer_auth(&self.api_key).json(&body),
            2,
            &self.model,
        )
        .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices returned".to_string()))?;
        let confidence = web_confidence(&content, &response.citations);

        Ok(WebSearchResult {
            content,
            citations: response.citations,
            confidence,
        })
    }
}

/// Mock web search for tests
#[derive(Debug, Clone, Default)]
pub struct MockWebSearch {
    result: Option<WebSearchResult>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockWebSearch {
    /// Always return `content` with `citations`
    pub fn new(content: impl Into<String>, citations: Vec<String>) -> Self {
        let content = content.into();
        let confidence = web_confidence(&content, &citations);
        Self {
            result: Some(WebSearchResult {
                content,
                citations,
                confidence,
            }),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::default()
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl WebSearchClient for MockWebSearch {
    async fn search(&self, query: &str) -> PipelineResult<WebSearchResult> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query.to_string());
        self.result
            .clone()
            .ok_or_else(|| LlmError::Communication("mock web search failure".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_industry_query() {
        assert_eq!(
            enhance_industry_query("chargeback time limits"),
            "chargeback time limits payment processing merchant services"
        );
        assert_eq!(enhance_industry_query("merchant fees"), "merchant fees");
    }

    #[test]
    fn test_web_confidence() {
        assert_eq!(web_confidence("short", &[]), 0.5);
        let long = "x".repeat(60);
        let cites: Vec<String> = (0..3).map(|i| format!("https://e.com/{}", i)).collect();
        assert!((web_confidence(&long, &cites) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_mock_web_search_records_queries() {
        let web = MockWebSearch::new("answer", vec!["https://a".into()]);
        let result = web.search("q1").await.unwrap();
        assert_eq!(result.citations.len(), 1);
        assert_eq!(web.queries(), vec!["q1".to_string()]);

        assert!(MockWebSearch::failing().search("q").await.is_err());
    }
}
