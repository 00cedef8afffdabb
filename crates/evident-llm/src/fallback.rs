//! Primary/fallback provider pair

use async_trait::async_trait;
use evident_domain::{Completion, CompletionClient, CompletionRequest, PipelineResult};
use std::sync::Arc;
use tracing::warn;

/// Tries the primary provider and falls back to the secondary on any error
///
/// `Completion::model_used` reports whichever provider actually answered.
pub struct FallbackClient {
    primary: Arc<dyn CompletionClient>,
    fallback: Option<Arc<dyn CompletionClient>>,
}

impl FallbackClient {
    /// Pair a primary with a fallback
    pub fn new(primary: Arc<dyn CompletionClient>, fallback: Arc<dyn CompletionClient>) -> Self {
        Self {
            primary,
            fallback: Some(fallback),
        }
    }

    /// Primary only
    pub fn single(primary: Arc<dyn CompletionClient>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }
}

#[async_trait]
impl CompletionClient for FallbackClient {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<Completion> {
        match self.primary.complete(request).await {
            Ok(completion) => Ok(completion),
            Err(primary_err) => match &self.fallback {
                Some(fallback) => {
                    warn!("Primary completion provider failed, using fallback: {}", primary_err);
                    fallback.complete(request).await
                }
                None => Err(primary_err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;

    #[tokio::test]
    async fn test_primary_answers() {
        let primary = MockProvider::new("from primary").with_model("primary-model");
        let fallback = MockProvider::new("from fallback").with_model("fallback-model");
        let client = FallbackClient::new(Arc::new(primary), Arc::new(fallback.clone()));

        let completion = client.complete(&CompletionRequest::new("s", "q")).await.unwrap();
        assert_eq!(completion.model_used, "primary-model");
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_reports_model() {
        let primary = MockProvider::new("unused").with_model("primary-model");
        primary.add_error("q");
        let fallback = MockProvider::new("from fallback").with_model("fallback-model");
        let client = FallbackClient::new(Arc::new(primary), Arc::new(fallback));

        let completion = client.complete(&CompletionRequest::new("s", "q")).await.unwrap();
        assert_eq!(completion.text, "from fallback");
        assert_eq!(completion.model_used, "fallback-model");
    }

    #[tokio::test]
    async fn test_both_fail() {
        let primary = MockProvider::default();
        primary.add_error("q");
        let fallback = MockProvider::default();
        fallback.add_error("q");
        let client = FallbackClient::new(Arc::new(primary), Arc::new(fallback));
        assert!(client.complete(&CompletionRequest::new("s", "q")).await.is_err());
    }

    #[tokio::test]
    async fn test_single_propagates_error() {
        let primary = MockProvider::default();
        primary.add_error("q");
        let client = FallbackClient::single(Arc::new(primary));
        assert!(client.complete(&CompletionRequest::new("s", "q")).await.is_err());
    }
}
