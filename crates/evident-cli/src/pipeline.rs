//! Wiring of the store, engines, and assistant for one profile.

use crate::cli::KeyArgs;
use crate::config::{EngineSettings, Profile};
use crate::error::Result;
use evident_assistant::Assistant;
use evident_domain::{CompletionClient, WebSearchClient};
use evident_graph::GraphEngine;
use evident_learning::LearningLoop;
use evident_llm::{LlmConfig, SonarSearchClient};
use evident_reasoning::ReasoningEngine;
use evident_retrieval::Orchestrator;
use evident_store::SqliteStore;
use evident_verify::{CitationEngine, FactVerifier, ReliabilityModel};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Provider credentials supplied at runtime.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Primary completion provider key
    pub primary: Option<String>,
    /// Fallback completion provider key
    pub fallback: Option<String>,
    /// Web search key
    pub web: Option<String>,
}

impl From<KeyArgs> for ApiKeys {
    fn from(keys: KeyArgs) -> Self {
        Self {
            primary: keys.primary_api_key,
            fallback: keys.fallback_api_key,
            web: keys.web_api_key,
        }
    }
}

/// Every engine assembled over one store.
pub struct Pipeline {
    /// Evidence, audit, feedback, and profile storage
    pub store: Arc<SqliteStore>,
    /// Search hierarchy
    pub orchestrator: Arc<Orchestrator>,
    /// Document relationships and conflicts
    pub graph: GraphEngine,
    /// Multi-step reasoning
    pub reasoning: Arc<ReasoningEngine>,
    /// Fact verification
    pub verifier: Arc<FactVerifier>,
    /// Citation scoring
    pub citations: Arc<CitationEngine>,
    /// Feedback learning
    pub learning: Arc<LearningLoop>,
    /// Answer composition
    pub assistant: Assistant,
}

impl Pipeline {
    /// Open the profile's database and build its providers.
    ///
    /// `allow_web` can only narrow the profile's web setting.
    pub fn open(profile: &Profile, keys: &ApiKeys, allow_web: bool) -> Result<Self> {
        if let Some(parent) = Path::new(&profile.database).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Arc::new(SqliteStore::new(&profile.database)?);

        let llm = completion_client(profile, keys);
        let web = if allow_web { web_client(profile, keys) } else { None };

        info!(
            "Opened profile database {} (model: {}, web search: {})",
            profile.database,
            profile.primary.model,
            web.is_some()
        );
        Ok(Self::assemble(store, llm, web, &profile.engines))
    }

    /// Build every engine over an open store and completion client.
    pub fn assemble(
        store: Arc<SqliteStore>,
        llm: Arc<dyn CompletionClient>,
        web: Option<Arc<dyn WebSearchClient>>,
        engines: &EngineSettings,
    ) -> Self {
        let mut orchestrator_config = engines.orchestrator.clone();
        orchestrator_config.web_enabled = orchestrator_config.web_enabled && web.is_some();

        let mut builder = Orchestrator::builder(store.clone()).config(orchestrator_config);
        if let Some(web) = web {
            builder = builder.web(web, store.clone());
        }
        let orchestrator = Arc::new(builder.build());

        let reliability = Arc::new(ReliabilityModel::with_store(store.clone()));
        let graph = GraphEngine::new(store.clone(), llm.clone(), engines.graph.clone());
        let reasoning = Arc::new(ReasoningEngine::new(
            orchestrator.clone(),
            llm.clone(),
            engines.reasoning.clone(),
        ));
        let verifier = Arc::new(FactVerifier::new(
            orchestrator.clone(),
            llm.clone(),
            store.clone(),
            reliability.clone(),
            engines.verification.clone(),
        ));
        let citations = Arc::new(CitationEngine::new(llm.clone(), reliability, engines.citation.clone()));
        let learning = Arc::new(LearningLoop::new(
            store.clone(),
            store.clone(),
            store.clone(),
            llm.clone(),
            engines.learning.clone(),
        ));

        let assistant = Assistant::builder(orchestrator.clone(), llm)
            .config(engines.assistant.clone())
            .reasoning(reasoning.clone())
            .verifier(verifier.clone())
            .citations(citations.clone())
            .learning(learning.clone())
            .build();

        Self {
            store,
            orchestrator,
            graph,
            reasoning,
            verifier,
            citations,
            learning,
            assistant,
        }
    }
}

fn completion_client(profile: &Profile, keys: &ApiKeys) -> Arc<dyn CompletionClient> {
    let mut primary = profile.primary.clone();
    if keys.primary.is_some() {
        primary.api_key = keys.primary.clone();
    }

    let fallback = profile.fallback.clone().map(|mut fallback| {
        if keys.fallback.is_some() {
            fallback.api_key = keys.fallback.clone();
        }
        fallback
    });

    Arc::new(LlmConfig::build_pair(&primary, fallback.as_ref()))
}

fn web_client(profile: &Profile, keys: &ApiKeys) -> Option<Arc<dyn WebSearchClient>> {
    if !profile.web_search {
        return None;
    }
    let Some(key) = keys.web.clone() else {
        warn!("Web search is enabled but EVIDENT_WEB_API_KEY is not set; web tier disabled");
        return None;
    };

    let mut client = SonarSearchClient::new(key);
    if let Some(model) = &profile.web_model {
        client = client.with_model(model);
    }
    if let Some(endpoint) = &profile.web_endpoint {
        client = client.with_endpoint(endpoint);
    }
    Some(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_requires_toggle_and_key() {
        let mut profile = Profile::local("db");
        let keys = ApiKeys {
            web: Some("pplx-key".to_string()),
            ..ApiKeys::default()
        };
        assert!(web_client(&profile, &keys).is_none());

        profile.web_search = true;
        assert!(web_client(&profile, &ApiKeys::default()).is_none());
        assert!(web_client(&profile, &keys).is_some());
    }

    #[test]
    fn test_key_args_convert() {
        let keys = ApiKeys::from(KeyArgs {
            primary_api_key: Some("a".to_string()),
            fallback_api_key: None,
            web_api_key: Some("w".to_string()),
        });
        assert_eq!(keys.primary.as_deref(), Some("a"));
        assert!(keys.fallback.is_none());
        assert_eq!(keys.web.as_deref(), Some("w"));
    }
}
