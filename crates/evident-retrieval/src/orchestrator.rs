//! Search hierarchy orchestrator
//!
//! Runs the cache, then the FAQ, document and web tiers in order and stops
//! at the first tier that produces evidence. FAQ and document results are
//! cached; web results are not.

use crate::cache::{Lookup, RetrievalCache};
use crate::config::OrchestratorConfig;
use crate::policy::AppropriatenessPolicy;
use crate::reranker::Reranker;
use crate::tiers::{DocumentTier, DocumentTierSettings, FaqTier, SearchTier, TierOutcome, WebTier};
use evident_domain::{
    normalize_query, AuditSink, EvidenceItem, EvidenceStore, EvidenceTier, PipelineResult,
    WebSearchClient,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reason reported when every tier came up empty
pub const NO_EVIDENCE_REASON: &str = "No internal or external evidence found";

/// Where the evidence of a search came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTier {
    /// Retrieval cache
    Cache,
    /// Curated Q&A
    Faq,
    /// Document vector search
    Document,
    /// Web search
    Web,
    /// Nothing found
    None,
}

impl From<EvidenceTier> for OutcomeTier {
    fn from(tier: EvidenceTier) -> Self {
        match tier {
            EvidenceTier::Faq => OutcomeTier::Faq,
            EvidenceTier::Document => OutcomeTier::Document,
            EvidenceTier::Web => OutcomeTier::Web,
        }
    }
}

/// Result of [`Orchestrator::search`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Evidence in ranked order
    pub evidence: Vec<EvidenceItem>,
    /// Tier that produced it
    pub tier: OutcomeTier,
    /// Why nothing was found, when empty
    pub reason: Option<String>,
}

impl SearchOutcome {
    fn found(evidence: Vec<EvidenceItem>, tier: OutcomeTier) -> Self {
        Self {
            evidence,
            tier,
            reason: None,
        }
    }

    fn empty(reason: impl Into<String>) -> Self {
        Self {
            evidence: Vec::new(),
            tier: OutcomeTier::None,
            reason: Some(reason.into()),
        }
    }
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    store: Arc<dyn EvidenceStore>,
    config: OrchestratorConfig,
    web: Option<(Arc<dyn WebSearchClient>, Arc<dyn AuditSink>)>,
    policy: AppropriatenessPolicy,
}

impl OrchestratorBuilder {
    /// Use this configuration
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable the web tier; fallbacks are written to `audit`
    pub fn web(mut self, client: Arc<dyn WebSearchClient>, audit: Arc<dyn AuditSink>) -> Self {
        self.web = Some((client, audit));
        self
    }

    /// Replace the appropriateness policy
    pub fn policy(mut self, policy: AppropriatenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Orchestrator {
        let config = self.config;
        let documents = Arc::new(DocumentTier::new(
            self.store.clone(),
            Reranker::new(config.reranker.clone()),
            DocumentTierSettings {
                vector_k: config.vector_k,
                max_variants: config.max_query_variants,
                max_results: config.max_document_results,
            },
        ));

        let mut tiers: Vec<Arc<dyn SearchTier>> = vec![
            Arc::new(FaqTier::new(self.store.clone(), config.faq_threshold)),
            documents.clone(),
        ];
        match self.web {
            Some((client, audit)) if config.web_enabled => {
                tiers.push(Arc::new(WebTier::new(client, audit, self.policy)));
            }
            _ => {}
        }

        Orchestrator {
            cache: Arc::new(RetrievalCache::new(config.cache.clone())),
            tiers,
            documents,
        }
    }
}

/// Tiered evidence search
pub struct Orchestrator {
    cache: Arc<RetrievalCache>,
    tiers: Vec<Arc<dyn SearchTier>>,
    documents: Arc<DocumentTier>,
}

impl Orchestrator {
    /// Start building an orchestrator over `store`
    pub fn builder(store: Arc<dyn EvidenceStore>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            store,
            config: OrchestratorConfig::default(),
            web: None,
            policy: AppropriatenessPolicy::default(),
        }
    }

    /// Orchestrator with default configuration and no web tier
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self::builder(store).build()
    }

    /// The retrieval cache, shared with the sweeper
    pub fn cache(&self) -> Arc<RetrievalCache> {
        self.cache.clone()
    }

    /// Search for evidence
    ///
    /// Never fails: tier errors are logged and treated as empty results.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return SearchOutcome::empty(NO_EVIDENCE_REASON);
        }

        let key = normalized.as_str();
        let lookup = self
            .cache
            .get_or_compute(key, move || async move { Ok(self.run_tiers(key, true).await.0) })
            .await;

        match lookup {
            Ok(Lookup::Hit(entry)) => {
                tracing::info!("Search for '{}' served from cache ({} items)", normalized, entry.evidence.len());
                return SearchOutcome::found(entry.evidence, OutcomeTier::Cache);
            }
            Ok(Lookup::Computed(evidence)) if !evidence.is_empty() => {
                let tier = evidence
                    .first()
                    .map(|item| OutcomeTier::from(item.tier))
                    .unwrap_or(OutcomeTier::None);
                tracing::info!("Search for '{}' answered by {:?} tier ({} items)", normalized, tier, evidence.len());
                return SearchOutcome::found(evidence, tier);
            }
            Ok(Lookup::Computed(_)) => {}
            Err(e) => tracing::warn!("Cached tiers failed for '{}': {}", normalized, e),
        }

        let (evidence, reason) = self.run_tiers(key, false).await;
        if evidence.is_empty() {
            let reason = reason.unwrap_or_else(|| NO_EVIDENCE_REASON.to_string());
            tracing::info!("No evidence for '{}': {}", normalized, reason);
            SearchOutcome::empty(reason)
        } else {
            tracing::info!("Search for '{}' answered by web tier ({} items)", normalized, evidence.len());
            SearchOutcome::found(evidence, OutcomeTier::Web)
        }
    }

    /// Run the tiers whose cacheability matches, in order, until one finds evidence
    ///
    /// Also returns the last explanation a tier gave for finding nothing.
    async fn run_tiers(&self, query: &str, cacheable: bool) -> (Vec<EvidenceItem>, Option<String>) {
        let mut last_reason = None;
        for tier in self.tiers.iter().filter(|t| t.cacheable() == cacheable) {
            match tier.search(query).await {
                Ok(TierOutcome::Found(items)) => {
                    tracing::debug!("Tier {} found {} items", tier.name(), items.len());
                    return (items, None);
                }
                Ok(TierOutcome::NotFound(reason)) => {
                    tracing::debug!("Tier {} found nothing", tier.name());
                    if reason.is_some() {
                        last_reason = reason;
                    }
                }
                Err(e) => tracing::warn!("Tier {} failed for '{}': {}", tier.name(), query, e),
            }
        }
        (Vec::new(), last_reason)
    }

    /// Document tier alone, uncached
    pub async fn search_documents(&self, query: &str, k: usize) -> PipelineResult<Vec<EvidenceItem>> {
        self.documents.retrieve(query, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_domain::{Document, QaEntry};
    use evident_llm::MockWebSearch;
    use evident_store::MemoryStore;

    #[tokio::test]
    async fn test_empty_query_finds_nothing() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Orchestrator::new(store.clone());
        let outcome = orchestrator.search("   ").await;
        assert_eq!(outcome.tier, OutcomeTier::None);
        assert_eq!(outcome.reason.as_deref(), Some(NO_EVIDENCE_REASON));
        assert_eq!(store.qa_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_search_hits_cache() {
        let store = Arc::new(MemoryStore::new());
        store.add_qa(QaEntry::new("What is the refund policy?", "Refunds within 30 days."));
        let orchestrator = Orchestrator::new(store.clone());

        assert_eq!(orchestrator.search("refund policy").await.tier, OutcomeTier::Faq);
        let calls = store.qa_calls();
        let again = orchestrator.search("Refund  Policy").await;
        assert_eq!(again.tier, OutcomeTier::Cache);
        assert_eq!(store.qa_calls(), calls);
    }

    #[tokio::test]
    async fn test_web_disabled_by_config() {
        let store = Arc::new(MemoryStore::new());
        let web = Arc::new(MockWebSearch::new("answer", Vec::new()));
        let orchestrator = Orchestrator::builder(store.clone())
            .config(OrchestratorConfig::strict())
            .web(web.clone(), store.clone())
            .build();

        let outcome = orchestrator.search("payment gateway outage").await;
        assert_eq!(outcome.tier, OutcomeTier::None);
        assert!(web.queries().is_empty());
    }

    #[tokio::test]
    async fn test_search_documents_is_uncached() {
        let store = Arc::new(MemoryStore::new());
        store.add_document(Document::new("Equipment Guide", "Clover terminals support EMV and contactless payments."));
        let orchestrator = Orchestrator::new(store.clone());

        let first = orchestrator.search_documents("clover terminals", 3).await.unwrap();
        assert!(!first.is_empty());
        let calls = store.vector_calls();
        orchestrator.search_documents("clover terminals", 3).await.unwrap();
        assert!(store.vector_calls() > calls);
    }
}
