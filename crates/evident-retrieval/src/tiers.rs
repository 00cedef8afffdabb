//! Search tiers
//!
//! Each tier is one link in the orchestrator's chain of responsibility.
//! A tier either finds evidence, finds nothing, or fails; the orchestrator
//! moves on in the last two cases.

use crate::expansion::{query_variants, search_terms};
use crate::policy::AppropriatenessPolicy;
use crate::reranker::Reranker;
use crate::scoring::{document_score, faq_score, merge_faq_entries};
use async_trait::async_trait;
use chrono::Utc;
use evident_domain::{
    truncate_chars, AuditEvent, AuditSink, EvidenceItem, EvidenceMetadata, EvidenceStore,
    EvidenceTier, PipelineError, PipelineResult, QaEntry, WebSearchClient,
};
use std::collections::HashMap;
use std::sync::Arc;

/// What a tier produced
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    /// Evidence found; later tiers are skipped
    Found(Vec<EvidenceItem>),
    /// Nothing usable, with an optional explanation
    NotFound(Option<String>),
}

/// One level of the search hierarchy
#[async_trait]
pub trait SearchTier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether results from this tier may be cached
    fn cacheable(&self) -> bool {
        true
    }

    /// Search the tier
    async fn search(&self, query: &str) -> PipelineResult<TierOutcome>;
}

/// Curated Q&A tier
pub struct FaqTier {
    store: Arc<dyn EvidenceStore>,
    threshold: f64,
}

impl FaqTier {
    /// Create a FAQ tier with a minimum entry score
    pub fn new(store: Arc<dyn EvidenceStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    async fn candidates(&self, query: &str) -> PipelineResult<Vec<QaEntry>> {
        let mut entries = self.store.search_qa(query).await?;
        if entries.is_empty() {
            for term in search_terms(query) {
                match self.store.search_qa(&term).await {
                    Ok(found) => entries.extend(found),
                    Err(e) => tracing::warn!("FAQ term search '{}' failed: {}", term, e),
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        entries.retain(|e| seen.insert(e.id));
        Ok(entries)
    }
}

#[async_trait]
impl SearchTier for FaqTier {
    fn name(&self) -> &'static str {
        "faq"
    }

    async fn search(&self, query: &str) -> PipelineResult<TierOutcome> {
        let scored: Vec<(QaEntry, f64)> = self
            .candidates(query)
            .await?
            .into_iter()
            .map(|entry| {
                let score = faq_score(query, &entry);
                (entry, score)
            })
            .filter(|(_, score)| *score >= self.threshold)
            .collect();

        if scored.is_empty() {
            return Ok(TierOutcome::NotFound(None));
        }
        Ok(TierOutcome::Found(merge_faq_entries(scored)))
    }
}

/// Document tier settings
#[derive(Debug, Clone)]
pub struct DocumentTierSettings {
    /// Nearest neighbours per variant
    pub vector_k: usize,
    /// Maximum expansions per query
    pub max_variants: usize,
    /// Maximum items returned by [`SearchTier::search`]
    pub max_results: usize,
}

/// Vector search over document chunks with query expansion and reranking
pub struct DocumentTier {
    store: Arc<dyn EvidenceStore>,
    reranker: Reranker,
    settings: DocumentTierSettings,
}

impl DocumentTier {
    /// Create a document tier
    pub fn new(store: Arc<dyn EvidenceStore>, reranker: Reranker, settings: DocumentTierSettings) -> Self {
        Self {
            store,
            reranker,
            settings,
        }
    }

    /// Retrieve up to `k` scored and reranked document items
    ///
    /// Fails only when every variant search failed.
    pub async fn retrieve(&self, query: &str, k: usize) -> PipelineResult<Vec<EvidenceItem>> {
        let variants = query_variants(query, self.settings.max_variants);
        let mut best: HashMap<String, EvidenceItem> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut last_error: Option<PipelineError> = None;
        let mut succeeded = 0usize;

        for variant in &variants {
            match self.store.search_vector(variant, self.settings.vector_k).await {
                Ok(items) => {
                    succeeded += 1;
                    for item in items {
                        match best.get(&item.source_id) {
                            Some(existing) if existing.relevance >= item.relevance => {}
                            Some(_) => {
                                best.insert(item.source_id.clone(), item);
                            }
                            None => {
                                order.push(item.source_id.clone());
                                best.insert(item.source_id.clone(), item);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Vector search for variant '{}' failed: {}", variant, e);
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let scored: Vec<EvidenceItem> = order
            .iter()
            .filter_map(|id| best.remove(id))
            .map(|item| {
                let score = document_score(query, &item);
                item.rescored(score)
            })
            .filter(|item| item.relevance > 0.0)
            .collect();

        let mut ranked = self.reranker.rerank(query, scored, &[], Utc::now());
        ranked.truncate(k);
        tracing::debug!("Document retrieval complete: {} items from {} variants", ranked.len(), variants.len());
        Ok(ranked)
    }
}

#[async_trait]
impl SearchTier for DocumentTier {
    fn name(&self) -> &'static str {
        "document"
    }

    async fn search(&self, query: &str) -> PipelineResult<TierOutcome> {
        let items = self.retrieve(query, self.settings.max_results).await?;
        if items.is_empty() {
            Ok(TierOutcome::NotFound(None))
        } else {
            Ok(TierOutcome::Found(items))
        }
    }
}

const WEB_SUMMARY_CHARS: usize = 500;

/// Web search fallback, gated by the appropriateness policy
pub struct WebTier {
    client: Arc<dyn WebSearchClient>,
    audit: Arc<dyn AuditSink>,
    policy: AppropriatenessPolicy,
}

impl WebTier {
    /// Create a web tier
    pub fn new(client: Arc<dyn WebSearchClient>, audit: Arc<dyn AuditSink>, policy: AppropriatenessPolicy) -> Self {
        Self { client, audit, policy }
    }

    async fn audit(&self, query: &str, reason: &str, executed: bool, summary: String, citations: Vec<String>) {
        let event = AuditEvent::WebSearchFallback {
            query: query.to_string(),
            reason: reason.to_string(),
            executed,
            result_summary: summary,
            citations,
            at: Utc::now(),
        };
        if let Err(e) = self.audit.record(event).await {
            tracing::warn!("Failed to record web search audit event: {}", e);
        }
    }
}

#[async_trait]
impl SearchTier for WebTier {
    fn name(&self) -> &'static str {
        "web"
    }

    fn cacheable(&self) -> bool {
        false
    }

    async fn search(&self, query: &str) -> PipelineResult<TierOutcome> {
        let decision = self.policy.evaluate(query);
        if !decision.passed {
            tracing::info!("Web search refused for '{}': {}", query, decision.reason);
            self.audit(query, &decision.reason, false, String::new(), Vec::new()).await;
            return Ok(TierOutcome::NotFound(Some(decision.reason)));
        }

        let reason = "No internal evidence found";
        let result = match self.client.search(query).await {
            Ok(result) => result,
            Err(e) => {
                self.audit(query, reason, true, format!("Web search failed: {}", e), Vec::new()).await;
                return Err(e);
            }
        };

        self.audit(
            query,
            reason,
            true,
            truncate_chars(&result.content, WEB_SUMMARY_CHARS),
            result.citations.clone(),
        )
        .await;

        if result.content.trim().is_empty() {
            return Ok(TierOutcome::NotFound(None));
        }

        let mut items = vec![EvidenceItem::new(
            "web-search",
            "Web Search",
            result.content.clone(),
            result.confidence,
            EvidenceTier::Web,
        )];
        for url in &result.citations {
            items.push(
                EvidenceItem::new(url.clone(), url.clone(), truncate_chars(&result.content, 200), result.confidence, EvidenceTier::Web)
                    .with_metadata(EvidenceMetadata {
                        url: Some(url.clone()),
                        ..EvidenceMetadata::default()
                    }),
            );
        }
        Ok(TierOutcome::Found(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_llm::MockWebSearch;
    use evident_store::MemoryStore;

    #[tokio::test]
    async fn test_faq_tier_threshold() {
        let store = Arc::new(MemoryStore::new());
        store.add_qa(QaEntry::new("What is the refund policy?", "Refunds within 30 days."));
        let tier = FaqTier::new(store.clone(), 0.3);

        assert!(matches!(tier.search("refund policy").await.unwrap(), TierOutcome::Found(ref items) if items.len() == 1));
        assert_eq!(tier.search("terminal hardware").await.unwrap(), TierOutcome::NotFound(None));
    }

    #[tokio::test]
    async fn test_document_tier_fails_only_when_every_variant_fails() {
        let store = Arc::new(MemoryStore::new());
        store.fail_vector(true);
        let tier = DocumentTier::new(
            store.clone(),
            Reranker::default(),
            DocumentTierSettings {
                vector_k: 5,
                max_variants: 15,
                max_results: 8,
            },
        );
        assert!(tier.search("tsys pricing").await.is_err());
        // original plus expansions
        assert!(store.vector_calls() > 1);
    }

    #[tokio::test]
    async fn test_web_tier_policy_refusal_is_audited() {
        let store = Arc::new(MemoryStore::new());
        let web = Arc::new(MockWebSearch::new("content", Vec::new()));
        let tier = WebTier::new(web.clone(), store.clone(), AppropriatenessPolicy::default());

        let outcome = tier.search("best casino bonuses").await.unwrap();
        assert_eq!(
            outcome,
            TierOutcome::NotFound(Some("Content contains excluded keyword: casino".to_string()))
        );
        assert!(web.queries().is_empty());
        assert!(matches!(
            store.audit_events().as_slice(),
            [AuditEvent::WebSearchFallback { executed: false, .. }]
        ));
    }

    #[tokio::test]
    async fn test_web_tier_returns_item_per_citation() {
        let store = Arc::new(MemoryStore::new());
        let web = Arc::new(MockWebSearch::new(
            "Visa raised interchange on card-not-present transactions in April.",
            vec!["https://example.com/a".to_string(), "https://example.com/b".to_string()],
        ));
        let tier = WebTier::new(web, store.clone(), AppropriatenessPolicy::default());

        match tier.search("visa interchange changes").await.unwrap() {
            TierOutcome::Found(items) => {
                assert_eq!(items.len(), 3);
                assert!(items.iter().all(|i| i.tier == EvidenceTier::Web));
                assert_eq!(items[1].metadata.url.as_deref(), Some("https://example.com/a"));
            }
            other => panic!("expected evidence, got {:?}", other),
        }
        assert!(matches!(
            store.audit_events().as_slice(),
            [AuditEvent::WebSearchFallback { executed: true, citations, .. }] if citations.len() == 2
        ));
    }
}
