//! Integration tests for evident-retrieval
//!
//! The orchestrator runs against the in-memory store and the mock web
//! client, so tier order, caching and audit behavior are observable through
//! call counters and the audit log.

use evident_domain::{AuditEvent, Document, EvidenceTier, QaEntry};
use evident_llm::MockWebSearch;
use evident_retrieval::{
    CacheSweeper, Orchestrator, OrchestratorConfig, OutcomeTier, NO_EVIDENCE_REASON,
};
use evident_store::MemoryStore;
use std::sync::Arc;

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_qa(QaEntry::new(
        "What is the refund policy?",
        "Refunds are returned to the original card within 5 business days.",
    ));
    store.add_document(Document::new(
        "Refund Policy",
        "Refunds are processed to the original card. Chargebacks follow the network dispute process.",
    ));
    store.add_document(Document::new(
        "Equipment Guide",
        "Clover terminals support EMV chip cards and contactless payments.",
    ));
    store
}

#[tokio::test]
async fn test_faq_hit_skips_vector_search() {
    let store = seeded_store();
    let orchestrator = Orchestrator::new(store.clone());

    let outcome = orchestrator.search("What's the refund policy?").await;

    assert_eq!(outcome.tier, OutcomeTier::Faq);
    assert_eq!(outcome.evidence.len(), 1);
    assert_eq!(outcome.evidence[0].document_name, "FAQ Knowledge Base");
    assert!(outcome.evidence[0].snippet.contains("5 business days"));
    assert_eq!(store.vector_calls(), 0);
    assert!(outcome.reason.is_none());
}

#[tokio::test]
async fn test_document_tier_when_faq_misses() {
    let store = seeded_store();
    let orchestrator = Orchestrator::new(store.clone());

    let outcome = orchestrator.search("clover emv terminal").await;

    assert_eq!(outcome.tier, OutcomeTier::Document);
    assert_eq!(outcome.evidence[0].document_name, "Equipment Guide");
    assert!(outcome.evidence.iter().all(|e| e.tier == EvidenceTier::Document));
    assert!(outcome.evidence.len() <= OrchestratorConfig::default().max_document_results);
    assert!(store.vector_calls() >= 1);
}

#[tokio::test]
async fn test_cached_result_skips_every_tier() {
    let store = seeded_store();
    let orchestrator = Orchestrator::new(store.clone());

    orchestrator.search("clover emv terminal").await;
    let (qa, vector) = (store.qa_calls(), store.vector_calls());

    let outcome = orchestrator.search("  CLOVER emv   terminal ").await;
    assert_eq!(outcome.tier, OutcomeTier::Cache);
    assert_eq!(store.qa_calls(), qa);
    assert_eq!(store.vector_calls(), vector);
}

#[tokio::test]
async fn test_policy_rejection_returns_reason_without_web_call() {
    let store = Arc::new(MemoryStore::new());
    let web = Arc::new(MockWebSearch::new("irrelevant", Vec::new()));
    let orchestrator = Orchestrator::builder(store.clone()).web(web.clone(), store.clone()).build();

    let outcome = orchestrator.search("online casino payment processing").await;

    assert_eq!(outcome.tier, OutcomeTier::None);
    assert!(outcome.evidence.is_empty());
    assert_eq!(outcome.reason.as_deref(), Some("Content contains excluded keyword: casino"));
    assert!(web.queries().is_empty());
    match store.audit_events().as_slice() {
        [AuditEvent::WebSearchFallback { executed, query, .. }] => {
            assert!(!executed);
            assert_eq!(query, "online casino payment processing");
        }
        other => panic!("unexpected audit log: {:?}", other),
    }
}

#[tokio::test]
async fn test_web_fallback_is_audited_and_not_cached() {
    let store = Arc::new(MemoryStore::new());
    let web = Arc::new(MockWebSearch::new(
        "Visa announced interchange adjustments for card-not-present merchants effective April.",
        vec!["https://example.com/visa".to_string()],
    ));
    let orchestrator = Orchestrator::builder(store.clone()).web(web.clone(), store.clone()).build();

    let first = orchestrator.search("visa interchange changes").await;
    assert_eq!(first.tier, OutcomeTier::Web);
    assert_eq!(first.evidence.len(), 2);

    let second = orchestrator.search("visa interchange changes").await;
    assert_eq!(second.tier, OutcomeTier::Web);
    assert_eq!(web.queries().len(), 2);

    let audits = store.audit_events();
    assert_eq!(audits.len(), 2);
    assert!(audits.iter().all(|e| matches!(
        e,
        AuditEvent::WebSearchFallback { executed: true, citations, .. } if citations.len() == 1
    )));
}

#[tokio::test]
async fn test_store_failures_degrade_to_web() {
    let store = seeded_store();
    store.fail_qa(true);
    store.fail_vector(true);
    let web = Arc::new(MockWebSearch::new("Refunds usually settle in 5-7 days for card payments.", Vec::new()));
    let orchestrator = Orchestrator::builder(store.clone()).web(web.clone(), store.clone()).build();

    let outcome = orchestrator.search("refund settlement timing for card payments").await;
    assert_eq!(outcome.tier, OutcomeTier::Web);
    assert_eq!(web.queries().len(), 1);
}

#[tokio::test]
async fn test_everything_failing_still_returns_outcome() {
    let store = seeded_store();
    store.fail_qa(true);
    store.fail_vector(true);
    let web = Arc::new(MockWebSearch::failing());
    let orchestrator = Orchestrator::builder(store.clone()).web(web, store.clone()).build();

    let outcome = orchestrator.search("refund settlement timing for card payments").await;
    assert_eq!(outcome.tier, OutcomeTier::None);
    assert_eq!(outcome.reason.as_deref(), Some(NO_EVIDENCE_REASON));

    // failed searches are not cached
    store.fail_qa(false);
    assert_eq!(orchestrator.search("refund policy").await.tier, OutcomeTier::Faq);
}

#[tokio::test]
async fn test_search_documents_respects_k() {
    let store = seeded_store();
    let orchestrator = Orchestrator::new(store.clone());

    let items = orchestrator.search_documents("refund chargeback card", 1).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(items.iter().all(|i| (0.0..=1.0).contains(&i.relevance)));
}

#[tokio::test]
async fn test_config_from_toml_drives_orchestrator() {
    let config = OrchestratorConfig::from_toml(
        r#"
        faq_threshold = 0.95
        max_document_results = 1
        vector_k = 5
        max_query_variants = 4
        web_enabled = false

        [cache]
        ttl_secs = 60
        max_entries = 10
        similarity_threshold = 0.9
        sweep_interval_secs = 30
        "#,
    )
    .unwrap();
    let store = seeded_store();
    let orchestrator = Orchestrator::builder(store.clone()).config(config.clone()).build();

    // FAQ threshold too high for a partial question match
    let outcome = orchestrator.search("refund card days").await;
    assert_ne!(outcome.tier, OutcomeTier::Faq);
    assert!(outcome.evidence.len() <= 1);

    let mut sweeper = CacheSweeper::new(orchestrator.cache(), &config.cache);
    sweeper.run_cycles(1).await;
    assert_eq!(sweeper.metrics().cycles, 1);
}
