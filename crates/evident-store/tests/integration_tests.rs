//! Integration tests for evident-store
//!
//! These tests exercise the store through the domain traits only, the way
//! the pipeline crates see it.

use evident_domain::{
    AuditEvent, AuditSink, ClaimStatus, Document, DocumentType, EvidenceStore, EvidenceTier,
    FeedbackKind, FeedbackRecord, FeedbackStore, QaEntry,
};
use evident_store::{MemoryStore, SqliteStore};
use std::sync::Arc;

fn sample_documents() -> Vec<Document> {
    vec![
        Document::new(
            "Merchant Agreement",
            "The merchant agrees to a processing fee of 2.5% per card-present transaction.",
        )
        .in_folder("contracts")
        .with_type(DocumentType::Contract),
        Document::new(
            "Refund Policy",
            "Refunds are returned to the original card within 5 business days.\n\n\
             Chargebacks follow the card network dispute process.",
        )
        .in_folder("policies"),
    ]
}

#[tokio::test]
async fn test_both_stores_agree_on_vector_ranking() {
    let sqlite = SqliteStore::new(":memory:").unwrap();
    let memory = MemoryStore::new();
    for doc in sample_documents() {
        sqlite.insert_document(&doc).await.unwrap();
        memory.add_document(doc);
    }

    let stores: Vec<Arc<dyn EvidenceStore>> = vec![Arc::new(sqlite), Arc::new(memory)];
    for store in stores {
        let hits = store.search_vector("refunds to the original card", 2).await.unwrap();
        assert_eq!(hits[0].document_name, "Refund Policy");
        assert_eq!(hits[0].tier, EvidenceTier::Document);
        assert_eq!(hits[0].metadata.tags, vec!["policies".to_string()]);
    }
}

#[tokio::test]
async fn test_document_type_survives_storage() {
    let store = SqliteStore::new(":memory:").unwrap();
    let doc = sample_documents().remove(0);
    store.insert_document(&doc).await.unwrap();

    let hits = store.search_vector("processing fee", 1).await.unwrap();
    assert_eq!(hits[0].document_type, DocumentType::Contract);
    assert_eq!(store.document_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_qa_priority_order() {
    let store = SqliteStore::new(":memory:").unwrap();
    let mut low = QaEntry::new("Refund timing", "Five days.");
    low.priority = 1;
    let mut high = QaEntry::new("Refund policy", "Within 30 days of purchase.");
    high.priority = 10;
    store.insert_qa(&low).await.unwrap();
    store.insert_qa(&high).await.unwrap();

    let hits = store.search_qa("refund").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].question, "Refund policy");
}

#[tokio::test]
async fn test_audit_log_filters_by_kind() {
    let store = SqliteStore::new(":memory:").unwrap();
    let record = FeedbackRecord::new("merchant-7", "what are the fees", "2.5%", FeedbackKind::Positive);
    store.append(&record).await.unwrap();
    store.record(AuditEvent::Feedback(record)).await.unwrap();
    store
        .record(AuditEvent::FactVerification {
            claim: "Fees are 2.5%".to_string(),
            status: ClaimStatus::Verified,
            confidence: 0.9,
            evidence_count: 2,
            flags: Vec::new(),
            at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    assert_eq!(store.read_audit(None).await.unwrap().len(), 2);
    let verifications = store.read_audit(Some("fact_verification")).await.unwrap();
    assert_eq!(verifications.len(), 1);
    assert_eq!(verifications[0].kind(), "fact_verification");
}
