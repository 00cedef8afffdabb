//! Integration tests for evident-cli
//!
//! The pipeline is assembled over a SQLite file in a temp directory with a
//! mock completion client, the same way the binary wires a real profile.

use evident_cli::config::EngineSettings;
use evident_cli::Pipeline;
use evident_domain::{Document, DocumentType, EvidenceTier, FeedbackKind, FeedbackRecord, ProfileStore, QaEntry};
use evident_llm::{MockProvider, MockWebSearch};
use evident_store::SqliteStore;
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir, llm: &MockProvider) -> Pipeline {
    let store = Arc::new(SqliteStore::new(dir.path().join("evident.db")).unwrap());
    Pipeline::assemble(store, Arc::new(llm.clone()), None, &EngineSettings::default())
}

#[tokio::test]
async fn test_answer_from_imported_faq() {
    let dir = TempDir::new().unwrap();
    let llm = MockProvider::new("Refunds are accepted within 30 days of purchase.");
    let pipeline = open(&dir, &llm);

    pipeline
        .store
        .insert_qa(&QaEntry::new("What is the refund policy?", "Refunds within 30 days."))
        .await
        .unwrap();

    let answer = pipeline.assistant.answer("alice", "What is the refund policy?", &[]).await;

    assert_eq!(answer.message, "Refunds are accepted within 30 days of purchase.");
    assert!(answer.sources.iter().any(|s| s.tier == EvidenceTier::Faq));
    assert!(llm.calls_containing("Refunds within 30 days.") >= 1);
}

#[tokio::test]
async fn test_verification_is_audited_in_sqlite() {
    let dir = TempDir::new().unwrap();
    let llm = MockProvider::new("{}");
    let pipeline = open(&dir, &llm);

    let document = Document::new(
        "Processing Fee Policy",
        "The processing fee for swiped card transactions is 2.5% per transaction.",
    )
    .with_type(DocumentType::Policy);
    pipeline.store.insert_document(&document).await.unwrap();

    let verdict = pipeline.verifier.verify("The processing fee is 2.5%").await;
    assert!(!verdict.claim.is_empty());

    let audits = pipeline.store.read_audit(Some("fact_verification")).await.unwrap();
    assert_eq!(audits.len(), 1);
}

#[tokio::test]
async fn test_feedback_updates_stored_profile() {
    let dir = TempDir::new().unwrap();
    let llm = MockProvider::new("{}");
    let pipeline = open(&dir, &llm);

    let record = FeedbackRecord::new("bob", "What is the fee?", "2.5%", FeedbackKind::Positive);
    let outcome = pipeline.learning.process_feedback(record).await;
    assert_eq!(outcome.profile.total_interactions, 1);

    let stored = pipeline.store.load("bob").await.unwrap().unwrap();
    assert_eq!(stored.total_interactions, 1);
    assert!(stored.accuracy > 0.7);

    let audits = pipeline.store.read_audit(Some("feedback")).await.unwrap();
    assert_eq!(audits.len(), 1);
}

#[tokio::test]
async fn test_web_tier_is_wired_when_enabled() {
    let dir = TempDir::new().unwrap();
    let llm = MockProvider::new("Shift4 offers a range of payment terminals.");
    let store = Arc::new(SqliteStore::new(dir.path().join("evident.db")).unwrap());
    let web = Arc::new(MockWebSearch::new(
        "Shift4 payment terminals support EMV and contactless merchant processing.",
        vec!["https://example.com/shift4".to_string()],
    ));
    let pipeline = Pipeline::assemble(store, Arc::new(llm), Some(web), &EngineSettings::default());

    let outcome = pipeline.orchestrator.search("shift4 payment terminal merchant processing").await;
    assert!(outcome.evidence.iter().all(|e| e.tier == EvidenceTier::Web));
    assert!(!outcome.evidence.is_empty());

    let audits = pipeline.store.read_audit(Some("web_search_fallback")).await.unwrap();
    assert_eq!(audits.len(), 1);
}

#[tokio::test]
async fn test_without_web_client_search_finds_nothing() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir, &MockProvider::new("{}"));

    let outcome = pipeline.orchestrator.search("shift4 payment terminal merchant processing").await;
    assert!(outcome.evidence.is_empty());
    assert!(outcome.reason.is_some());
}
