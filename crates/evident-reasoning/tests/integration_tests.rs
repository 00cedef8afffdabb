//! Integration tests for evident-reasoning
//!
//! The engine runs against the in-memory store and a routed mock completion
//! client. Each prompt kind is routed by its opening phrase.

use evident_domain::{Document, StepStatus};
use evident_llm::MockProvider;
use evident_reasoning::{ReasoningConfig, ReasoningEngine};
use evident_retrieval::Orchestrator;
use evident_store::MemoryStore;
use std::sync::Arc;

const DECOMPOSE: &str = "Break down this complex query";
const STEP: &str = "Execute this reasoning step";
const VERIFY: &str = "Verify this conclusion";
const SYNTHESIZE: &str = "Synthesize a final conclusion";

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_document(Document::new(
        "Equipment Guide",
        "Clover terminals support EMV chip cards and contactless payments.",
    ));
    store.add_document(Document::new(
        "Refund Policy",
        "Refunds are processed to the original card. Chargebacks follow the network dispute process.",
    ));
    store
}

fn routed_llm() -> MockProvider {
    let llm = MockProvider::new("{}");
    llm.add_response(
        DECOMPOSE,
        r#"{"subQueries": ["clover emv terminal", "refund policy chargebacks"],
            "dependencies": [{"from": 1, "to": 2}],
            "queryType": "analytical"}"#,
    );
    llm
}

fn engine(store: Arc<MemoryStore>, llm: &MockProvider) -> ReasoningEngine {
    ReasoningEngine::new(
        Arc::new(Orchestrator::new(store)),
        Arc::new(llm.clone()),
        ReasoningConfig::default(),
    )
}

#[tokio::test]
async fn test_full_chain_with_verified_steps() {
    let llm = routed_llm();
    llm.add_response(
        STEP,
        r#"{"reasoning": "read the guide", "conclusion": "Clover supports EMV", "confidence": 60,
            "sources": ["Equipment Guide"], "assumptions": []}"#,
    );
    llm.add_response(VERIFY, r#"{"supports": true, "contradicts": false, "confidence": 90}"#);
    llm.add_response(SYNTHESIZE, r#"{"conclusion": "Clover terminals accept EMV; refunds go to the card.", "confidence": 80}"#);

    let chain = engine(seeded_store(), &llm)
        .reason("How does EMV support affect refunds and chargebacks?")
        .await;

    assert_eq!(chain.steps.len(), 2);
    assert!(chain.is_contiguous());
    assert_eq!(chain.steps[0].status, StepStatus::Verified);
    assert_eq!(chain.steps[0].description, "clover emv terminal");
    assert_eq!(chain.final_conclusion, "Clover terminals accept EMV; refunds go to the card.");
    assert_eq!(chain.cited_sources, vec!["Equipment Guide"]);
    assert_eq!(chain.audit_trail.len(), 2);
    assert!(chain.audit_trail[0].starts_with("Step 1: clover emv terminal → Clover supports EMV (60% confidence"));
    assert!(chain.overall_confidence > 0.6);
    assert!(chain.overall_confidence <= chain.max_step_confidence() + 0.2 + 1e-9);
    assert_eq!(llm.calls_containing(DECOMPOSE), 1);
    assert_eq!(llm.calls_containing(STEP), 2);
    assert_eq!(llm.calls_containing(SYNTHESIZE), 1);
}

#[tokio::test]
async fn test_failed_step_does_not_stop_the_chain() {
    let llm = routed_llm();
    llm.add_error("Sub-Query: \"refund policy chargebacks\"");
    llm.add_response(
        STEP,
        r#"{"conclusion": "Clover supports EMV", "confidence": 80, "sources": ["Equipment Guide"]}"#,
    );
    llm.add_response(VERIFY, r#"{"supports": true, "contradicts": false, "confidence": 95}"#);
    llm.add_response(SYNTHESIZE, r#"{"conclusion": "Partial answer"}"#);

    let chain = engine(seeded_store(), &llm).reason("What supports EMV and how do refunds work?").await;

    assert_eq!(chain.steps.len(), 2);
    assert_eq!(chain.steps[1].output, "Unable to process this step");
    assert_eq!(chain.steps[1].confidence, 0.3);
    assert_eq!(chain.steps[1].status, StepStatus::Unverified);
    assert!(chain.potential_issues.contains(&"Step 2 has low confidence".to_string()));
    assert_eq!(chain.final_conclusion, "Partial answer");
    assert_eq!(llm.calls_containing(SYNTHESIZE), 1);
}

#[tokio::test]
async fn test_conflicting_evidence_is_flagged() {
    let llm = MockProvider::new("{}");
    llm.add_response(DECOMPOSE, r#"{"subQueries": ["clover emv terminal"]}"#);
    llm.add_response(STEP, r#"{"conclusion": "Clover lacks EMV", "confidence": 70}"#);
    llm.add_response(VERIFY, r#"{"supports": false, "contradicts": true, "confidence": 90}"#);
    llm.add_response(SYNTHESIZE, r#"{"conclusion": "Unclear"}"#);

    let chain = engine(seeded_store(), &llm).reason("Why would Clover lack EMV?").await;

    assert_eq!(chain.steps[0].status, StepStatus::Conflicted);
    assert!(chain.potential_issues.contains(&"Step 1 has conflicting evidence".to_string()));
    // Sources fall back to the retrieved document names
    assert!(chain.cited_sources.contains(&"Equipment Guide".to_string()));
}

#[tokio::test]
async fn test_no_evidence_leaves_steps_unverified() {
    let llm = routed_llm();
    llm.add_response(STEP, r#"{"conclusion": "Unknown", "confidence": 40}"#);
    llm.add_response(SYNTHESIZE, r#"{"confidence": 40}"#);

    let chain = engine(Arc::new(MemoryStore::new()), &llm).reason("Why are fees rising?").await;

    assert!(chain.steps.iter().all(|s| s.status == StepStatus::Unverified));
    assert_eq!(llm.calls_containing(VERIFY), 0);
    assert!(chain
        .potential_issues
        .contains(&"Majority of reasoning steps lack verification".to_string()));
    assert_eq!(chain.final_conclusion, "Unable to reach definitive conclusion");
    assert!((chain.overall_confidence - 0.4).abs() < 1e-9);
}

#[tokio::test]
async fn test_synthesis_failure_keeps_steps() {
    let llm = routed_llm();
    llm.add_response(STEP, r#"{"conclusion": "Something", "confidence": 50}"#);
    llm.add_response(VERIFY, r#"{"supports": true, "contradicts": false, "confidence": 50}"#);
    llm.add_error(SYNTHESIZE);

    let chain = engine(seeded_store(), &llm).reason("Compare EMV and refunds").await;

    assert_eq!(chain.steps.len(), 2);
    assert_eq!(chain.final_conclusion, "Error synthesizing conclusion from reasoning steps");
}

#[tokio::test]
async fn test_decomposition_failure_runs_single_step() {
    let llm = MockProvider::new("{}");
    llm.add_error(DECOMPOSE);
    llm.add_response(STEP, r#"{"conclusion": "Single answer", "confidence": 75}"#);
    llm.add_response(SYNTHESIZE, r#"{"conclusion": "Single answer"}"#);

    let chain = engine(seeded_store(), &llm).reason("Why choose Clover?").await;

    assert_eq!(chain.steps.len(), 1);
    assert_eq!(chain.steps[0].description, "Why choose Clover?");
    assert_eq!(chain.final_conclusion, "Single answer");
}
