//! Multi-step reasoning engine
//!
//! A query moves through an explicit state machine:
//!
//! ```text
//! Decomposing -> Decomposed -> StepExecuting(i) ... -> Synthesizing -> Verifying -> Done
//! ```
//!
//! Any state may move to `Failed`, which resolves to the failsafe chain.
//! Individual completion failures degrade in place and never reach `Failed`.

use crate::chain::{audit_trail, chain_issues, cited_sources, failed_step, overall_confidence, FAILSAFE_CONFIDENCE};
use crate::config::ReasoningConfig;
use crate::prompt;
use evident_domain::{
    classify_query, CompletionClient, CompletionRequest, Decomposition, EvidenceItem, InferenceKind,
    LogicalInference, PipelineError, PipelineResult, QueryType, ReasoningChain, ReasoningStep,
    StepStatus,
};
use evident_llm::complete_json;
use evident_retrieval::Orchestrator;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Conclusion of the failsafe chain
pub const FAILSAFE_CONCLUSION: &str = "Unable to process query through multi-step reasoning. \
     Please try a simpler question or provide more specific context.";

const NO_CONCLUSION: &str = "Unable to reach definitive conclusion";
const SYNTHESIS_ERROR: &str = "Error synthesizing conclusion from reasoning steps";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecompositionReply {
    #[serde(default)]
    sub_queries: Vec<String>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
    #[serde(default)]
    query_type: Option<String>,
}

/// `to` depends on `from`
#[derive(Debug, Deserialize)]
struct Dependency {
    from: usize,
    to: usize,
}

#[derive(Debug, Deserialize)]
struct StepReply {
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    conclusion: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    assumptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SupportReply {
    #[serde(default)]
    supports: bool,
    #[serde(default)]
    contradicts: bool,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    #[serde(default)]
    conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InferenceReply {
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    validity: Option<f64>,
    #[serde(default)]
    soundness: Option<f64>,
    #[serde(default)]
    explanation: String,
}

/// Where a reasoning run currently stands
#[derive(Debug)]
enum ReasoningState {
    Decomposing,
    Decomposed(Decomposition),
    StepExecuting {
        decomposition: Decomposition,
        index: usize,
        steps: Vec<ReasoningStep>,
    },
    Synthesizing {
        decomposition: Decomposition,
        steps: Vec<ReasoningStep>,
    },
    Verifying {
        decomposition: Decomposition,
        steps: Vec<ReasoningStep>,
        conclusion: String,
    },
    Done(ReasoningChain),
    Failed(String),
}

impl ReasoningState {
    fn name(&self) -> &'static str {
        match self {
            ReasoningState::Decomposing => "decomposing",
            ReasoningState::Decomposed(_) => "decomposed",
            ReasoningState::StepExecuting { .. } => "step_executing",
            ReasoningState::Synthesizing { .. } => "synthesizing",
            ReasoningState::Verifying { .. } => "verifying",
            ReasoningState::Done(_) => "done",
            ReasoningState::Failed(_) => "failed",
        }
    }
}

/// Answers complex questions as an ordered chain of verified steps
pub struct ReasoningEngine {
    orchestrator: Arc<Orchestrator>,
    llm: Arc<dyn CompletionClient>,
    config: ReasoningConfig,
}

impl ReasoningEngine {
    /// Create an engine
    pub fn new(orchestrator: Arc<Orchestrator>, llm: Arc<dyn CompletionClient>, config: ReasoningConfig) -> Self {
        Self {
            orchestrator,
            llm,
            config,
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: &CompletionRequest) -> PipelineResult<T> {
        let (value, model) = timeout(self.config.call_timeout(), complete_json::<T>(self.llm.as_ref(), request))
            .await
            .map_err(|_| PipelineError::ExternalServiceFailure("reasoning call timed out".to_string()))??;
        debug!("Reasoning call answered by {}", model);
        Ok(value)
    }

    /// Run the full reasoning pipeline for a query
    ///
    /// Never fails: unrecoverable states resolve to [`failsafe_chain`].
    pub async fn reason(&self, query: &str) -> ReasoningChain {
        let mut state = ReasoningState::Decomposing;
        loop {
            debug!("Reasoning state: {}", state.name());
            state = match state {
                ReasoningState::Decomposing => {
                    if query.trim().is_empty() {
                        ReasoningState::Failed("empty query".to_string())
                    } else {
                        ReasoningState::Decomposed(self.decompose(query).await)
                    }
                }
                ReasoningState::Decomposed(decomposition) => {
                    if decomposition.sub_queries.is_empty() {
                        ReasoningState::Failed("decomposition produced no steps".to_string())
                    } else {
                        ReasoningState::StepExecuting {
                            decomposition,
                            index: 0,
                            steps: Vec::new(),
                        }
                    }
                }
                ReasoningState::StepExecuting {
                    decomposition,
                    index,
                    mut steps,
                } => {
                    let question = decomposition.sub_queries[index].question.clone();
                    let step = self.execute_step(index + 1, &question, &steps).await;
                    steps.push(step);
                    if index + 1 < decomposition.sub_queries.len() {
                        ReasoningState::StepExecuting {
                            decomposition,
                            index: index + 1,
                            steps,
                        }
                    } else {
                        ReasoningState::Synthesizing { decomposition, steps }
                    }
                }
                ReasoningState::Synthesizing { decomposition, steps } => {
                    let conclusion = self.synthesize(&decomposition.query, &steps).await;
                    ReasoningState::Verifying {
                        decomposition,
                        steps,
                        conclusion,
                    }
                }
                ReasoningState::Verifying {
                    decomposition,
                    steps,
                    conclusion,
                } => {
                    let chain = ReasoningChain {
                        query: decomposition.query,
                        query_type: decomposition.query_type,
                        overall_confidence: overall_confidence(&steps),
                        cited_sources: cited_sources(&steps),
                        potential_issues: chain_issues(&steps, self.config.low_confidence),
                        audit_trail: audit_trail(&steps),
                        final_conclusion: conclusion,
                        steps,
                    };
                    if chain.is_contiguous() {
                        ReasoningState::Done(chain)
                    } else {
                        ReasoningState::Failed("step numbering is not contiguous".to_string())
                    }
                }
                ReasoningState::Done(chain) => {
                    info!(
                        "Reasoning complete: {} steps, confidence {:.2}, {} issues",
                        chain.steps.len(),
                        chain.overall_confidence,
                        chain.potential_issues.len()
                    );
                    return chain;
                }
                ReasoningState::Failed(reason) => {
                    warn!("Reasoning failed ({}); returning failsafe chain", reason);
                    return failsafe_chain(query);
                }
            };
        }
    }

    /// Split a query into at most `max_sub_queries` ordered sub-queries
    ///
    /// Degrades to a single sub-query equal to the original on any failure.
    pub async fn decompose(&self, query: &str) -> Decomposition {
        let request = prompt::decomposition(query, self.config.decompose_temperature);
        let reply: DecompositionReply = match self.call(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Decomposition failed, using the query as a single step: {}", e);
                return Decomposition::single(query);
            }
        };

        let questions: Vec<String> = reply
            .sub_queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(self.config.max_sub_queries)
            .collect();
        if questions.is_empty() {
            debug!("Decomposition returned no sub-queries");
            return Decomposition::single(query);
        }

        let parts = questions
            .into_iter()
            .enumerate()
            .map(|(idx, question)| {
                let id = idx + 1;
                let deps = reply.dependencies.iter().filter(|d| d.to == id).map(|d| d.from).collect();
                let query_type = classify_query(&question);
                (question, deps, query_type)
            })
            .collect();

        let mut decomposition = Decomposition::from_parts(query, parts);
        if let Some(query_type) = reply.query_type.as_deref().and_then(QueryType::parse) {
            decomposition.query_type = query_type;
        }
        debug!("Decomposed into {} sub-queries", decomposition.sub_queries.len());
        decomposition
    }

    async fn execute_step(&self, step_number: usize, question: &str, previous: &[ReasoningStep]) -> ReasoningStep {
        let evidence = match self
            .orchestrator
            .search_documents(question, self.config.evidence_per_step)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!("Evidence retrieval for step {} failed: {}", step_number, e);
                Vec::new()
            }
        };

        let request = prompt::step(step_number, question, previous, &evidence, self.config.step_temperature);
        let reply: StepReply = match self.call::<StepReply>(&request).await {
            Ok(reply) if !reply.conclusion.trim().is_empty() => reply,
            Ok(_) => {
                warn!("Step {} returned no conclusion", step_number);
                return failed_step(step_number, question);
            }
            Err(e) => {
                warn!("Step {} failed: {}", step_number, e);
                return failed_step(step_number, question);
            }
        };

        let status = self.verify_step(&reply.conclusion, &evidence).await;
        let sources = if reply.sources.is_empty() {
            evidence_names(&evidence)
        } else {
            reply.sources
        };

        ReasoningStep {
            step_number,
            description: question.to_string(),
            output: reply.conclusion,
            confidence: (reply.confidence.unwrap_or(50.0) / 100.0).clamp(0.0, 1.0),
            sources,
            status,
            reasoning: reply.reasoning,
            assumptions: reply.assumptions,
        }
    }

    async fn verify_step(&self, conclusion: &str, evidence: &[EvidenceItem]) -> StepStatus {
        if evidence.is_empty() {
            return StepStatus::Unverified;
        }
        let request = prompt::verification(conclusion, evidence, self.config.verify_temperature);
        match self.call::<SupportReply>(&request).await {
            Ok(reply) if reply.contradicts => StepStatus::Conflicted,
            Ok(reply) if reply.supports && reply.confidence.unwrap_or(50.0) > self.config.verified_threshold => {
                StepStatus::Verified
            }
            Ok(_) => StepStatus::Unverified,
            Err(e) => {
                debug!("Step verification failed: {}", e);
                StepStatus::Unverified
            }
        }
    }

    async fn synthesize(&self, query: &str, steps: &[ReasoningStep]) -> String {
        let request = prompt::synthesis(query, steps, self.config.synthesis_temperature);
        match self.call::<SynthesisReply>(&request).await {
            Ok(reply) => reply
                .conclusion
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| NO_CONCLUSION.to_string()),
            Err(e) => {
                warn!("Synthesis failed: {}", e);
                SYNTHESIS_ERROR.to_string()
            }
        }
    }

    /// Draw a deductive, inductive, or abductive conclusion from premises
    pub async fn infer(&self, premises: &[String], kind: InferenceKind) -> LogicalInference {
        let request = prompt::inference(premises, kind, self.config.verify_temperature);
        match self.call::<InferenceReply>(&request).await {
            Ok(reply) => {
                let validity = (reply.validity.unwrap_or(50.0) / 100.0).clamp(0.0, 1.0);
                let soundness = (reply.soundness.unwrap_or(50.0) / 100.0).clamp(0.0, 1.0);
                LogicalInference {
                    premises: premises.to_vec(),
                    kind,
                    conclusion: reply
                        .conclusion
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| "No valid inference possible".to_string()),
                    validity: validity >= 0.5,
                    soundness: soundness >= 0.5,
                    confidence: (validity + soundness) / 2.0,
                    reasoning: reply.explanation,
                }
            }
            Err(e) => {
                warn!("Logical inference failed: {}", e);
                LogicalInference {
                    premises: premises.to_vec(),
                    kind,
                    conclusion: "Error performing logical inference".to_string(),
                    validity: false,
                    soundness: false,
                    confidence: 0.2,
                    reasoning: e.to_string(),
                }
            }
        }
    }
}

fn evidence_names(evidence: &[EvidenceItem]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for item in evidence {
        if !names.contains(&item.document_name) {
            names.push(item.document_name.clone());
        }
    }
    names
}

/// Single-step chain returned when reasoning cannot proceed
pub fn failsafe_chain(query: &str) -> ReasoningChain {
    let step = failed_step(1, query);
    ReasoningChain {
        query: query.to_string(),
        query_type: classify_query(query),
        audit_trail: vec!["Failsafe response due to processing error".to_string()],
        steps: vec![step],
        final_conclusion: FAILSAFE_CONCLUSION.to_string(),
        overall_confidence: FAILSAFE_CONFIDENCE,
        cited_sources: Vec::new(),
        potential_issues: vec!["System error in reasoning engine".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_llm::MockProvider;
    use evident_store::MemoryStore;

    fn engine(llm: MockProvider) -> ReasoningEngine {
        let store = Arc::new(MemoryStore::new());
        ReasoningEngine::new(Arc::new(Orchestrator::new(store)), Arc::new(llm), ReasoningConfig::default())
    }

    #[test]
    fn test_failsafe_chain_shape() {
        let chain = failsafe_chain("why?");
        assert_eq!(chain.steps.len(), 1);
        assert_eq!(chain.overall_confidence, 0.3);
        assert_eq!(chain.steps[0].status, StepStatus::Unverified);
        assert_eq!(chain.potential_issues, vec!["System error in reasoning engine"]);
        assert!(chain.is_contiguous());
    }

    #[tokio::test]
    async fn test_decompose_truncates_to_five() {
        let llm = MockProvider::new("{}");
        llm.add_response(
            "Break down this complex query",
            r#"{"subQueries": ["a?", "b?", "c?", "d?", "e?", "f?", "g?"],
                "dependencies": [{"from": 1, "to": 2}, {"from": 3, "to": 2}],
                "queryType": "analytical"}"#,
        );
        let d = engine(llm).decompose("Why do fees differ?").await;
        assert_eq!(d.sub_queries.len(), 5);
        assert_eq!(d.sub_queries[1].depends_on, vec![1]);
        assert_eq!(d.query_type, QueryType::Analytical);
    }

    #[tokio::test]
    async fn test_decompose_degrades_to_single_step() {
        let llm = MockProvider::new("not json");
        let d = engine(llm).decompose("Compare Clover vs Square").await;
        assert_eq!(d.sub_queries.len(), 1);
        assert_eq!(d.sub_queries[0].question, "Compare Clover vs Square");

        let llm = MockProvider::new(r#"{"subQueries": []}"#);
        let d = engine(llm).decompose("Compare Clover vs Square").await;
        assert_eq!(d.sub_queries.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_query_is_failsafe() {
        let llm = MockProvider::new("{}");
        let chain = engine(llm.clone()).reason("   ").await;
        assert_eq!(chain.final_conclusion, FAILSAFE_CONCLUSION);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_infer_maps_scores() {
        let llm = MockProvider::new(
            r#"{"conclusion": "Clover Flex reads chips", "validity": 90, "soundness": 40, "explanation": "modus ponens"}"#,
        );
        let premises = vec!["EMV terminals read chips".to_string(), "Clover Flex is an EMV terminal".to_string()];
        let inference = engine(llm).infer(&premises, InferenceKind::Deductive).await;
        assert!(inference.validity);
        assert!(!inference.soundness);
        assert!((inference.confidence - 0.65).abs() < 1e-9);
        assert_eq!(inference.conclusion, "Clover Flex reads chips");
    }

    #[tokio::test]
    async fn test_infer_failure() {
        let llm = MockProvider::new("{}");
        llm.add_error("logical inference");
        let inference = engine(llm).infer(&["a".to_string()], InferenceKind::Abductive).await;
        assert!(!inference.validity);
        assert_eq!(inference.confidence, 0.2);
    }
}
