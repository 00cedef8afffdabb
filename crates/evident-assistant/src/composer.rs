//! End-to-end answer composition
//!
//! Retrieval, optional multi-step reasoning, answer generation, verification,
//! and citation, assembled into one [`AnswerResponse`]. Callers always get a
//! response; internal failures produce [`AnswerResponse::degraded`].

use crate::config::AssistantConfig;
use crate::context::{document_context, source_refs, suggestions, system_prompt};
use evident_domain::{
    classify_query, is_complex, truncate_chars, unit, AnswerResponse, ChatMessage, Citation,
    CompletionClient, CompletionRequest, ConfidenceLevel, ConfidenceMetrics, EvidenceItem,
    Personalization, PipelineError, PipelineResult, VerificationVerdict,
};
use evident_learning::LearningLoop;
use evident_reasoning::ReasoningEngine;
use evident_retrieval::{Orchestrator, OutcomeTier, SearchOutcome};
use evident_verify::{CitationEngine, FactVerifier};
use moka::sync::Cache;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Message of the degraded response
pub const FAILSAFE_MESSAGE: &str =
    "I'm having trouble answering right now. Please try again or rephrase your question.";

const EMPTY_QUESTION: &str = "Please ask a question about merchant services or payment processing.";
const NO_EVIDENCE_CONFIDENCE: f64 = 0.3;
const CLAIM_CHARS: usize = 500;

/// Builder for [`Assistant`]
pub struct AssistantBuilder {
    orchestrator: Arc<Orchestrator>,
    llm: Arc<dyn CompletionClient>,
    reasoning: Option<Arc<ReasoningEngine>>,
    verifier: Option<Arc<FactVerifier>>,
    citations: Option<Arc<CitationEngine>>,
    learning: Option<Arc<LearningLoop>>,
    config: AssistantConfig,
}

impl AssistantBuilder {
    /// Use this configuration
    pub fn config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    /// Route complex questions through `engine`
    pub fn reasoning(mut self, engine: Arc<ReasoningEngine>) -> Self {
        self.reasoning = Some(engine);
        self
    }

    /// Verify answers with `verifier`
    pub fn verifier(mut self, verifier: Arc<FactVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Cite answers with `citations`
    pub fn citations(mut self, citations: Arc<CitationEngine>) -> Self {
        self.citations = Some(citations);
        self
    }

    /// Personalize answers from `learning`
    pub fn learning(mut self, learning: Arc<LearningLoop>) -> Self {
        self.learning = Some(learning);
        self
    }

    /// Build the assistant
    pub fn build(self) -> Assistant {
        let cache = Cache::builder()
            .max_capacity(self.config.response_cache_capacity)
            .time_to_live(self.config.response_cache_ttl())
            .build();
        Assistant {
            orchestrator: self.orchestrator,
            llm: self.llm,
            reasoning: self.reasoning,
            verifier: self.verifier,
            citations: self.citations,
            learning: self.learning,
            cache,
            config: self.config,
        }
    }
}

/// Composes answers to merchant-services questions
pub struct Assistant {
    orchestrator: Arc<Orchestrator>,
    llm: Arc<dyn CompletionClient>,
    reasoning: Option<Arc<ReasoningEngine>>,
    verifier: Option<Arc<FactVerifier>>,
    citations: Option<Arc<CitationEngine>>,
    learning: Option<Arc<LearningLoop>>,
    cache: Cache<String, AnswerResponse>,
    config: AssistantConfig,
}

impl Assistant {
    /// Start building an assistant
    pub fn builder(orchestrator: Arc<Orchestrator>, llm: Arc<dyn CompletionClient>) -> AssistantBuilder {
        AssistantBuilder {
            orchestrator,
            llm,
            reasoning: None,
            verifier: None,
            citations: None,
            learning: None,
            config: AssistantConfig::default(),
        }
    }

    /// Answer `message` for `user_id`
    ///
    /// Successful answers are cached per user and message for the configured
    /// TTL.
    pub async fn answer(&self, user_id: &str, message: &str, history: &[ChatMessage]) -> AnswerResponse {
        if message.trim().is_empty() {
            return AnswerResponse::degraded(EMPTY_QUESTION, "Empty question");
        }

        let key = format!("{}:{}", user_id, message);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Answer for {} served from response cache", user_id);
            return cached;
        }

        match self.compose(user_id, message, history).await {
            Ok(response) => {
                self.cache.insert(key, response.clone());
                response
            }
            Err(e) => {
                warn!("Answer generation failed for '{}': {}", message, e);
                AnswerResponse::degraded(FAILSAFE_MESSAGE, format!("Answer generation failed: {}", e))
            }
        }
    }

    /// Drop every cached answer
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    async fn personalization(&self, user_id: &str) -> Personalization {
        match &self.learning {
            Some(learning) => learning.personalization(user_id).await,
            None => Personalization::default(),
        }
    }

    async fn compose(&self, user_id: &str, message: &str, history: &[ChatMessage]) -> PipelineResult<AnswerResponse> {
        let personalization = self.personalization(user_id).await;
        let outcome = self.orchestrator.search(message).await;
        let evidence = &outcome.evidence;
        let query_type = classify_query(message);

        let reasoner = self.reasoning.as_ref().filter(|_| self.config.reason_complex && is_complex(message));
        let (text, reasoning, base_confidence) = match reasoner {
            Some(engine) => {
                let chain = engine.reason(message).await;
                (chain.final_conclusion, chain.audit_trail.join("\n"), chain.overall_confidence)
            }
            None => {
                let text = self.generate(message, history, evidence, &personalization).await?;
                (text, describe_outcome(&outcome), self.context_confidence(evidence))
            }
        };

        let claim = truncate_chars(&text, CLAIM_CHARS);
        let verdict = match (&self.verifier, self.config.verify_answers) {
            (Some(verifier), true) => Some(verifier.verify(&claim).await),
            _ => None,
        };
        let citation = match (&self.citations, self.config.verify_answers) {
            (Some(citations), true) => Some(citations.cite(&claim, evidence, verdict.as_ref()).await),
            _ => None,
        };

        let metrics = confidence_metrics(
            base_confidence,
            &personalization,
            evidence,
            verdict.as_ref(),
            citation.as_ref(),
            outcome.reason.as_deref(),
        );
        info!(
            "Answer complete: {} sources, confidence {:.2} ({:?})",
            evidence.len(),
            metrics.overall,
            metrics.level
        );

        Ok(AnswerResponse {
            message: text,
            sources: source_refs(evidence, self.config.source_snippet_chars),
            reasoning,
            suggestions: suggestions(query_type, !evidence.is_empty(), verdict.as_ref().map(|v| v.status)),
            fact_verification: verdict,
            advanced_citations: citation,
            confidence_metrics: Some(metrics),
        })
    }

    async fn generate(
        &self,
        message: &str,
        history: &[ChatMessage],
        evidence: &[EvidenceItem],
        personalization: &Personalization,
    ) -> PipelineResult<String> {
        let context = document_context(evidence, self.config.context_items, self.config.context_snippet_chars);
        let mut request = CompletionRequest::new(system_prompt(&self.config.role, &context, personalization), message)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        request.messages = history
            .iter()
            .cloned()
            .chain(std::iter::once(ChatMessage::user(message)))
            .collect();

        let completion = timeout(self.config.call_timeout(), self.llm.complete(&request))
            .await
            .map_err(|_| PipelineError::ExternalServiceFailure("answer call timed out".to_string()))??;
        debug!("Answer generated by {}", completion.model_used);

        let text = completion.text.trim();
        if text.is_empty() {
            return Err(PipelineError::MalformedCompletionOutput("empty answer".to_string()));
        }
        Ok(text.to_string())
    }

    /// Mean relevance of the evidence placed in the prompt
    fn context_confidence(&self, evidence: &[EvidenceItem]) -> f64 {
        let used: Vec<&EvidenceItem> = evidence.iter().take(self.config.context_items).collect();
        if used.is_empty() {
            return NO_EVIDENCE_CONFIDENCE;
        }
        used.iter().map(|e| e.relevance).sum::<f64>() / used.len() as f64
    }
}

fn describe_outcome(outcome: &SearchOutcome) -> String {
    let n = outcome.evidence.len();
    match outcome.tier {
        OutcomeTier::Cache => format!("Answered from {} cached search results", n),
        OutcomeTier::Faq => format!("Answered from {} FAQ knowledge base entries", n),
        OutcomeTier::Document => format!("Answered from {} document excerpts", n),
        OutcomeTier::Web => format!("Answered from web search with {} sources", n),
        OutcomeTier::None => outcome
            .reason
            .clone()
            .unwrap_or_else(|| "No evidence was found".to_string()),
    }
}

fn confidence_metrics(
    base: f64,
    personalization: &Personalization,
    evidence: &[EvidenceItem],
    verdict: Option<&VerificationVerdict>,
    citation: Option<&Citation>,
    empty_reason: Option<&str>,
) -> ConfidenceMetrics {
    let raw = citation.map(|c| c.overall_confidence).unwrap_or(base);
    let overall = unit(raw + personalization.confidence_adjustment);

    let source_reliability = match verdict {
        Some(v) if !v.supporting.is_empty() || !v.contradicting.is_empty() => v.source_reliability,
        _ if evidence.is_empty() => 0.0,
        _ => evidence.iter().map(|e| e.reliability).sum::<f64>() / evidence.len() as f64,
    };

    let mut warnings: Vec<String> = match (citation, verdict) {
        (Some(c), _) => c.warning_flags.iter().map(|w| w.message.clone()).collect(),
        (None, Some(v)) => v.flags.clone(),
        (None, None) => Vec::new(),
    };
    if let Some(reason) = empty_reason {
        warnings.push(reason.to_string());
    }

    ConfidenceMetrics {
        overall,
        level: ConfidenceLevel::from_score(overall),
        source_reliability,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_domain::{EvidenceTier, ResponseStyle};

    #[test]
    fn test_confidence_metrics_apply_adjustment_and_clamp() {
        let personalization = Personalization {
            preferred_style: ResponseStyle::Detailed,
            confidence_adjustment: 0.2,
            prompt_hints: Vec::new(),
        };
        let evidence = vec![EvidenceItem::new("a", "Doc", "text", 0.9, EvidenceTier::Faq)];
        let metrics = confidence_metrics(0.95, &personalization, &evidence, None, None, None);
        assert_eq!(metrics.overall, 1.0);
        assert_eq!(metrics.level, ConfidenceLevel::High);
        assert!(metrics.warnings.is_empty());
    }

    #[test]
    fn test_confidence_metrics_without_evidence() {
        let metrics = confidence_metrics(0.3, &Personalization::default(), &[], None, None, Some("No internal or external evidence found"));
        assert_eq!(metrics.level, ConfidenceLevel::Low);
        assert_eq!(metrics.source_reliability, 0.0);
        assert_eq!(metrics.warnings, vec!["No internal or external evidence found"]);
    }

    #[test]
    fn test_describe_outcome() {
        let outcome = SearchOutcome {
            evidence: vec![EvidenceItem::new("a", "Doc", "text", 0.9, EvidenceTier::Faq)],
            tier: OutcomeTier::Faq,
            reason: None,
        };
        assert_eq!(describe_outcome(&outcome), "Answered from 1 FAQ knowledge base entries");
    }
}
