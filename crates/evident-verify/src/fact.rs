//! Fact verification against the document index

use crate::config::VerificationConfig;
use crate::reliability::ReliabilityModel;
use chrono::Utc;
use evident_domain::{
    truncate_chars, AssessedEvidence, AuditEvent, AuditSink, ClaimStatus, CompletionClient,
    CompletionRequest, Conflict, ConsistencyAlert, EvidenceItem, PipelineError, PipelineResult,
    SupportType, VerificationVerdict,
};
use evident_llm::complete_json;
use evident_retrieval::Orchestrator;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const VERIFIER_SYSTEM: &str =
    "You check merchant services claims against evidence. Respond with a single JSON object and nothing else.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SupportJudgment {
    #[serde(default)]
    relevance_score: Option<f64>,
    #[serde(default)]
    support_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContradictionJudgment {
    #[serde(default)]
    is_contradiction: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "explanation")]
    reason: String,
}

/// Resolve a status from assessed evidence
///
/// Confident contradictions win, then strong support, then partial support.
pub fn resolve_status(supporting: &[AssessedEvidence], contradicting: &[AssessedEvidence], threshold: f64) -> ClaimStatus {
    let strong = supporting.iter().filter(|e| e.support == SupportType::StrongSupport).count();
    let weak = supporting.iter().filter(|e| e.support == SupportType::WeakSupport).count();

    if contradicting.iter().any(|e| e.contradiction_confidence > threshold) {
        ClaimStatus::Contradicted
    } else if strong >= 2 {
        ClaimStatus::Verified
    } else if strong >= 1 || weak >= 3 {
        ClaimStatus::PartiallyVerified
    } else {
        ClaimStatus::Unverified
    }
}

fn inconsistency_flags(
    assessed: &[AssessedEvidence],
    supporting: &[AssessedEvidence],
    contradicting: &[AssessedEvidence],
    low_relevance: f64,
) -> Vec<String> {
    let mut flags = Vec::new();
    if !contradicting.is_empty() {
        flags.push(format!("Found {} contradicting sources", contradicting.len()));
    }
    if supporting.is_empty() {
        flags.push("No supporting evidence found in knowledge base".to_string());
    }
    let low = assessed.iter().filter(|e| e.item.relevance < low_relevance).count();
    if low * 2 > assessed.len() {
        flags.push("Majority of evidence has low relevance scores".to_string());
    }
    flags
}

fn recommendations(status: ClaimStatus, supporting: usize, contradicting: usize) -> Vec<String> {
    let mut out = Vec::new();
    match status {
        ClaimStatus::Contradicted => {
            out.push("Review contradicting sources and resolve conflicts".to_string());
            out.push("Verify which information is most current and accurate".to_string());
        }
        ClaimStatus::Unverified => {
            out.push("Seek additional sources to verify this claim".to_string());
            out.push("Consider flagging this information for manual review".to_string());
        }
        ClaimStatus::Verified | ClaimStatus::PartiallyVerified => {}
    }
    if contradicting > 0 {
        out.push("Investigate source conflicts and update documentation".to_string());
    }
    if supporting < 2 {
        out.push("Add more supporting documentation to knowledge base".to_string());
    }
    out
}

/// Admin alerts for detected document conflicts
pub fn consistency_alerts(conflicts: &[Conflict]) -> Vec<ConsistencyAlert> {
    conflicts.iter().map(ConsistencyAlert::from).collect()
}

/// Checks claims against retrieved documents
pub struct FactVerifier {
    orchestrator: Arc<Orchestrator>,
    llm: Arc<dyn CompletionClient>,
    audit: Arc<dyn AuditSink>,
    reliability: Arc<ReliabilityModel>,
    config: VerificationConfig,
}

impl FactVerifier {
    /// Create a verifier
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        llm: Arc<dyn CompletionClient>,
        audit: Arc<dyn AuditSink>,
        reliability: Arc<ReliabilityModel>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            orchestrator,
            llm,
            audit,
            reliability,
            config,
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: &CompletionRequest) -> PipelineResult<T> {
        let (value, _) = timeout(self.config.call_timeout(), complete_json::<T>(self.llm.as_ref(), request))
            .await
            .map_err(|_| PipelineError::ExternalServiceFailure("verification call timed out".to_string()))??;
        Ok(value)
    }

    /// Verify a claim
    ///
    /// Always returns a verdict and always writes one audit event. Internal
    /// failures produce [`VerificationVerdict::failsafe`].
    pub async fn verify(&self, claim: &str) -> VerificationVerdict {
        let verdict = match self.try_verify(claim).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Verification of '{}' failed: {}", claim, e);
                VerificationVerdict::failsafe(claim)
            }
        };

        let event = AuditEvent::FactVerification {
            claim: claim.to_string(),
            status: verdict.status,
            confidence: verdict.confidence,
            evidence_count: verdict.supporting.len() + verdict.contradicting.len(),
            flags: verdict.flags.clone(),
            at: Utc::now(),
        };
        if let Err(e) = self.audit.record(event).await {
            warn!("Failed to audit verification: {}", e);
        }

        info!(
            "Fact verification complete: {} ({:.2})",
            verdict.status.as_str(),
            verdict.confidence
        );
        verdict
    }

    async fn try_verify(&self, claim: &str) -> PipelineResult<VerificationVerdict> {
        let evidence = self
            .orchestrator
            .search_documents(claim, self.config.max_evidence)
            .await?;
        debug!("Verifying against {} evidence items", evidence.len());

        let now = Utc::now();
        let mut assessed = Vec::with_capacity(evidence.len());
        for item in evidence {
            let reliability = self.reliability.assess(&item, now).await?;
            assessed.push(self.assess(claim, item.with_reliability(reliability)).await);
        }

        let supporting: Vec<AssessedEvidence> = assessed.iter().filter(|e| e.support.is_support()).cloned().collect();
        let contradicting: Vec<AssessedEvidence> = assessed.iter().filter(|e| e.is_contradiction).cloned().collect();

        let status = resolve_status(&supporting, &contradicting, self.config.contradiction_threshold);
        let source_reliability = if assessed.is_empty() {
            0.0
        } else {
            assessed.iter().map(|e| e.item.reliability).sum::<f64>() / assessed.len() as f64
        };

        Ok(VerificationVerdict {
            claim: claim.to_string(),
            status,
            confidence: status.confidence(),
            flags: inconsistency_flags(&assessed, &supporting, &contradicting, self.config.low_relevance),
            recommendations: recommendations(status, supporting.len(), contradicting.len()),
            supporting,
            contradicting,
            source_reliability,
        })
    }

    /// Classify one item; each check falls back independently
    async fn assess(&self, claim: &str, item: EvidenceItem) -> AssessedEvidence {
        let content = truncate_chars(&item.snippet, self.config.evidence_chars);

        let support_request = CompletionRequest::new(
            VERIFIER_SYSTEM,
            format!(
                "Analyze how this evidence relates to the claim:\n\n\
                 Claim: \"{}\"\n\nEvidence: \"{}\"\nSource: {}\n\n\
                 Return JSON format:\n{{\n  \"relevanceScore\": 85,\n  \
                 \"supportType\": \"strong_support|weak_support|neutral|weak_contradiction|strong_contradiction\",\n  \
                 \"explanation\": \"why\"\n}}",
                claim, content, item.document_name
            ),
        )
        .with_temperature(self.config.temperature);

        let (support, relevance) = match self.call::<SupportJudgment>(&support_request).await {
            Ok(j) => (
                j.support_type.as_deref().map(SupportType::parse).unwrap_or(SupportType::Neutral),
                j.relevance_score.unwrap_or(50.0) / 100.0,
            ),
            Err(e) => {
                debug!("Support classification failed for {}: {}", item.source_id, e);
                (SupportType::Neutral, 0.5)
            }
        };

        let contradiction_request = CompletionRequest::new(
            VERIFIER_SYSTEM,
            format!(
                "Does this evidence contradict the claim?\n\n\
                 Claim: \"{}\"\nEvidence: \"{}\"\n\n\
                 Look for direct, numerical, procedural, or factual conflicts.\n\n\
                 Return JSON: {{\"isContradiction\": boolean, \"confidence\": 0-100, \"reason\": \"explanation\"}}",
                claim, content
            ),
        )
        .with_temperature(self.config.temperature);

        let (is_contradiction, contradiction_confidence, explanation) =
            match self.call::<ContradictionJudgment>(&contradiction_request).await {
                Ok(j) => (j.is_contradiction, j.confidence.unwrap_or(50.0) / 100.0, j.reason),
                Err(e) => {
                    debug!("Contradiction check failed for {}: {}", item.source_id, e);
                    (false, 0.5, String::new())
                }
            };

        AssessedEvidence {
            item: item.rescored(relevance),
            support,
            is_contradiction,
            contradiction_confidence: contradiction_confidence.clamp(0.0, 1.0),
            explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_domain::EvidenceTier;

    fn assessed(support: SupportType, relevance: f64, contradiction: Option<f64>) -> AssessedEvidence {
        AssessedEvidence {
            item: EvidenceItem::new("d", "Doc", "text", relevance, EvidenceTier::Document),
            support,
            is_contradiction: contradiction.is_some(),
            contradiction_confidence: contradiction.unwrap_or(0.5),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_resolve_status_order() {
        let strong = assessed(SupportType::StrongSupport, 0.9, None);
        let weak = assessed(SupportType::WeakSupport, 0.9, None);
        let contra = assessed(SupportType::Neutral, 0.9, Some(0.85));
        let mild = assessed(SupportType::Neutral, 0.9, Some(0.6));

        let two_strong = vec![strong.clone(), strong.clone()];
        assert_eq!(resolve_status(&two_strong, &[contra.clone()], 0.8), ClaimStatus::Contradicted);
        assert_eq!(resolve_status(&two_strong, &[mild], 0.8), ClaimStatus::Verified);
        assert_eq!(resolve_status(&[strong], &[], 0.8), ClaimStatus::PartiallyVerified);
        assert_eq!(resolve_status(&[weak.clone(), weak.clone(), weak.clone()], &[], 0.8), ClaimStatus::PartiallyVerified);
        assert_eq!(resolve_status(&[weak.clone(), weak], &[], 0.8), ClaimStatus::Unverified);
        assert_eq!(resolve_status(&[], &[], 0.8), ClaimStatus::Unverified);
    }

    #[test]
    fn test_flags() {
        let low = assessed(SupportType::Neutral, 0.2, None);
        let contra = assessed(SupportType::Neutral, 0.9, Some(0.9));
        let flags = inconsistency_flags(&[low.clone(), low, contra.clone()], &[], &[contra], 0.5);
        assert_eq!(
            flags,
            vec![
                "Found 1 contradicting sources",
                "No supporting evidence found in knowledge base",
                "Majority of evidence has low relevance scores",
            ]
        );
    }

    #[test]
    fn test_recommendations_for_unverified() {
        let recs = recommendations(ClaimStatus::Unverified, 0, 0);
        assert!(recs.contains(&"Seek additional sources to verify this claim".to_string()));
        assert!(recs.contains(&"Add more supporting documentation to knowledge base".to_string()));
        assert!(recommendations(ClaimStatus::Verified, 2, 0).is_empty());
    }
}
