//! Append-only audit events

use crate::learning::{FeedbackRecord, ImprovementCandidate};
use crate::verification::ClaimStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event written to the audit log for later admin review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The orchestrator fell back to web search, or refused to
    WebSearchFallback {
        /// The query
        query: String,
        /// Why the web tier was reached
        reason: String,
        /// Whether the web client was actually called
        executed: bool,
        /// First part of the returned content
        result_summary: String,
        /// Citation URLs
        citations: Vec<String>,
        /// When it happened
        at: DateTime<Utc>,
    },
    /// A claim was verified
    FactVerification {
        /// The claim
        claim: String,
        /// Resolved status
        status: ClaimStatus,
        /// Confidence
        confidence: f64,
        /// Number of evidence items assessed
        evidence_count: usize,
        /// Flags raised
        flags: Vec<String>,
        /// When it happened
        at: DateTime<Utc>,
    },
    /// A feedback record was submitted
    Feedback(FeedbackRecord),
    /// An improvement was proposed for manual review
    Improvement(ImprovementCandidate),
}

impl AuditEvent {
    /// Stable snake_case tag of the event
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::WebSearchFallback { .. } => "web_search_fallback",
            AuditEvent::FactVerification { .. } => "fact_verification",
            AuditEvent::Feedback(_) => "feedback",
            AuditEvent::Improvement(_) => "improvement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::FeedbackKind;

    #[test]
    fn test_feedback_event_round_trip() {
        let record = FeedbackRecord::new("u1", "fees?", "2.5%", FeedbackKind::Positive);
        let event = AuditEvent::Feedback(record.clone());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"feedback\""));
        let back: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AuditEvent::Feedback(record));
    }
}
