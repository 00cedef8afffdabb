//! Caller-facing answer contract

use crate::citation::Citation;
use crate::evidence::EvidenceTier;
use crate::verification::VerificationVerdict;
use serde::{Deserialize, Serialize};

/// A source shown alongside an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source identifier
    pub source_id: String,
    /// Display name
    pub name: String,
    /// Short snippet
    pub snippet: String,
    /// Relevance [0, 1]
    pub score: f64,
    /// Tier that produced it
    pub tier: EvidenceTier,
    /// URL for web sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Coarse confidence level shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// Below 0.5
    Low,
    /// 0.5 up to 0.8
    Medium,
    /// 0.8 and above
    High,
}

impl ConfidenceLevel {
    /// Bucket a score
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Confidence summary attached to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    /// Overall score after personalization adjustment
    pub overall: f64,
    /// Bucketed level
    pub level: ConfidenceLevel,
    /// Mean source reliability
    pub source_reliability: f64,
    /// Warnings shown to the user
    pub warnings: Vec<String>,
}

/// The structured response every caller receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    /// Answer text
    pub message: String,
    /// Sources used
    pub sources: Vec<SourceRef>,
    /// Explanation of how the answer was produced
    pub reasoning: String,
    /// Fact verification of the answer, if run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_verification: Option<VerificationVerdict>,
    /// Citation analysis, if run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_citations: Option<Citation>,
    /// Confidence summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_metrics: Option<ConfidenceMetrics>,
    /// Follow-up suggestions
    pub suggestions: Vec<String>,
}

impl AnswerResponse {
    /// Minimal degraded response: message, low confidence, and a warning
    pub fn degraded(message: impl Into<String>, warning: impl Into<String>) -> Self {
        let warning = warning.into();
        Self {
            message: message.into(),
            sources: Vec::new(),
            reasoning: String::new(),
            fact_verification: None,
            advanced_citations: None,
            confidence_metrics: Some(ConfidenceMetrics {
                overall: 0.2,
                level: ConfidenceLevel::Low,
                source_reliability: 0.0,
                warnings: vec![warning.clone()],
            }),
            suggestions: vec![warning],
        }
    }
}
