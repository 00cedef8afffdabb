//! Feedback records and per-user learning profiles

use crate::ids::FeedbackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User rating of a returned answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// Helpful answer
    Positive,
    /// Neither helpful nor harmful
    Neutral,
    /// Unhelpful or wrong answer
    Negative,
}

impl FeedbackKind {
    /// Parse a lowercase label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "good" | "up" => Some(FeedbackKind::Positive),
            "neutral" => Some(FeedbackKind::Neutral),
            "negative" | "bad" | "down" => Some(FeedbackKind::Negative),
            _ => None,
        }
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Positive => "positive",
            FeedbackKind::Neutral => "neutral",
            FeedbackKind::Negative => "negative",
        }
    }
}

/// Append-only feedback on an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Identifier
    pub id: FeedbackId,
    /// User who gave the feedback
    pub user_id: String,
    /// The question asked
    pub query: String,
    /// The answer returned
    pub original_response: String,
    /// The user's correction, if any
    pub corrected_response: Option<String>,
    /// Rating
    pub feedback: FeedbackKind,
    /// When the feedback was given
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Create a record stamped now
    pub fn new(
        user_id: impl Into<String>,
        query: impl Into<String>,
        original_response: impl Into<String>,
        feedback: FeedbackKind,
    ) -> Self {
        Self {
            id: FeedbackId::new(),
            user_id: user_id.into(),
            query: query.into(),
            original_response: original_response.into(),
            corrected_response: None,
            feedback,
            timestamp: Utc::now(),
        }
    }

    /// Attach a correction
    pub fn with_correction(mut self, corrected: impl Into<String>) -> Self {
        self.corrected_response = Some(corrected.into());
        self
    }
}

/// Preferred answer style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    /// Short answers
    Concise,
    /// Thorough answers
    #[default]
    Detailed,
    /// Jargon-heavy answers
    Technical,
    /// Friendly answers
    Conversational,
}

impl ResponseStyle {
    /// Parse a lowercase label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "concise" => Some(ResponseStyle::Concise),
            "detailed" => Some(ResponseStyle::Detailed),
            "technical" => Some(ResponseStyle::Technical),
            "conversational" => Some(ResponseStyle::Conversational),
            _ => None,
        }
    }

    /// Prompt instruction for this style
    pub fn instruction(&self) -> &'static str {
        match self {
            ResponseStyle::Concise => "Keep the answer short and to the point.",
            ResponseStyle::Detailed => "Give a thorough answer with relevant detail.",
            ResponseStyle::Technical => "Use precise industry terminology.",
            ResponseStyle::Conversational => "Use a friendly, conversational tone.",
        }
    }
}

/// Rolling per-user learning state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningProfile {
    /// User identifier
    pub user_id: String,
    /// Smoothed accuracy [0, 1]
    pub accuracy: f64,
    /// Smoothed satisfaction [0, 1]
    pub satisfaction_score: f64,
    /// Preferred answer style
    pub preferred_style: ResponseStyle,
    /// Patterns observed in well-received answers
    pub successful_patterns: Vec<String>,
    /// Patterns observed in poorly-received answers
    pub unsuccessful_patterns: Vec<String>,
    /// Additive adjustment applied to reported confidence, in [-0.2, 0.2]
    pub confidence_adjustment: f64,
    /// Personalized prompt template, if generated
    pub prompt_template: Option<String>,
    /// Number of feedback events folded in
    pub total_interactions: u64,
    /// Last update
    pub updated_at: DateTime<Utc>,
}

impl LearningProfile {
    /// Fresh profile with neutral priors
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            accuracy: 0.7,
            satisfaction_score: 0.7,
            preferred_style: ResponseStyle::default(),
            successful_patterns: Vec::new(),
            unsuccessful_patterns: Vec::new(),
            confidence_adjustment: 0.0,
            prompt_template: None,
            total_interactions: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Area a system-wide improvement targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementCategory {
    /// Prompt wording
    PromptOptimization,
    /// Answer quality
    ResponseQuality,
    /// Factual accuracy
    AccuracyEnhancement,
    /// Per-user tailoring
    Personalization,
}

impl ImprovementCategory {
    /// Parse a snake_case label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "prompt_optimization" => Some(ImprovementCategory::PromptOptimization),
            "response_quality" => Some(ImprovementCategory::ResponseQuality),
            "accuracy_enhancement" => Some(ImprovementCategory::AccuracyEnhancement),
            "personalization" => Some(ImprovementCategory::Personalization),
            _ => None,
        }
    }
}

/// Review state of an improvement candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Waiting for an admin
    PendingReview,
}

/// A system-wide improvement proposed from repeated negative feedback
///
/// Candidates are surfaced for manual review only and are never applied
/// automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementCandidate {
    /// Area targeted
    pub category: ImprovementCategory,
    /// Proposed change
    pub description: String,
    /// Queries that triggered it
    pub evidence: Vec<String>,
    /// Review state
    pub status: ReviewStatus,
    /// When it was proposed
    pub created_at: DateTime<Utc>,
}

/// Personalization signals fed into prompt construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personalization {
    /// Preferred style
    pub preferred_style: ResponseStyle,
    /// Additive confidence adjustment
    pub confidence_adjustment: f64,
    /// Extra prompt hints
    pub prompt_hints: Vec<String>,
}

impl Default for Personalization {
    fn default() -> Self {
        Self {
            preferred_style: ResponseStyle::default(),
            confidence_adjustment: 0.0,
            prompt_hints: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_priors() {
        let p = LearningProfile::new("u1");
        assert_eq!(p.accuracy, 0.7);
        assert_eq!(p.satisfaction_score, 0.7);
        assert_eq!(p.confidence_adjustment, 0.0);
    }

    #[test]
    fn test_feedback_kind_parse() {
        assert_eq!(FeedbackKind::parse("Positive"), Some(FeedbackKind::Positive));
        assert_eq!(FeedbackKind::parse("down"), Some(FeedbackKind::Negative));
        assert_eq!(FeedbackKind::parse("meh"), None);
    }

    #[test]
    fn test_feedback_record_serde() {
        let record = FeedbackRecord::new("u1", "q", "a", FeedbackKind::Negative)
            .with_correction("better answer");
        let json = serde_json::to_string(&record).unwrap();
        let back: FeedbackRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
