//! Reasoning steps and chains

use crate::query::QueryType;
use serde::{Deserialize, Serialize};

/// Verification status of a single reasoning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Evidence supports the step's conclusion
    Verified,
    /// No decisive evidence either way
    Unverified,
    /// Evidence contradicts the step's conclusion
    Conflicted,
}

impl StepStatus {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Verified => "verified",
            StepStatus::Unverified => "unverified",
            StepStatus::Conflicted => "conflicted",
        }
    }
}

/// One step in a reasoning chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 1-based position in the chain
    pub step_number: usize,
    /// The sub-question this step answered
    pub description: String,
    /// The step's conclusion
    pub output: String,
    /// Confidence [0, 1]
    pub confidence: f64,
    /// Source ids consulted
    pub sources: Vec<String>,
    /// Verification status
    pub status: StepStatus,
    /// Free-text reasoning
    #[serde(default)]
    pub reasoning: String,
    /// Assumptions the step relied on
    #[serde(default)]
    pub assumptions: Vec<String>,
}

/// An ordered chain of dependent reasoning steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    /// The original query
    pub query: String,
    /// Its intent
    pub query_type: QueryType,
    /// Steps, numbered contiguously from 1
    pub steps: Vec<ReasoningStep>,
    /// Synthesized conclusion
    pub final_conclusion: String,
    /// Aggregate confidence
    pub overall_confidence: f64,
    /// Deduplicated union of step sources, in first-seen order
    pub cited_sources: Vec<String>,
    /// Integrity warnings
    pub potential_issues: Vec<String>,
    /// Human-readable per-step trail
    pub audit_trail: Vec<String>,
}

impl ReasoningChain {
    /// Highest step confidence, or 0 for an empty chain
    pub fn max_step_confidence(&self) -> f64 {
        self.steps.iter().map(|s| s.confidence).fold(0.0, f64::max)
    }

    /// Whether step numbers run 1..=n without gaps
    pub fn is_contiguous(&self) -> bool {
        self.steps
            .iter()
            .enumerate()
            .all(|(idx, step)| step.step_number == idx + 1)
    }
}

/// Kind of logical inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceKind {
    /// General to specific
    Deductive,
    /// Specific to general
    Inductive,
    /// Best explanation
    Abductive,
}

/// Result of a logical inference over premises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalInference {
    /// Premises supplied
    pub premises: Vec<String>,
    /// Kind of inference performed
    pub kind: InferenceKind,
    /// Conclusion drawn
    pub conclusion: String,
    /// Whether the conclusion follows from the premises
    pub validity: bool,
    /// Whether the premises are believed true
    pub soundness: bool,
    /// Confidence [0, 1]
    pub confidence: f64,
    /// Explanation
    pub reasoning: String,
}
