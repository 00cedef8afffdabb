//! Citations, evidence strength, and warning flags

use crate::confidence::ConfidenceInterval;
use crate::evidence::EvidenceItem;
use crate::relationship::Severity;
use serde::{Deserialize, Serialize};

/// Aggregate strength of the evidence behind a citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    /// Fewer than two sources
    Insufficient,
    /// Contradicted or thin
    Weak,
    /// Some reliable support
    Moderate,
    /// Multiple reliable sources with strong snippets
    Strong,
}

/// Verification status reported on a citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStatus {
    /// Fully backed by evidence
    FullyVerified,
    /// Partially backed
    PartiallyVerified,
    /// Not backed
    Unverified,
    /// Sources disagree
    Conflicted,
}

/// Kind of warning attached to a citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// At least one source contradicts the claim
    ConflictingSources,
    /// Most sources have low reliability
    LowSourceReliability,
    /// A source was last verified over a year ago
    PotentiallyOutdated,
    /// Fewer than two sources
    InsufficientSources,
    /// The citation engine failed internally
    SystemError,
}

/// A warning flag with severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningFlag {
    /// Kind
    pub kind: WarningKind,
    /// Severity
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
}

impl WarningFlag {
    /// Create a warning flag
    pub fn new(kind: WarningKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

/// Category of a supporting snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    /// Verbatim quote
    DirectQuote,
    /// Restated content
    Paraphrase,
    /// Numbers, rates, amounts
    NumericalData,
    /// A procedure step
    ProceduralStep,
}

/// Strength of a supporting snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetStrength {
    /// Directly establishes the claim
    Strong,
    /// Partially establishes it
    Moderate,
    /// Tangential
    Weak,
}

/// A snippet extracted from a source that supports the claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingSnippet {
    /// Quoted text
    pub snippet: String,
    /// Category
    pub kind: SnippetKind,
    /// Strength
    pub strength: SnippetStrength,
}

/// A ranked source within a citation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationSource {
    /// The evidence, with reliability and interval applied
    pub evidence: EvidenceItem,
    /// `reliability × relevance`
    pub rank_score: f64,
    /// Snippets extracted from this source
    pub supporting_snippets: Vec<SupportingSnippet>,
}

impl CitationSource {
    /// Reliability of the underlying evidence
    pub fn reliability(&self) -> f64 {
        self.evidence.reliability
    }
}

/// A ranked, confidence-scored attribution of a claim to sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// The claim
    pub claim: String,
    /// Sources with reliability > 0.7
    pub primary_sources: Vec<CitationSource>,
    /// The remaining sources
    pub secondary_sources: Vec<CitationSource>,
    /// Status
    pub verification_status: CitationStatus,
    /// Aggregate confidence
    pub overall_confidence: f64,
    /// Interval around the aggregate confidence
    pub confidence_interval: ConfidenceInterval,
    /// Evidence strength
    pub evidence_strength: EvidenceStrength,
    /// Warnings
    pub warning_flags: Vec<WarningFlag>,
    /// Suggested follow-ups
    pub recommendations: Vec<String>,
}

impl Citation {
    /// Citation returned when the engine fails internally
    pub fn failsafe(claim: &str, reason: &str) -> Self {
        Self {
            claim: claim.to_string(),
            primary_sources: Vec::new(),
            secondary_sources: Vec::new(),
            verification_status: CitationStatus::Unverified,
            overall_confidence: 0.3,
            confidence_interval: ConfidenceInterval::around(0.3, 0.2),
            evidence_strength: EvidenceStrength::Insufficient,
            warning_flags: vec![WarningFlag::new(
                WarningKind::SystemError,
                Severity::High,
                format!("Citation analysis failed: {}", reason),
            )],
            recommendations: vec!["Manual verification required".to_string()],
        }
    }

    /// Whether a warning of the given kind is present
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warning_flags.iter().any(|w| w.kind == kind)
    }

    /// All sources, primary first
    pub fn all_sources(&self) -> impl Iterator<Item = &CitationSource> {
        self.primary_sources.iter().chain(self.secondary_sources.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failsafe_citation() {
        let c = Citation::failsafe("claim", "boom");
        assert_eq!(c.verification_status, CitationStatus::Unverified);
        assert_eq!(c.overall_confidence, 0.3);
        assert!(c.has_warning(WarningKind::SystemError));
        assert_eq!(c.warning_flags[0].severity, Severity::High);
    }

    #[test]
    fn test_strength_ordering() {
        assert!(EvidenceStrength::Strong > EvidenceStrength::Moderate);
        assert!(EvidenceStrength::Weak > EvidenceStrength::Insufficient);
    }
}
