//! Fact verification verdicts

use crate::evidence::EvidenceItem;
use serde::{Deserialize, Serialize};

/// How a single evidence item bears on a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportType {
    /// Directly and clearly supports the claim
    StrongSupport,
    /// Partially supports the claim
    WeakSupport,
    /// Unrelated or inconclusive
    Neutral,
    /// Partially contradicts the claim
    WeakContradiction,
    /// Directly contradicts the claim
    StrongContradiction,
}

impl SupportType {
    /// Parse a snake_case label, treating unknown labels as neutral
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "strong_support" => SupportType::StrongSupport,
            "weak_support" => SupportType::WeakSupport,
            "weak_contradiction" => SupportType::WeakContradiction,
            "strong_contradiction" => SupportType::StrongContradiction,
            _ => SupportType::Neutral,
        }
    }

    /// Whether this is a supporting classification
    pub fn is_support(&self) -> bool {
        matches!(self, SupportType::StrongSupport | SupportType::WeakSupport)
    }

    /// Whether this is a contradicting classification
    pub fn is_contradiction(&self) -> bool {
        matches!(self, SupportType::StrongContradiction | SupportType::WeakContradiction)
    }
}

/// Resolved status of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Two or more strong supporting sources
    Verified,
    /// Some support
    PartiallyVerified,
    /// Not enough evidence
    Unverified,
    /// A confident contradiction was found
    Contradicted,
}

impl ClaimStatus {
    /// Fixed confidence attached to each status
    pub fn confidence(&self) -> f64 {
        match self {
            ClaimStatus::Verified => 0.9,
            ClaimStatus::PartiallyVerified => 0.7,
            ClaimStatus::Unverified => 0.3,
            ClaimStatus::Contradicted => 0.2,
        }
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Verified => "verified",
            ClaimStatus::PartiallyVerified => "partially_verified",
            ClaimStatus::Unverified => "unverified",
            ClaimStatus::Contradicted => "contradicted",
        }
    }
}

/// One evidence item with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessedEvidence {
    /// The evidence, with deterministic reliability applied
    pub item: EvidenceItem,
    /// Support classification
    pub support: SupportType,
    /// Whether the binary contradiction check fired
    pub is_contradiction: bool,
    /// Confidence of the contradiction check [0, 1]
    pub contradiction_confidence: f64,
    /// Explanation returned with the contradiction check
    #[serde(default)]
    pub explanation: String,
}

/// Outcome of verifying a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    /// The claim text
    pub claim: String,
    /// Resolved status
    pub status: ClaimStatus,
    /// Confidence attached to the status
    pub confidence: f64,
    /// Supporting evidence
    pub supporting: Vec<AssessedEvidence>,
    /// Contradicting evidence
    pub contradicting: Vec<AssessedEvidence>,
    /// Mean reliability over all assessed evidence
    pub source_reliability: f64,
    /// Inconsistencies noticed while verifying
    pub flags: Vec<String>,
    /// Suggested next steps
    pub recommendations: Vec<String>,
}

impl VerificationVerdict {
    /// Verdict used when verification itself fails
    pub fn failsafe(claim: &str) -> Self {
        Self {
            claim: claim.to_string(),
            status: ClaimStatus::Unverified,
            confidence: ClaimStatus::Unverified.confidence(),
            supporting: Vec::new(),
            contradicting: Vec::new(),
            source_reliability: 0.0,
            flags: vec!["System error during verification".to_string()],
            recommendations: vec!["Manual verification required".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_type_parse() {
        assert_eq!(SupportType::parse("Strong Support"), SupportType::StrongSupport);
        assert_eq!(SupportType::parse("weak-contradiction"), SupportType::WeakContradiction);
        assert_eq!(SupportType::parse("banana"), SupportType::Neutral);
    }

    #[test]
    fn test_failsafe() {
        let v = VerificationVerdict::failsafe("fees are 2.5%");
        assert_eq!(v.status, ClaimStatus::Unverified);
        assert!(v.confidence <= 0.3);
    }
}
