//! Document relationships and conflicts (pairwise only)

use crate::ids::DocumentId;
use serde::{Deserialize, Serialize};

/// Type of relationship between two documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// One document cites or points to the other
    References,
    /// The documents disagree
    Contradicts,
    /// One document backs the other's statements
    Supports,
    /// One document adds detail to the other
    Extends,
    /// One document replaces the other (newer version)
    Supersedes,
}

impl RelationshipType {
    /// Parse a lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "references" => Some(RelationshipType::References),
            "contradicts" => Some(RelationshipType::Contradicts),
            "supports" => Some(RelationshipType::Supports),
            "extends" => Some(RelationshipType::Extends),
            "supersedes" => Some(RelationshipType::Supersedes),
            _ => None,
        }
    }
}

/// A directed relationship between two documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRelationship {
    /// Document the relationship was computed for
    pub source: DocumentId,
    /// Related document
    pub target: DocumentId,
    /// Name of the related document
    pub target_name: String,
    /// Type of relationship
    pub relationship_type: RelationshipType,
    /// Classifier confidence on a 0-100 scale
    pub confidence: u8,
    /// Short explanation
    pub description: String,
}

/// Category of a detected conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Statements of fact disagree
    Factual,
    /// Numbers (rates, fees, limits) disagree
    Numerical,
    /// Procedures disagree
    Procedural,
    /// Policies disagree
    Policy,
}

impl ConflictType {
    /// Parse a loosely formatted type name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "factual" => Some(ConflictType::Factual),
            "numerical" | "numeric" => Some(ConflictType::Numerical),
            "procedural" => Some(ConflictType::Procedural),
            "policy" => Some(ConflictType::Policy),
            _ => None,
        }
    }
}

/// Ordered severity scale shared by conflicts and warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic
    Low,
    /// Worth a look
    Medium,
    /// Likely to mislead
    High,
    /// Must be resolved
    Critical,
}

impl Severity {
    /// Parse a loosely formatted severity name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" | "moderate" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A disagreement detected between exactly two documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// The two documents involved
    pub documents_involved: [DocumentId; 2],
    /// Category
    pub conflict_type: ConflictType,
    /// Severity
    pub severity: Severity,
    /// What disagrees
    pub description: String,
    /// Snippets showing the disagreement
    pub evidence_snippets: Vec<String>,
    /// How to resolve it, if suggested
    pub resolution_suggestion: Option<String>,
}

/// Kind of consistency alert raised from a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Direct contradiction (factual or policy)
    Contradiction,
    /// Mismatched details (numbers or procedures)
    Inconsistency,
}

/// Admin-facing alert derived from a conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyAlert {
    /// Alert category
    pub alert_type: AlertType,
    /// Carried over from the conflict
    pub severity: Severity,
    /// Documents involved
    pub documents: [DocumentId; 2],
    /// Human-readable message
    pub message: String,
    /// Resolution suggestion, if any
    pub suggested_action: Option<String>,
}

impl From<&Conflict> for ConsistencyAlert {
    fn from(conflict: &Conflict) -> Self {
        let alert_type = match conflict.conflict_type {
            ConflictType::Factual | ConflictType::Policy => AlertType::Contradiction,
            ConflictType::Numerical | ConflictType::Procedural => AlertType::Inconsistency,
        };
        Self {
            alert_type,
            severity: conflict.severity,
            documents: conflict.documents_involved,
            message: conflict.description.clone(),
            suggested_action: conflict.resolution_suggestion.clone(),
        }
    }
}
