//! Evidence items, documents, and curated Q&A entries

use crate::confidence::{unit, ConfidenceInterval};
use crate::ids::{DocumentId, QaId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which tier of the search hierarchy produced an evidence item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTier {
    /// Curated question/answer table
    Faq,
    /// Chunked-document vector index
    Document,
    /// External web search
    Web,
}

/// Broad document category, used for deterministic reliability scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Contracts and agreements
    Contract,
    /// Policies and rules
    Policy,
    /// Manuals and handbooks
    Manual,
    /// Statements and reports
    Statement,
    /// Guides and tutorials
    Guide,
    /// Anything else
    Other,
}

impl DocumentType {
    /// Categorize a document from its name
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

        if has(&["contract", "agreement"]) {
            DocumentType::Contract
        } else if has(&["policy", "rule"]) {
            DocumentType::Policy
        } else if has(&["manual", "handbook"]) {
            DocumentType::Manual
        } else if has(&["statement", "report"]) {
            DocumentType::Statement
        } else if has(&["guide", "tutorial"]) {
            DocumentType::Guide
        } else {
            DocumentType::Other
        }
    }

    /// Stable lowercase name used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Contract => "contract",
            DocumentType::Policy => "policy",
            DocumentType::Manual => "manual",
            DocumentType::Statement => "statement",
            DocumentType::Guide => "guide",
            DocumentType::Other => "other",
        }
    }

    /// Parse the storage name, falling back to `Other`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "contract" => DocumentType::Contract,
            "policy" => DocumentType::Policy,
            "manual" => DocumentType::Manual,
            "statement" => DocumentType::Statement,
            "guide" => DocumentType::Guide,
            _ => DocumentType::Other,
        }
    }
}

/// Optional ranking signals attached to an evidence item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    /// How often the source has been viewed
    #[serde(default)]
    pub views: u64,
    /// Average user rating on a 0-5 scale
    #[serde(default)]
    pub rating: Option<f64>,
    /// Free-form tags (folder names, categories)
    #[serde(default)]
    pub tags: Vec<String>,
    /// URL for web evidence
    #[serde(default)]
    pub url: Option<String>,
}

/// A scored snippet of curated, document, or web content
///
/// Scores are clamped into [0, 1] on construction. Items are never mutated
/// in place once fetched for a query; rescoring builds a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Source identifier (document id, Q&A id, or URL)
    pub source_id: String,
    /// Document id when the evidence comes from an uploaded document
    pub document_id: Option<DocumentId>,
    /// Human-readable source name
    pub document_name: String,
    /// Document category
    pub document_type: DocumentType,
    /// Content snippet
    pub snippet: String,
    /// Relevance to the query [0, 1]
    pub relevance: f64,
    /// Source reliability [0, 1]
    pub reliability: f64,
    /// Confidence interval around the item's estimated confidence
    pub confidence_interval: ConfidenceInterval,
    /// When the underlying source was last verified
    pub last_verified: DateTime<Utc>,
    /// Tier that produced the item
    pub tier: EvidenceTier,
    /// Extra ranking signals
    #[serde(default)]
    pub metadata: EvidenceMetadata,
}

impl EvidenceItem {
    /// Create an evidence item with clamped scores
    pub fn new(
        source_id: impl Into<String>,
        document_name: impl Into<String>,
        snippet: impl Into<String>,
        relevance: f64,
        tier: EvidenceTier,
    ) -> Self {
        let document_name = document_name.into();
        let relevance = unit(relevance);
        Self {
            source_id: source_id.into(),
            document_id: None,
            document_type: DocumentType::from_name(&document_name),
            document_name,
            snippet: snippet.into(),
            relevance,
            reliability: 0.5,
            confidence_interval: ConfidenceInterval::around(relevance, 0.1),
            last_verified: Utc::now(),
            tier,
            metadata: EvidenceMetadata::default(),
        }
    }

    /// Attach the owning document
    pub fn with_document(mut self, id: DocumentId, document_type: DocumentType) -> Self {
        self.document_id = Some(id);
        self.document_type = document_type;
        self
    }

    /// Set reliability (clamped)
    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = unit(reliability);
        self
    }

    /// Set the verification timestamp
    pub fn with_last_verified(mut self, at: DateTime<Utc>) -> Self {
        self.last_verified = at;
        self
    }

    /// Set the ranking metadata
    pub fn with_metadata(mut self, metadata: EvidenceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Copy of this item with a new relevance score (clamped)
    pub fn rescored(&self, relevance: f64) -> Self {
        let mut item = self.clone();
        item.relevance = unit(relevance);
        item
    }

    /// Copy of this item with a new confidence interval
    pub fn with_interval(&self, interval: ConfidenceInterval) -> Self {
        let mut item = self.clone();
        item.confidence_interval = interval;
        item
    }

    /// Age of the source in whole days at `now`
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_verified).num_days()
    }
}

/// An uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier
    pub id: DocumentId,
    /// Display name (usually the file name)
    pub name: String,
    /// Folder the document lives in
    pub folder_id: Option<String>,
    /// Category
    pub document_type: DocumentType,
    /// Extracted text content
    pub content: String,
    /// Upload time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a document, inferring its type from the name
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            document_type: DocumentType::from_name(&name),
            name,
            folder_id: None,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Place the document in a folder
    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder_id = Some(folder.into());
        self
    }

    /// Override the inferred type
    pub fn with_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    /// First `max_chars` characters of the content
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.content, max_chars)
    }
}

/// A curated question/answer entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    /// Identifier
    pub id: QaId,
    /// The curated question
    pub question: String,
    /// The curated answer
    pub answer: String,
    /// Optional category label
    #[serde(default)]
    pub category: Option<String>,
    /// Display priority (higher first)
    #[serde(default)]
    pub priority: i32,
    /// Last update time
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl QaEntry {
    /// Create a curated entry
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: QaId::new(),
            question: question.into(),
            answer: answer.into(),
            category: None,
            priority: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_scores_are_clamped() {
        let item = EvidenceItem::new("s1", "Fee Schedule", "text", 1.4, EvidenceTier::Document)
            .with_reliability(-0.3);
        assert_eq!(item.relevance, 1.0);
        assert_eq!(item.reliability, 0.0);
        assert!(item.confidence_interval.upper <= 1.0);
    }

    #[test]
    fn test_document_type_from_name() {
        assert_eq!(DocumentType::from_name("Merchant Agreement.pdf"), DocumentType::Contract);
        assert_eq!(DocumentType::from_name("Refund Policy"), DocumentType::Policy);
        assert_eq!(DocumentType::from_name("POS Handbook"), DocumentType::Manual);
        assert_eq!(DocumentType::from_name("March statement"), DocumentType::Statement);
        assert_eq!(DocumentType::from_name("Setup Tutorial"), DocumentType::Guide);
        assert_eq!(DocumentType::from_name("notes.txt"), DocumentType::Other);
    }

    #[test]
    fn test_document_type_storage_names() {
        for t in [
            DocumentType::Contract,
            DocumentType::Policy,
            DocumentType::Manual,
            DocumentType::Statement,
            DocumentType::Guide,
            DocumentType::Other,
        ] {
            assert_eq!(DocumentType::parse(t.as_str()), t);
        }
    }

    #[test]
    fn test_rescored_does_not_mutate_original() {
        let item = EvidenceItem::new("s1", "Doc", "text", 0.4, EvidenceTier::Document);
        let rescored = item.rescored(0.9);
        assert_eq!(item.relevance, 0.4);
        assert_eq!(rescored.relevance, 0.9);
    }

    #[test]
    fn test_age_days() {
        let now = Utc::now();
        let item = EvidenceItem::new("s1", "Doc", "text", 0.4, EvidenceTier::Document)
            .with_last_verified(now - Duration::days(400));
        assert_eq!(item.age_days(now), 400);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
