//! Evident Domain Layer
//!
//! This crate contains the data model shared by every stage of the
//! question-answering pipeline, the error taxonomy, and the async trait
//! interfaces that infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Evidence Item**: a scored snippet of curated, document, or web content
//! - **Confidence Interval**: [lower, upper] bounds around an estimate
//! - **Reasoning Chain**: ordered, dependent steps answering a complex query
//! - **Conflict**: a pairwise disagreement between two documents
//! - **Citation**: a ranked, confidence-scored attribution of a claim
//! - **Learning Profile**: per-user smoothed accuracy and satisfaction
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Infrastructure implementations live in other crates
//! - Every external interaction goes through a trait in [`traits`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod citation;
pub mod confidence;
pub mod error;
pub mod evidence;
pub mod ids;
pub mod learning;
pub mod query;
pub mod reasoning;
pub mod relationship;
pub mod response;
pub mod traits;
pub mod verification;

// Re-exports for convenience
pub use audit::AuditEvent;
pub use citation::{
    Citation, CitationSource, CitationStatus, EvidenceStrength, SnippetKind, SnippetStrength,
    SupportingSnippet, WarningFlag, WarningKind,
};
pub use confidence::{unit, ConfidenceInterval};
pub use error::{PipelineError, PipelineResult};
pub use evidence::{
    truncate_chars, Document, DocumentType, EvidenceItem, EvidenceMetadata, EvidenceTier, QaEntry,
};
pub use ids::{DocumentId, FeedbackId, QaId};
pub use learning::{
    FeedbackKind, FeedbackRecord, ImprovementCandidate, ImprovementCategory, LearningProfile,
    Personalization, ResponseStyle, ReviewStatus,
};
pub use query::{classify_query, is_complex, is_stop_word, key_terms, normalize_query, Decomposition, QueryType, SubQuery};
pub use reasoning::{InferenceKind, LogicalInference, ReasoningChain, ReasoningStep, StepStatus};
pub use relationship::{
    AlertType, Conflict, ConflictType, ConsistencyAlert, DocumentRelationship, RelationshipType,
    Severity,
};
pub use response::{AnswerResponse, ConfidenceLevel, ConfidenceMetrics, SourceRef};
pub use traits::{
    AuditSink, ChatMessage, Completion, CompletionClient, CompletionRequest, EvidenceStore,
    FeedbackStore, ProfileStore, Role, WebSearchClient, WebSearchResult,
};
pub use verification::{AssessedEvidence, ClaimStatus, SupportType, VerificationVerdict};
