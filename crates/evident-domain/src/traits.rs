//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between pipeline logic and
//! infrastructure. Every call is a suspension point, so the traits are async
//! and object-safe; engines hold them as `Arc<dyn Trait>`.

use crate::audit::AuditEvent;
use crate::error::PipelineResult;
use crate::evidence::{Document, EvidenceItem, QaEntry};
use crate::ids::DocumentId;
use crate::learning::{FeedbackRecord, LearningProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read access to the curated Q&A table and the document index
///
/// Implemented by the infrastructure layer (evident-store)
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Keyword search over curated questions and answers
    async fn search_qa(&self, text: &str) -> PipelineResult<Vec<QaEntry>>;

    /// Nearest-neighbour search over document chunks
    async fn search_vector(&self, text: &str, k: usize) -> PipelineResult<Vec<EvidenceItem>>;

    /// Fetch a document by id
    async fn get_document(&self, id: DocumentId) -> PipelineResult<Option<Document>>;

    /// Documents in a folder, excluding none, up to `limit`
    async fn documents_in_folder(&self, folder_id: &str, limit: usize) -> PipelineResult<Vec<Document>>;
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (or the pipeline speaking as one)
    User,
    /// A previous model turn
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker
    pub role: Role,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// A user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt
    pub system_prompt: String,
    /// Conversation
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    /// Single-turn request
    pub fn new(system_prompt: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![ChatMessage::user(user)],
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Concatenated text of the system prompt and all messages
    pub fn full_text(&self) -> String {
        let mut text = self.system_prompt.clone();
        for m in &self.messages {
            text.push('\n');
            text.push_str(&m.content);
        }
        text
    }
}

/// A completion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Model that produced it
    pub model_used: String,
}

/// Large-language-model completion service
///
/// Implemented by the infrastructure layer (evident-llm)
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<Completion>;
}

/// Web search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResult {
    /// Answer content
    pub content: String,
    /// Citation URLs
    pub citations: Vec<String>,
    /// Heuristic confidence [0, 1]
    pub confidence: f64,
}

/// External web search
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    /// Search the web
    async fn search(&self, query: &str) -> PipelineResult<WebSearchResult>;
}

/// Append-only audit log
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an event
    async fn record(&self, event: AuditEvent) -> PipelineResult<()>;
}

/// Append-only feedback storage
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Append a record
    async fn append(&self, record: &FeedbackRecord) -> PipelineResult<()>;

    /// Records for a user at or after `since`, newest first, up to `limit`
    async fn recent(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> PipelineResult<Vec<FeedbackRecord>>;
}

/// Learning profiles keyed by user id
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a profile
    async fn load(&self, user_id: &str) -> PipelineResult<Option<LearningProfile>>;

    /// Upsert a profile (last write wins)
    async fn save(&self, profile: &LearningProfile) -> PipelineResult<()>;

    /// All profiles, for aggregate metrics
    async fn all(&self) -> PipelineResult<Vec<LearningProfile>>;
}
