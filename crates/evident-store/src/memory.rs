//! In-memory store
//!
//! Implements every storage trait over plain collections for tests across
//! the workspace. Failure toggles let callers exercise degraded-evidence
//! paths.

use crate::chunking::chunk_text;
use crate::embedding::{cosine_similarity, EmbeddingModel, HashingEmbedder};
use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_DIMENSION};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evident_domain::{
    key_terms, normalize_query, AuditEvent, AuditSink, Document, DocumentId, EvidenceItem,
    EvidenceMetadata, EvidenceStore, EvidenceTier, FeedbackRecord, FeedbackStore, LearningProfile,
    PipelineError, PipelineResult, ProfileStore, QaEntry,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    qa: Vec<QaEntry>,
    documents: Vec<Document>,
    chunks: Vec<(DocumentId, String, Vec<f32>)>,
    views: HashMap<DocumentId, u64>,
    audit: Vec<AuditEvent>,
    feedback: Vec<FeedbackRecord>,
    profiles: HashMap<String, LearningProfile>,
}

/// Collection-backed store
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    embedder: Arc<HashingEmbedder>,
    qa_calls: Arc<AtomicUsize>,
    vector_calls: Arc<AtomicUsize>,
    fail_qa: Arc<AtomicBool>,
    fail_vector: Arc<AtomicBool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            embedder: Arc::new(HashingEmbedder::new(DEFAULT_DIMENSION)),
            qa_calls: Arc::new(AtomicUsize::new(0)),
            vector_calls: Arc::new(AtomicUsize::new(0)),
            fail_qa: Arc::new(AtomicBool::new(false)),
            fail_vector: Arc::new(AtomicBool::new(false)),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Add a curated Q&A entry
    pub fn add_qa(&self, entry: QaEntry) {
        self.inner().qa.push(entry);
    }

    /// Add a document and its chunks
    pub fn add_document(&self, document: Document) {
        let chunks: Vec<_> = chunk_text(&document.content, DEFAULT_CHUNK_SIZE)
            .into_iter()
            .filter_map(|c| self.embedder.embed(&c).ok().map(|v| (document.id, c, v)))
            .collect();

        let mut inner = self.inner();
        inner.chunks.retain(|(id, _, _)| *id != document.id);
        inner.documents.retain(|d| d.id != document.id);
        inner.chunks.extend(chunks);
        inner.documents.push(document);
    }

    /// Set a document's view count
    pub fn set_views(&self, id: DocumentId, views: u64) {
        self.inner().views.insert(id, views);
    }

    /// Make Q&A searches fail with a storage error
    pub fn fail_qa(&self, fail: bool) {
        self.fail_qa.store(fail, Ordering::SeqCst);
    }

    /// Make vector searches fail with a storage error
    pub fn fail_vector(&self, fail: bool) {
        self.fail_vector.store(fail, Ordering::SeqCst);
    }

    /// Number of Q&A searches served
    pub fn qa_calls(&self) -> usize {
        self.qa_calls.load(Ordering::SeqCst)
    }

    /// Number of vector searches served
    pub fn vector_calls(&self) -> usize {
        self.vector_calls.load(Ordering::SeqCst)
    }

    /// Recorded audit events, oldest first
    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.inner().audit.clone()
    }

    /// Stored feedback, oldest first
    pub fn feedback(&self) -> Vec<FeedbackRecord> {
        self.inner().feedback.clone()
    }
}

#[async_trait]
impl EvidenceStore for MemoryStore {
    async fn search_qa(&self, text: &str) -> PipelineResult<Vec<QaEntry>> {
        self.qa_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_qa.load(Ordering::SeqCst) {
            return Err(PipelineError::Storage("qa search unavailable".to_string()));
        }

        let mut terms = key_terms(text);
        if terms.is_empty() {
            let normalized = normalize_query(text);
            if normalized.is_empty() {
                return Ok(Vec::new());
            }
            terms.push(normalized);
        }

        let mut hits: Vec<QaEntry> = self
            .inner()
            .qa
            .iter()
            .filter(|e| {
                let question = e.question.to_lowercase();
                let answer = e.answer.to_lowercase();
                terms.iter().any(|t| question.contains(t) || answer.contains(t))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(hits)
    }

    async fn search_vector(&self, text: &str, k: usize) -> PipelineResult<Vec<EvidenceItem>> {
        self.vector_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_vector.load(Ordering::SeqCst) {
            return Err(PipelineError::Storage("vector search unavailable".to_string()));
        }
        let query = match self.embedder.embed(text) {
            Ok(q) => q,
            Err(_) => return Ok(Vec::new()),
        };

        let inner = self.inner();
        let mut best: HashMap<DocumentId, (&str, f32)> = HashMap::new();
        for (id, content, vector) in &inner.chunks {
            let similarity = cosine_similarity(&query, vector);
            if best.get(id).map_or(true, |(_, s)| similarity > *s) {
                best.insert(*id, (content.as_str(), similarity));
            }
        }

        let mut items: Vec<EvidenceItem> = best
            .into_iter()
            .filter_map(|(id, (content, similarity))| {
                let doc = inner.documents.iter().find(|d| d.id == id)?;
                Some(
                    EvidenceItem::new(id.to_string(), doc.name.clone(), content, similarity as f64, EvidenceTier::Document)
                        .with_document(id, doc.document_type)
                        .with_last_verified(doc.updated_at)
                        .with_metadata(EvidenceMetadata {
                            views: inner.views.get(&id).copied().unwrap_or(0),
                            rating: None,
                            tags: doc.folder_id.clone().into_iter().collect(),
                            url: None,
                        }),
                )
            })
            .collect();
        items.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
        items.truncate(k);
        Ok(items)
    }

    async fn get_document(&self, id: DocumentId) -> PipelineResult<Option<Document>> {
        Ok(self.inner().documents.iter().find(|d| d.id == id).cloned())
    }

    async fn documents_in_folder(&self, folder_id: &str, limit: usize) -> PipelineResult<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .inner()
            .documents
            .iter()
            .filter(|d| d.folder_id.as_deref() == Some(folder_id))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        docs.truncate(limit);
        Ok(docs)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, event: AuditEvent) -> PipelineResult<()> {
        self.inner().audit.push(event);
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn append(&self, record: &FeedbackRecord) -> PipelineResult<()> {
        self.inner().feedback.push(record.clone());
        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> PipelineResult<Vec<FeedbackRecord>> {
        let mut records: Vec<FeedbackRecord> = self
            .inner()
            .feedback
            .iter()
            .filter(|r| r.user_id == user_id && r.timestamp >= since)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load(&self, user_id: &str) -> PipelineResult<Option<LearningProfile>> {
        Ok(self.inner().profiles.get(user_id).cloned())
    }

    async fn save(&self, profile: &LearningProfile) -> PipelineResult<()> {
        self.inner().profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn all(&self) -> PipelineResult<Vec<LearningProfile>> {
        let mut profiles: Vec<_> = self.inner().profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_toggles_and_counters() {
        let store = MemoryStore::new();
        store.add_qa(QaEntry::new("Refund policy?", "30 days."));

        assert_eq!(store.search_qa("refund").await.unwrap().len(), 1);
        store.fail_qa(true);
        assert!(matches!(store.search_qa("refund").await, Err(PipelineError::Storage(_))));
        assert_eq!(store.qa_calls(), 2);
    }

    #[tokio::test]
    async fn test_vector_search_best_chunk_per_document() {
        let store = MemoryStore::new();
        let doc = Document::new("Fee Schedule", "Interchange plus pricing. Flat rate pricing.");
        store.add_document(doc.clone());
        store.add_document(Document::new("Setup", "Connect the terminal to ethernet."));

        let hits = store.search_vector("flat rate pricing", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, Some(doc.id));
        assert!(hits[0].relevance > hits[1].relevance);
    }

    #[tokio::test]
    async fn test_recent_feedback_window() {
        use evident_domain::FeedbackKind;

        let store = MemoryStore::new();
        let mut old = FeedbackRecord::new("u1", "q", "r", FeedbackKind::Negative);
        old.timestamp = Utc::now() - chrono::Duration::days(10);
        store.append(&old).await.unwrap();
        store
            .append(&FeedbackRecord::new("u1", "q", "r", FeedbackKind::Positive))
            .await
            .unwrap();

        let since = Utc::now() - chrono::Duration::days(7);
        let recent = store.recent("u1", since, 50).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].feedback, FeedbackKind::Positive);
    }
}
