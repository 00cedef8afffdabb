//! Evident Storage Layer
//!
//! Implements the evidence store adapter using SQLite + an HNSW chunk index.
//!
//! # Architecture
//!
//! - SQLite for curated Q&A entries, documents, chunks, and the append-only
//!   audit, feedback, and learning-profile tables
//! - HNSW for nearest-neighbour search over chunk embeddings, rebuilt from
//!   SQLite on open
//! - Local embedding model, so indexing never touches the network
//! - Blocking SQLite calls run on `spawn_blocking` so async callers never
//!   stall a runtime worker
//!
//! # Examples
//!
//! ```no_run
//! use evident_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for evidence operations
//! ```

#![warn(missing_docs)]

pub mod chunking;
pub mod embedding;
pub mod memory;
pub mod vector_index;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use embedding::{EmbeddingModel, HashingEmbedder};
use evident_domain::{
    key_terms, normalize_query, AuditEvent, AuditSink, Document, DocumentId, DocumentType,
    EvidenceItem, EvidenceMetadata, EvidenceStore, EvidenceTier, FeedbackId, FeedbackKind,
    FeedbackRecord, FeedbackStore, LearningProfile, PipelineError, PipelineResult, ProfileStore,
    QaEntry, QaId,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vector_index::ChunkIndex;

pub use memory::MemoryStore;

/// Default embedding dimension
pub const DEFAULT_DIMENSION: usize = 384;

/// Default chunk size (characters)
pub const DEFAULT_CHUNK_SIZE: usize = 800;

const EF_SEARCH: usize = 64;
const QA_CANDIDATE_LIMIT: usize = 50;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON payload error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embedding failure
    #[error("Embedding error: {0}")]
    Embedding(#[from] embedding::EmbeddingError),

    /// Vector index failure
    #[error("Vector index error: {0}")]
    Index(#[from] vector_index::VectorIndexError),

    /// Blocking task failed to complete
    #[error("Task join error: {0}")]
    Task(String),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PipelineError::NotFound(what),
            other => PipelineError::Storage(other.to_string()),
        }
    }
}

/// SQLite-backed evidence, audit, feedback, and profile store
///
/// # Thread Safety
///
/// The connection sits behind a mutex; every operation takes the lock inside
/// a blocking task. Cloning the store shares the connection and index.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    index: Arc<ChunkIndex>,
    embedder: Arc<dyn EmbeddingModel>,
    chunk_size: usize,
}

impl SqliteStore {
    /// Open (or create) a store at `path` with the default hashing embedder
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::with_embedder(path, Arc::new(HashingEmbedder::new(DEFAULT_DIMENSION)))
    }

    /// Open a store with a specific embedding model
    pub fn with_embedder<P: AsRef<Path>>(
        path: P,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(include_str!("schema.sql"))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            index: Arc::new(ChunkIndex::new(embedder.dimension())),
            embedder,
            chunk_size: DEFAULT_CHUNK_SIZE,
        };
        store.rebuild_index()?;
        Ok(store)
    }

    /// Set the chunk size used for new documents
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of vectors in the chunk index
    pub fn indexed_chunks(&self) -> usize {
        self.index.len()
    }

    /// Reload every chunk embedding from SQLite into the HNSW index
    fn rebuild_index(&self) -> Result<(), StoreError> {
        self.index.clear();
        let conn = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        let mut stmt = conn.prepare("SELECT id, embedding FROM chunks ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))?;

        let mut loaded = 0usize;
        for row in rows {
            let (id, bytes) = row?;
            self.index.add(id, &embedding::from_bytes(&bytes))?;
            loaded += 1;
        }
        if loaded > 0 {
            tracing::debug!("Rebuilt chunk index with {} vectors", loaded);
        }
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|p| p.into_inner());
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Insert or replace a curated Q&A entry
    pub async fn insert_qa(&self, entry: &QaEntry) -> Result<(), StoreError> {
        let entry = entry.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO qa_entries (id, question, answer, category, priority, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id.to_string(),
                    entry.question,
                    entry.answer,
                    entry.category,
                    entry.priority,
                    ts(&entry.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Insert a document, chunk it, and index its chunks
    ///
    /// Returns the number of chunks indexed.
    pub async fn insert_document(&self, document: &Document) -> Result<usize, StoreError> {
        let chunks = chunking::chunk_text(&document.content, self.chunk_size);
        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match self.embedder.embed(&chunk) {
                Ok(vector) => embedded.push((chunk, vector)),
                Err(e) => tracing::warn!("Skipping unembeddable chunk of '{}': {}", document.name, e),
            }
        }

        let document = document.clone();
        let rows = self
            .blocking(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM chunks WHERE document_id = ?1", params![document.id.to_string()])?;
                tx.execute(
                    "INSERT OR REPLACE INTO documents
                     (id, name, folder_id, document_type, content, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        document.id.to_string(),
                        document.name,
                        document.folder_id,
                        document.document_type.as_str(),
                        document.content,
                        ts(&document.created_at),
                        ts(&document.updated_at),
                    ],
                )?;

                let mut rows = Vec::with_capacity(embedded.len());
                for (position, (content, vector)) in embedded.into_iter().enumerate() {
                    tx.execute(
                        "INSERT INTO chunks (document_id, position, content, embedding) VALUES (?1, ?2, ?3, ?4)",
                        params![document.id.to_string(), position as i64, content, embedding::to_bytes(&vector)],
                    )?;
                    rows.push((tx.last_insert_rowid(), vector));
                }
                tx.commit()?;
                Ok(rows)
            })
            .await?;

        for (id, vector) in &rows {
            self.index.add(*id, vector)?;
        }
        Ok(rows.len())
    }

    /// Record a document view (popularity signal for reranking)
    pub async fn record_view(&self, id: DocumentId) -> Result<(), StoreError> {
        self.blocking(move |conn| {
            let changed = conn.execute(
                "UPDATE documents SET views = views + 1 WHERE id = ?1",
                params![id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("document {}", id)));
            }
            Ok(())
        })
        .await
    }

    /// Read audit events in insertion order, optionally filtered by kind
    pub async fn read_audit(&self, kind: Option<&str>) -> Result<Vec<AuditEvent>, StoreError> {
        let kind = kind.map(str::to_string);
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT payload FROM audit_log WHERE (?1 IS NULL OR kind = ?1) ORDER BY id",
            )?;
            let payloads = stmt
                .query_map(params![kind], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            payloads
                .iter()
                .map(|p| serde_json::from_str(p).map_err(StoreError::from))
                .collect()
        })
        .await
    }

    /// Count stored documents
    pub async fn document_count(&self) -> Result<usize, StoreError> {
        self.blocking(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
            Ok(n as usize)
        })
        .await
    }
}

fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{}': {}", s, e)))
}

fn parse_id<T: std::str::FromStr<Err = String>>(s: &str) -> Result<T, StoreError> {
    s.parse::<T>().map_err(StoreError::InvalidData)
}

fn conversion_error(e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_qa(row: &Row<'_>) -> rusqlite::Result<QaEntry> {
    let id: String = row.get(0)?;
    let updated_at: String = row.get(5)?;
    Ok(QaEntry {
        id: parse_id::<QaId>(&id).map_err(conversion_error)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        category: row.get(3)?,
        priority: row.get(4)?,
        updated_at: parse_ts(&updated_at).map_err(conversion_error)?,
    })
}

const DOCUMENT_COLUMNS: &str = "id, name, folder_id, document_type, content, created_at, updated_at";

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    row_to_document_at(row, 0)
}

/// Map the document columns starting at `offset`
fn row_to_document_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Document> {
    let id: String = row.get(offset)?;
    let document_type: String = row.get(offset + 3)?;
    let created_at: String = row.get(offset + 5)?;
    let updated_at: String = row.get(offset + 6)?;
    Ok(Document {
        id: parse_id::<DocumentId>(&id).map_err(conversion_error)?,
        name: row.get(offset + 1)?,
        folder_id: row.get(offset + 2)?,
        document_type: DocumentType::parse(&document_type),
        content: row.get(offset + 4)?,
        created_at: parse_ts(&created_at).map_err(conversion_error)?,
        updated_at: parse_ts(&updated_at).map_err(conversion_error)?,
    })
}

fn row_to_feedback(row: &Row<'_>) -> rusqlite::Result<FeedbackRecord> {
    let id: String = row.get(0)?;
    let feedback: String = row.get(5)?;
    let timestamp: String = row.get(6)?;
    Ok(FeedbackRecord {
        id: parse_id::<FeedbackId>(&id).map_err(conversion_error)?,
        user_id: row.get(1)?,
        query: row.get(2)?,
        original_response: row.get(3)?,
        corrected_response: row.get(4)?,
        feedback: FeedbackKind::parse(&feedback)
            .ok_or_else(|| conversion_error(StoreError::InvalidData(format!("feedback '{}'", feedback))))?,
        timestamp: parse_ts(&timestamp).map_err(conversion_error)?,
    })
}

struct ChunkHit {
    content: String,
    document: Document,
    views: i64,
    rating: Option<f64>,
}

#[async_trait]
impl EvidenceStore for SqliteStore {
    async fn search_qa(&self, text: &str) -> PipelineResult<Vec<QaEntry>> {
        let mut terms = key_terms(text);
        if terms.is_empty() {
            let normalized = normalize_query(text);
            if normalized.is_empty() {
                return Ok(Vec::new());
            }
            terms.push(normalized);
        }

        let entries = self
            .blocking(move |conn| {
                let clauses: Vec<String> = (1..=terms.len())
                    .map(|i| format!("lower(question) LIKE ?{i} OR lower(answer) LIKE ?{i}"))
                    .collect();
                let sql = format!(
                    "SELECT id, question, answer, category, priority, updated_at FROM qa_entries
                     WHERE {} ORDER BY priority DESC LIMIT {}",
                    clauses.join(" OR "),
                    QA_CANDIDATE_LIMIT
                );
                let patterns: Vec<String> = terms.iter().map(|t| format!("%{}%", t)).collect();
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(patterns.iter()), row_to_qa)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(entries)
    }

    async fn search_vector(&self, text: &str, k: usize) -> PipelineResult<Vec<EvidenceItem>> {
        let query = match self.embedder.embed(text) {
            Ok(q) => q,
            Err(_) => return Ok(Vec::new()),
        };
        let neighbours = self
            .index
            .search(&query, k.saturating_mul(3).max(k), EF_SEARCH)
            .map_err(StoreError::from)?;
        if neighbours.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self
            .blocking(move |conn| {
                let sql = "SELECT c.content, d.views, d.rating, d.id, d.name, d.folder_id,
                           d.document_type, d.content, d.created_at, d.updated_at
                           FROM chunks c JOIN documents d ON d.id = c.document_id WHERE c.id = ?1";
                let mut stmt = conn.prepare(sql)?;
                let mut hits = Vec::new();
                for (chunk_id, similarity) in neighbours {
                    let hit = stmt
                        .query_row(params![chunk_id], |row| {
                            let content: String = row.get(0)?;
                            let views: i64 = row.get(1)?;
                            let rating: Option<f64> = row.get(2)?;
                            let document = row_to_document_at(row, 3)?;
                            Ok(ChunkHit {
                                content,
                                document,
                                views,
                                rating,
                            })
                        })
                        .optional()?;
                    if let Some(hit) = hit {
                        hits.push((hit, similarity));
                    }
                }
                Ok(hits)
            })
            .await?;

        // Best chunk per document
        let mut best: HashMap<DocumentId, (ChunkHit, f32)> = HashMap::new();
        for (hit, similarity) in hits {
            let id = hit.document.id;
            match best.get(&id) {
                Some((_, existing)) if *existing >= similarity => {}
                _ => {
                    best.insert(id, (hit, similarity));
                }
            }
        }

        let mut items: Vec<EvidenceItem> = best
            .into_values()
            .map(|(hit, similarity)| {
                let doc = hit.document;
                let tags = doc.folder_id.clone().into_iter().collect();
                EvidenceItem::new(doc.id.to_string(), doc.name.clone(), hit.content, similarity as f64, EvidenceTier::Document)
                    .with_document(doc.id, doc.document_type)
                    .with_last_verified(doc.updated_at)
                    .with_metadata(EvidenceMetadata {
                        views: hit.views.max(0) as u64,
                        rating: hit.rating,
                        tags,
                        url: None,
                    })
            })
            .collect();
        items.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
        items.truncate(k);
        Ok(items)
    }

    async fn get_document(&self, id: DocumentId) -> PipelineResult<Option<Document>> {
        let document = self
            .blocking(move |conn| {
                let doc = conn
                    .query_row(
                        &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                        params![id.to_string()],
                        row_to_document,
                    )
                    .optional()?;
                Ok(doc)
            })
            .await?;
        Ok(document)
    }

    async fn documents_in_folder(&self, folder_id: &str, limit: usize) -> PipelineResult<Vec<Document>> {
        let folder_id = folder_id.to_string();
        let documents = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents WHERE folder_id = ?1 ORDER BY updated_at DESC LIMIT ?2",
                    DOCUMENT_COLUMNS
                ))?;
                let docs = stmt
                    .query_map(params![folder_id, limit as i64], row_to_document)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(docs)
            })
            .await?;
        Ok(documents)
    }
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn record(&self, event: AuditEvent) -> PipelineResult<()> {
        let payload = serde_json::to_string(&event).map_err(StoreError::from)?;
        let kind = event.kind();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO audit_log (kind, payload, created_at) VALUES (?1, ?2, ?3)",
                params![kind, payload, ts(&Utc::now())],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for SqliteStore {
    async fn append(&self, record: &FeedbackRecord) -> PipelineResult<()> {
        let record = record.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO feedback (id, user_id, query, original_response, corrected_response, feedback, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.to_string(),
                    record.user_id,
                    record.query,
                    record.original_response,
                    record.corrected_response,
                    record.feedback.as_str(),
                    ts(&record.timestamp),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> PipelineResult<Vec<FeedbackRecord>> {
        let user_id = user_id.to_string();
        let records = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, query, original_response, corrected_response, feedback, timestamp
                     FROM feedback WHERE user_id = ?1 AND timestamp >= ?2
                     ORDER BY timestamp DESC LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(params![user_id, ts(&since), limit as i64], row_to_feedback)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(records)
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn load(&self, user_id: &str) -> PipelineResult<Option<LearningProfile>> {
        let user_id = user_id.to_string();
        let profile = self
            .blocking(move |conn| {
                let payload: Option<String> = conn
                    .query_row(
                        "SELECT profile FROM learning_profiles WHERE user_id = ?1",
                        params![user_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                payload
                    .map(|p| serde_json::from_str(&p).map_err(StoreError::from))
                    .transpose()
            })
            .await?;
        Ok(profile)
    }

    async fn save(&self, profile: &LearningProfile) -> PipelineResult<()> {
        let payload = serde_json::to_string(profile).map_err(StoreError::from)?;
        let user_id = profile.user_id.clone();
        let updated_at = ts(&profile.updated_at);
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO learning_profiles (user_id, profile, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET profile = excluded.profile, updated_at = excluded.updated_at",
                params![user_id, payload, updated_at],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn all(&self) -> PipelineResult<Vec<LearningProfile>> {
        let profiles = self
            .blocking(|conn| {
                let mut stmt = conn.prepare("SELECT profile FROM learning_profiles ORDER BY user_id")?;
                let payloads = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                payloads
                    .iter()
                    .map(|p| serde_json::from_str(p).map_err(StoreError::from))
                    .collect()
            })
            .await?;
        Ok(profiles)
    }
}
