//! Document relationship engine

use crate::config::GraphConfig;
use crate::prompt::PromptBuilder;
use evident_domain::{
    CompletionClient, CompletionRequest, Conflict, ConflictType, Document, DocumentId,
    DocumentRelationship, EvidenceStore, PipelineError, PipelineResult, RelationshipType, Severity,
};
use evident_llm::complete_json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A factual statement extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClaim {
    /// The statement
    pub claim: String,
    /// Extraction confidence [0, 1]
    pub confidence: f64,
    /// Supporting excerpts
    pub supporting_evidence: Vec<String>,
}

/// Everything known about one document and its neighbours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContext {
    /// The document
    pub document: Document,
    /// Relationships to folder neighbours
    pub relationships: Vec<DocumentRelationship>,
    /// Key entities
    pub entities: Vec<String>,
    /// Main topics
    pub topics: Vec<String>,
    /// Factual claims
    pub claims: Vec<ExtractedClaim>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipJudgment {
    has_relationship: bool,
    #[serde(default)]
    relationship_type: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default, alias = "context")]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictJudgment {
    has_conflict: bool,
    #[serde(default)]
    conflict_type: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    evidence_snippets: Vec<String>,
    #[serde(default)]
    resolution_suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaim {
    claim: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    supporting_evidence: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClaimList {
    #[serde(default)]
    claims: Vec<RawClaim>,
}

/// Pull a string list out of either a bare array or `{ "<key>": [...] }`
fn string_list(value: &Value, key: &str) -> Vec<String> {
    let array = match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get(key).and_then(Value::as_array),
        _ => None,
    };
    array
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Finds relationships, conflicts, and structure across documents
pub struct GraphEngine {
    store: Arc<dyn EvidenceStore>,
    llm: Arc<dyn CompletionClient>,
    prompts: PromptBuilder,
    config: GraphConfig,
}

impl GraphEngine {
    /// Create an engine
    pub fn new(store: Arc<dyn EvidenceStore>, llm: Arc<dyn CompletionClient>, config: GraphConfig) -> Self {
        Self {
            store,
            llm,
            prompts: PromptBuilder::new(config.temperature),
            config,
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: &CompletionRequest) -> PipelineResult<T> {
        let (value, model) = timeout(self.config.call_timeout(), complete_json::<T>(self.llm.as_ref(), request))
            .await
            .map_err(|_| PipelineError::ExternalServiceFailure("analysis call timed out".to_string()))??;
        debug!("Graph analysis answered by {}", model);
        Ok(value)
    }

    async fn load(&self, id: DocumentId) -> PipelineResult<Document> {
        self.store
            .get_document(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("document {}", id)))
    }

    /// Relationships between a document and the other documents in its folder
    ///
    /// Fails only when the document itself cannot be loaded.
    pub async fn relationships(&self, doc_id: DocumentId) -> PipelineResult<Vec<DocumentRelationship>> {
        let document = self.load(doc_id).await?;
        let Some(folder) = document.folder_id.as_deref() else {
            debug!("Document {} has no folder; no neighbours to compare", doc_id);
            return Ok(Vec::new());
        };

        let neighbours: Vec<Document> = match self
            .store
            .documents_in_folder(folder, self.config.max_folder_documents + 1)
            .await
        {
            Ok(docs) => docs
                .into_iter()
                .filter(|d| d.id != doc_id)
                .take(self.config.max_folder_documents)
                .collect(),
            Err(e) => {
                warn!("Failed to list folder '{}': {}", folder, e);
                return Ok(Vec::new());
            }
        };

        let mut relationships = Vec::new();
        for other in &neighbours {
            match self.relationship_between(&document, other).await {
                Ok(Some(rel)) => relationships.push(rel),
                Ok(None) => {}
                Err(e) => warn!("Relationship analysis {} -> {} failed: {}", document.id, other.id, e),
            }
        }

        info!(
            "Relationship analysis complete: {} relationships across {} neighbours",
            relationships.len(),
            neighbours.len()
        );
        Ok(relationships)
    }

    async fn relationship_between(&self, a: &Document, b: &Document) -> PipelineResult<Option<DocumentRelationship>> {
        let request = self.prompts.relationship(a, b, self.config.relationship_preview_chars);
        let judgment: RelationshipJudgment = self.call(&request).await?;

        let confidence = judgment.confidence.clamp(0.0, 100.0).round() as u8;
        if !judgment.has_relationship || confidence <= self.config.min_relationship_confidence {
            return Ok(None);
        }
        let Some(relationship_type) = judgment.relationship_type.as_deref().and_then(RelationshipType::parse) else {
            warn!("Unrecognized relationship type {:?}", judgment.relationship_type);
            return Ok(None);
        };

        Ok(Some(DocumentRelationship {
            source: a.id,
            target: b.id,
            target_name: b.name.clone(),
            relationship_type,
            confidence,
            description: judgment.description,
        }))
    }

    /// Pairwise conflicts among the given documents
    ///
    /// At most `max_conflict_documents` ids are considered. Documents that
    /// cannot be loaded and pairs whose analysis fails are skipped.
    pub async fn detect_conflicts(&self, doc_ids: &[DocumentId]) -> Vec<Conflict> {
        let mut unique: Vec<DocumentId> = Vec::new();
        for id in doc_ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        unique.truncate(self.config.max_conflict_documents);

        let mut documents = Vec::new();
        for id in unique {
            match self.load(id).await {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("Skipping document {} in conflict scan: {}", id, e),
            }
        }

        let mut conflicts = Vec::new();
        for (i, a) in documents.iter().enumerate() {
            for b in &documents[i + 1..] {
                match self.conflict_between(a, b).await {
                    Ok(Some(conflict)) => conflicts.push(conflict),
                    Ok(None) => {}
                    Err(e) => warn!("Conflict analysis {} <-> {} failed: {}", a.id, b.id, e),
                }
            }
        }

        info!(
            "Conflict detection complete: {} conflicts among {} documents",
            conflicts.len(),
            documents.len()
        );
        conflicts
    }

    async fn conflict_between(&self, a: &Document, b: &Document) -> PipelineResult<Option<Conflict>> {
        let request = self.prompts.conflict(a, b, self.config.conflict_preview_chars);
        let judgment: ConflictJudgment = self.call(&request).await?;
        if !judgment.has_conflict {
            return Ok(None);
        }

        Ok(Some(Conflict {
            documents_involved: [a.id, b.id],
            conflict_type: judgment
                .conflict_type
                .as_deref()
                .and_then(ConflictType::parse)
                .unwrap_or(ConflictType::Factual),
            severity: judgment
                .severity
                .as_deref()
                .and_then(Severity::parse)
                .unwrap_or(Severity::Medium),
            description: judgment.description,
            evidence_snippets: judgment.evidence_snippets,
            resolution_suggestion: judgment.resolution_suggestion.filter(|s| !s.trim().is_empty()),
        }))
    }

    /// Key entities of a document; empty on failure
    pub async fn extract_entities(&self, doc: &Document) -> Vec<String> {
        let request = self.prompts.entities(doc, self.config.extraction_preview_chars);
        match self.call::<Value>(&request).await {
            Ok(value) => string_list(&value, "entities"),
            Err(e) => {
                warn!("Entity extraction failed for {}: {}", doc.id, e);
                Vec::new()
            }
        }
    }

    /// Main topics of a document; empty on failure
    pub async fn extract_topics(&self, doc: &Document) -> Vec<String> {
        let request = self.prompts.topics(doc, self.config.topic_preview_chars);
        match self.call::<Value>(&request).await {
            Ok(value) => string_list(&value, "topics"),
            Err(e) => {
                warn!("Topic extraction failed for {}: {}", doc.id, e);
                Vec::new()
            }
        }
    }

    /// Factual claims of a document; empty on failure
    pub async fn extract_claims(&self, doc: &Document) -> Vec<ExtractedClaim> {
        let request = self.prompts.claims(doc, self.config.extraction_preview_chars);
        match self.call::<ClaimList>(&request).await {
            Ok(list) => list
                .claims
                .into_iter()
                .filter(|c| !c.claim.trim().is_empty())
                .map(|c| ExtractedClaim {
                    claim: c.claim,
                    confidence: (c.confidence / 100.0).clamp(0.0, 1.0),
                    supporting_evidence: c.supporting_evidence,
                })
                .collect(),
            Err(e) => {
                warn!("Claim extraction failed for {}: {}", doc.id, e);
                Vec::new()
            }
        }
    }

    /// Relationships, entities, topics, and claims of one document
    pub async fn build_context(&self, doc_id: DocumentId) -> PipelineResult<DocumentContext> {
        let document = self.load(doc_id).await?;
        let relationships = self.relationships(doc_id).await.unwrap_or_else(|e| {
            warn!("Relationship analysis failed for {}: {}", doc_id, e);
            Vec::new()
        });
        let entities = self.extract_entities(&document).await;
        let topics = self.extract_topics(&document).await;
        let claims = self.extract_claims(&document).await;

        info!(
            "Document context complete: {} relationships, {} entities, {} topics, {} claims",
            relationships.len(),
            entities.len(),
            topics.len(),
            claims.len()
        );
        Ok(DocumentContext {
            document,
            relationships,
            entities,
            topics,
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_llm::MockProvider;
    use evident_store::MemoryStore;

    const NO_CONFLICT: &str = r#"{"hasConflict": false}"#;

    fn engine(store: Arc<MemoryStore>, llm: MockProvider) -> GraphEngine {
        GraphEngine::new(store, Arc::new(llm), GraphConfig::default())
    }

    #[test]
    fn test_string_list_shapes() {
        let bare: Value = serde_json::json!(["TSYS", " ", "EMV"]);
        assert_eq!(string_list(&bare, "entities"), vec!["TSYS", "EMV"]);
        let wrapped: Value = serde_json::json!({"topics": ["pricing"]});
        assert_eq!(string_list(&wrapped, "topics"), vec!["pricing"]);
        assert!(string_list(&wrapped, "entities").is_empty());
    }

    #[tokio::test]
    async fn test_relationship_confidence_threshold() {
        let store = Arc::new(MemoryStore::new());
        let doc = Document::new("Rate Sheet", "Card present 2.5%").in_folder("pricing");
        let strong = Document::new("Fee Addendum", "Updates the rate sheet").in_folder("pricing");
        let weak = Document::new("Holiday Hours", "Closed on holidays").in_folder("pricing");
        let id = doc.id;
        for d in [doc, strong, weak] {
            store.add_document(d);
        }

        let llm = MockProvider::new(r#"{"hasRelationship": true, "relationshipType": "supports", "confidence": 60}"#);
        llm.add_response(
            "Fee Addendum",
            r#"{"hasRelationship": true, "relationshipType": "supersedes", "confidence": 85, "description": "newer rates"}"#,
        );

        let rels = engine(store, llm).relationships(id).await.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relationship_type, RelationshipType::Supersedes);
        assert_eq!(rels[0].target_name, "Fee Addendum");
        assert_eq!(rels[0].confidence, 85);
    }

    #[tokio::test]
    async fn test_relationships_for_missing_document() {
        let store = Arc::new(MemoryStore::new());
        let result = engine(store, MockProvider::default()).relationships(DocumentId::new()).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unloadable_ids_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let doc = Document::new("Only One", "content");
        let id = doc.id;
        store.add_document(doc);
        let llm = MockProvider::new(NO_CONFLICT);

        let conflicts = engine(store, llm.clone()).detect_conflicts(&[id, DocumentId::new(), id]).await;
        assert!(conflicts.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_empty() {
        let store = Arc::new(MemoryStore::new());
        let doc = Document::new("Guide", "Clover Flex");
        let llm = MockProvider::new("not json at all");
        let engine = engine(store, llm);
        assert!(engine.extract_entities(&doc).await.is_empty());
        assert!(engine.extract_topics(&doc).await.is_empty());
        assert!(engine.extract_claims(&doc).await.is_empty());
    }
}
