//! Evident Document Graph
//!
//! Relationship, conflict, and structure analysis across uploaded documents.
//!
//! # Overview
//!
//! - **Relationships**: a document is compared with up to ten neighbours in
//!   its folder; only confident relationships are kept
//! - **Conflicts**: every unordered pair of up to twenty documents is checked
//!   once for factual, numerical, procedural, or policy disagreement
//! - **Extraction**: entities, topics, and factual claims of one document
//! - **Context**: all of the above for one document
//!
//! Every analysis is one completion call parsed into a typed struct. A failed
//! call drops that pair or returns an empty list; it never aborts the scan.
//!
//! # Example Usage
//!
//! ```no_run
//! use evident_graph::{GraphConfig, GraphEngine};
//! use evident_llm::MockProvider;
//! use evident_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example(ids: Vec<evident_domain::DocumentId>) {
//! let engine = GraphEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MockProvider::new(r#"{"hasConflict": false}"#)),
//!     GraphConfig::default(),
//! );
//! for conflict in engine.detect_conflicts(&ids).await {
//!     println!("{:?}: {}", conflict.severity, conflict.description);
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod prompt;

pub use config::GraphConfig;
pub use engine::{DocumentContext, ExtractedClaim, GraphEngine};
pub use prompt::PromptBuilder;
