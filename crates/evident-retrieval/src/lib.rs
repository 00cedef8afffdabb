//! Evident Retrieval
//!
//! Tiered evidence search for merchant-services questions.
//!
//! # Overview
//!
//! A query moves down the search hierarchy until some tier produces evidence:
//!
//! | Tier | Source | Cached |
//! |------|--------|--------|
//! | **Cache** | Exact or similar earlier query | n/a |
//! | **FAQ** | Curated Q&A entries | yes |
//! | **Document** | Chunk vector search with query expansion and reranking | yes |
//! | **Web** | Online search, gated by the appropriateness policy | no |
//!
//! Tier failures are logged and treated as empty results, so
//! [`Orchestrator::search`] always returns an outcome.
//!
//! # Usage
//!
//! ```no_run
//! use evident_retrieval::{Orchestrator, OutcomeTier};
//! use evident_store::SqliteStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new("evident.db")?);
//! let orchestrator = Orchestrator::new(store);
//!
//! let outcome = orchestrator.search("what is the refund policy?").await;
//! if outcome.tier == OutcomeTier::None {
//!     println!("{}", outcome.reason.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod expansion;
pub mod orchestrator;
pub mod policy;
pub mod reranker;
pub mod scoring;
pub mod sweeper;
pub mod tiers;

pub use cache::{CacheEntry, CacheStats, Lookup, RetrievalCache};
pub use config::{CacheConfig, OrchestratorConfig, RerankerConfig};
pub use expansion::query_variants;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OutcomeTier, SearchOutcome, NO_EVIDENCE_REASON};
pub use policy::{AppropriatenessPolicy, PolicyDecision};
pub use reranker::{RelevanceSignals, Reranker};
pub use sweeper::{CacheSweeper, SweepMetrics};
pub use tiers::{DocumentTier, FaqTier, SearchTier, TierOutcome, WebTier};
