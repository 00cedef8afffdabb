//! Evident Multi-Step Reasoning
//!
//! Complex questions are decomposed into at most five dependent sub-queries,
//! each answered against retrieved documents, verified, and synthesized into
//! one conclusion with an audit trail.
//!
//! # Overview
//!
//! - **Decomposition**: one completion call; degrades to a single step
//! - **Steps**: retrieval, a step completion, then a support check against
//!   the same evidence. A failed step is kept with confidence 0.3
//! - **Chain checks**: low-confidence and conflicted steps are flagged;
//!   overall confidence is the step mean plus a verification bonus
//! - **Inference**: deductive, inductive, or abductive conclusions from premises
//!
//! `reason` never fails. When the run cannot proceed it returns the
//! single-step failsafe chain.
//!
//! # Example Usage
//!
//! ```no_run
//! use evident_reasoning::{ReasoningConfig, ReasoningEngine};
//! use evident_retrieval::Orchestrator;
//! use evident_llm::MockProvider;
//! use evident_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let orchestrator = Arc::new(Orchestrator::new(Arc::new(MemoryStore::new())));
//! let engine = ReasoningEngine::new(orchestrator, Arc::new(MockProvider::new("{}")), ReasoningConfig::default());
//! let chain = engine.reason("Why are card-not-present fees higher than swipe fees?").await;
//! for line in &chain.audit_trail {
//!     println!("{}", line);
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod chain;
pub mod config;
pub mod engine;
pub mod prompt;

pub use chain::{audit_trail, chain_issues, cited_sources, overall_confidence};
pub use config::ReasoningConfig;
pub use engine::{failsafe_chain, ReasoningEngine, FAILSAFE_CONCLUSION};
