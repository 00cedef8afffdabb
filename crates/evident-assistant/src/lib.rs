//! Evident Assistant
//!
//! Turns a user question into the structured [`AnswerResponse`] every caller
//! receives: answer text, sources, reasoning, optional fact verification and
//! citation analysis, confidence metrics, and follow-up suggestions.
//!
//! # Flow
//!
//! 1. Answers are cached per `user:message` for five minutes.
//! 2. The orchestrator searches the cache, FAQ, document, and web tiers.
//! 3. Complex questions go to the reasoning engine; the rest are answered
//!    directly from the top five evidence items.
//! 4. The answer is verified and cited when those engines are configured.
//! 5. The user's learning profile adjusts style and confidence.
//!
//! # Example
//!
//! ```no_run
//! use evident_assistant::Assistant;
//! use evident_llm::MockProvider;
//! use evident_retrieval::Orchestrator;
//! use evident_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let store = Arc::new(MemoryStore::new());
//! let assistant = Assistant::builder(
//!     Arc::new(Orchestrator::new(store)),
//!     Arc::new(MockProvider::new("Refunds are issued within 30 days.")),
//! )
//! .build();
//!
//! let response = assistant.answer("user-1", "What is the refund policy?", &[]).await;
//! println!("{}", response.message);
//! # }
//! ```
//!
//! [`AnswerResponse`]: evident_domain::AnswerResponse

#![warn(missing_docs)]

pub mod composer;
pub mod config;
pub mod context;

pub use composer::{Assistant, AssistantBuilder, FAILSAFE_MESSAGE};
pub use config::AssistantConfig;
pub use context::{document_context, source_refs, suggestions, NO_DOCUMENTS};
