//! Evident Verification
//!
//! Fact verification, deterministic source reliability, and citations with
//! confidence intervals.
//!
//! # Overview
//!
//! - [`FactVerifier`] retrieves up to ten documents for a claim, classifies
//!   each for support and contradiction, and resolves a [`ClaimStatus`].
//!   Every verification is written to the audit log.
//! - [`ReliabilityModel`] scores sources by type, age, and size, plus any
//!   feedback adjustments. It never calls a model.
//! - [`CitationEngine`] ranks sources by `reliability × relevance`, splits
//!   them into primary (reliability above 0.7) and secondary sources, and
//!   attaches intervals, evidence strength, and warnings.
//!
//! Neither engine returns an error: failures produce the failsafe verdict or
//! the failsafe citation.
//!
//! [`ClaimStatus`]: evident_domain::ClaimStatus

#![warn(missing_docs)]

pub mod citation;
pub mod config;
pub mod fact;
pub mod reliability;

pub use citation::{evidence_strength, margin_of_error, CitationEngine};
pub use config::{CitationConfig, VerificationConfig};
pub use fact::{consistency_alerts, resolve_status, FactVerifier};
pub use reliability::{base_reliability, ReliabilityModel, ReliabilitySignals, SourceFeedback};
