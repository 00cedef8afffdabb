//! Evident Learning
//!
//! Folds user feedback into per-user learning profiles and proposes
//! system-wide improvements for admin review.
//!
//! Accuracy and satisfaction move by exponential smoothing (see
//! [`smoothing`]); the completion client only contributes pattern analysis,
//! optional prompt templates, and improvement descriptions. Improvements are
//! written to the audit sink as pending review and never applied
//! automatically.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod smoothing;

pub use config::LearningConfig;
pub use engine::{FeedbackOutcome, LearningLoop, LearningMetrics};
pub use smoothing::{apply_feedback, confidence_adjustment, success_rate};
