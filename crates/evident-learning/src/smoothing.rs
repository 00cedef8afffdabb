//! Pure profile updates
//!
//! Scores move by exponential smoothing so a single rating never swings a
//! profile far from its history.

use chrono::{DateTime, Utc};
use evident_domain::{unit, FeedbackKind, FeedbackRecord, LearningProfile};

const ACCURACY_WEIGHT: f64 = 0.1;
const SATISFACTION_WEIGHT: f64 = 0.15;
const TARGET_SUCCESS_RATE: f64 = 0.7;
const ADJUSTMENT_SCALE: f64 = 0.1;
const MAX_ADJUSTMENT: f64 = 0.2;

/// Accuracy signal of one rating
pub fn accuracy_score(kind: FeedbackKind) -> f64 {
    match kind {
        FeedbackKind::Positive => 1.0,
        FeedbackKind::Neutral => 0.5,
        FeedbackKind::Negative => 0.0,
    }
}

/// Satisfaction signal of one rating
pub fn satisfaction_score(kind: FeedbackKind) -> f64 {
    match kind {
        FeedbackKind::Positive => 1.0,
        FeedbackKind::Neutral => 0.6,
        FeedbackKind::Negative => 0.2,
    }
}

/// `accuracy × 0.9 + score × 0.1`
pub fn smooth_accuracy(current: f64, kind: FeedbackKind) -> f64 {
    unit(current * (1.0 - ACCURACY_WEIGHT) + accuracy_score(kind) * ACCURACY_WEIGHT)
}

/// `satisfaction × 0.85 + score × 0.15`
pub fn smooth_satisfaction(current: f64, kind: FeedbackKind) -> f64 {
    unit(current * (1.0 - SATISFACTION_WEIGHT) + satisfaction_score(kind) * SATISFACTION_WEIGHT)
}

/// Positive fraction of `records`, 0.7 when there are none
pub fn success_rate(records: &[FeedbackRecord]) -> f64 {
    if records.is_empty() {
        return TARGET_SUCCESS_RATE;
    }
    let positive = records.iter().filter(|r| r.feedback == FeedbackKind::Positive).count();
    positive as f64 / records.len() as f64
}

/// Confidence adjustment in [-0.2, 0.2] for a success rate
pub fn confidence_adjustment(success_rate: f64) -> f64 {
    ((success_rate - TARGET_SUCCESS_RATE) * ADJUSTMENT_SCALE).clamp(-MAX_ADJUSTMENT, MAX_ADJUSTMENT)
}

/// Fold one rating into a profile
///
/// Patterns, style, and template are left untouched; they come from the
/// analysis call, not from the rating itself.
pub fn apply_feedback(
    profile: &LearningProfile,
    kind: FeedbackKind,
    success_rate: f64,
    now: DateTime<Utc>,
) -> LearningProfile {
    LearningProfile {
        accuracy: smooth_accuracy(profile.accuracy, kind),
        satisfaction_score: smooth_satisfaction(profile.satisfaction_score, kind),
        confidence_adjustment: confidence_adjustment(success_rate),
        total_interactions: profile.total_interactions + 1,
        updated_at: now,
        ..profile.clone()
    }
}
