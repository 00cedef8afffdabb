//! Deterministic source reliability
//!
//! Reliability depends only on what a source is (type, age, size) plus any
//! feedback adjustments recorded against it. No completion calls are made,
//! so the same source always scores the same at the same instant.

use chrono::{DateTime, Utc};
use evident_domain::{unit, Document, DocumentType, EvidenceItem, EvidenceStore, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

const BASE: f64 = 0.5;
const RECENT_DAYS: i64 = 180;
const STALE_DAYS: i64 = 720;
const RECENT_BONUS: f64 = 0.15;
const STALE_PENALTY: f64 = 0.1;
const COMPLETE_CHARS: usize = 1000;
const COMPLETE_BONUS: f64 = 0.05;
const FLOOR: f64 = 0.1;

fn type_bonus(document_type: DocumentType) -> f64 {
    match document_type {
        DocumentType::Contract => 0.3,
        DocumentType::Policy => 0.25,
        DocumentType::Manual => 0.2,
        DocumentType::Statement => 0.15,
        DocumentType::Guide => 0.1,
        DocumentType::Other => 0.05,
    }
}

/// What reliability is computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliabilitySignals {
    /// Category of the source
    pub document_type: DocumentType,
    /// Age in whole days
    pub age_days: i64,
    /// Length of the source text
    pub content_chars: usize,
}

impl ReliabilitySignals {
    /// Signals of a stored document
    pub fn from_document(document: &Document, now: DateTime<Utc>) -> Self {
        Self {
            document_type: document.document_type,
            age_days: (now - document.created_at).num_days(),
            content_chars: document.content.chars().count(),
        }
    }

    /// Signals of an evidence item whose document is not available
    pub fn from_item(item: &EvidenceItem, now: DateTime<Utc>) -> Self {
        Self {
            document_type: item.document_type,
            age_days: item.age_days(now),
            content_chars: item.snippet.chars().count(),
        }
    }
}

/// Reliability in [0.1, 1] before feedback adjustments
pub fn base_reliability(signals: &ReliabilitySignals) -> f64 {
    let mut score = BASE + type_bonus(signals.document_type);

    if signals.age_days < RECENT_DAYS {
        score += RECENT_BONUS;
    } else if signals.age_days > STALE_DAYS {
        score -= STALE_PENALTY;
    }

    if signals.content_chars > COMPLETE_CHARS {
        score += COMPLETE_BONUS;
    }

    score.clamp(FLOOR, 1.0)
}

/// Feedback about a cited source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFeedback {
    /// The source was right
    Accurate,
    /// The source was wrong
    Inaccurate,
    /// The source was right once but is stale
    Outdated,
}

impl SourceFeedback {
    fn delta(&self) -> f64 {
        match self {
            SourceFeedback::Accurate => 0.05,
            SourceFeedback::Inaccurate => -0.1,
            SourceFeedback::Outdated => -0.05,
        }
    }

    /// Parse a lowercase label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accurate" => Some(SourceFeedback::Accurate),
            "inaccurate" => Some(SourceFeedback::Inaccurate),
            "outdated" => Some(SourceFeedback::Outdated),
            _ => None,
        }
    }
}

/// Reliability scores with per-source feedback adjustments
///
/// When a store is attached, documents are loaded so that age and size come
/// from the full document instead of the retrieved snippet.
pub struct ReliabilityModel {
    store: Option<Arc<dyn EvidenceStore>>,
    adjustments: Mutex<HashMap<String, f64>>,
}

impl Default for ReliabilityModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReliabilityModel {
    /// Model scoring evidence items from their own fields
    pub fn new() -> Self {
        Self {
            store: None,
            adjustments: Mutex::new(HashMap::new()),
        }
    }

    /// Model that loads documents from `store` when scoring
    pub fn with_store(store: Arc<dyn EvidenceStore>) -> Self {
        Self {
            store: Some(store),
            adjustments: Mutex::new(HashMap::new()),
        }
    }

    fn adjustment(&self, source_id: &str) -> f64 {
        self.adjustments
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(source_id)
            .copied()
            .unwrap_or(0.0)
    }

    /// Reliability of one evidence item at `now`
    pub async fn assess(&self, item: &EvidenceItem, now: DateTime<Utc>) -> PipelineResult<f64> {
        let signals = match (&self.store, item.document_id) {
            (Some(store), Some(id)) => match store.get_document(id).await? {
                Some(document) => ReliabilitySignals::from_document(&document, now),
                None => ReliabilitySignals::from_item(item, now),
            },
            _ => ReliabilitySignals::from_item(item, now),
        };
        let score = base_reliability(&signals) + self.adjustment(&item.source_id);
        Ok(score.clamp(FLOOR, 1.0))
    }

    /// Record feedback against a source, returning its new adjustment
    pub fn update_source_reliability(&self, source_id: &str, feedback: SourceFeedback) -> f64 {
        let mut adjustments = self.adjustments.lock().unwrap_or_else(|p| p.into_inner());
        let entry = adjustments.entry(source_id.to_string()).or_insert(0.0);
        // Adjustments alone can move a source across the whole range
        *entry = (*entry + feedback.delta()).clamp(-(1.0 - FLOOR), 1.0 - FLOOR);
        debug!("Reliability adjustment for {} is now {:+.2}", source_id, *entry);
        *entry
    }

    /// Reliability of an item after adjustments, without a store lookup
    pub fn assess_item(&self, item: &EvidenceItem, now: DateTime<Utc>) -> f64 {
        let score = base_reliability(&ReliabilitySignals::from_item(item, now)) + self.adjustment(&item.source_id);
        unit(score).max(FLOOR)
    }
}
