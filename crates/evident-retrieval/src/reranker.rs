//! Multi-signal reranking of document evidence
//!
//! Combines title match, content term frequency, freshness, popularity,
//! context match, and the incoming relevance into one weighted score.

use crate::config::RerankerConfig;
use chrono::{DateTime, Utc};
use evident_domain::{EvidenceItem, EvidenceMetadata};

/// Per-item relevance signals, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceSignals {
    /// Query match against the document name
    pub title: f64,
    /// Query term frequency in the snippet
    pub content: f64,
    /// Age bucket score
    pub freshness: f64,
    /// Views and rating
    pub popularity: f64,
    /// Context term coverage
    pub context: f64,
}

/// Weighted reranker
#[derive(Debug, Clone, Default)]
pub struct Reranker {
    config: RerankerConfig,
}

impl Reranker {
    /// Create a reranker with the given weights
    pub fn new(config: RerankerConfig) -> Self {
        Self { config }
    }

    /// Rerank `items`, replacing each relevance with the combined score
    ///
    /// `context` holds terms from the surrounding conversation; an empty
    /// context scores neutral.
    pub fn rerank(&self, query: &str, items: Vec<EvidenceItem>, context: &[String], now: DateTime<Utc>) -> Vec<EvidenceItem> {
        let original_top = items.first().map(|i| i.source_id.clone());

        let mut reranked: Vec<EvidenceItem> = items
            .iter()
            .map(|item| {
                let signals = self.signals(query, item, context, now);
                item.rescored(self.combine(item.relevance, &signals))
            })
            .collect();
        reranked.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));

        let new_top = reranked.first().map(|i| i.source_id.clone());
        if original_top != new_top {
            tracing::debug!("Reranking changed top result from {:?} to {:?}", original_top, new_top);
        }
        reranked
    }

    /// Compute the relevance signals of one item
    pub fn signals(&self, query: &str, item: &EvidenceItem, context: &[String], now: DateTime<Utc>) -> RelevanceSignals {
        let query = query.trim().to_lowercase();
        RelevanceSignals {
            title: title_match(&item.document_name.to_lowercase(), &query),
            content: content_match(&item.snippet.to_lowercase(), &query),
            freshness: freshness(Some(item.age_days(now))),
            popularity: popularity(&item.metadata),
            context: context_match(&item.snippet.to_lowercase(), context),
        }
    }

    fn combine(&self, original: f64, s: &RelevanceSignals) -> f64 {
        let c = &self.config;
        c.original_weight * original
            + c.title_weight * s.title
            + c.content_weight * s.content
            + c.freshness_weight * s.freshness
            + c.popularity_weight * s.popularity
            + c.context_weight * s.context
    }
}

fn title_match(title: &str, query: &str) -> f64 {
    if title.is_empty() || query.is_empty() {
        return 0.0;
    }
    if title == query {
        return 1.0;
    }
    if title.contains(query) {
        return 0.8;
    }
    let words: Vec<&str> = query.split_whitespace().collect();
    let matched = words.iter().filter(|w| title.contains(*w)).count();
    if matched == words.len() {
        0.6
    } else {
        matched as f64 / words.len() as f64 * 0.5
    }
}

fn content_match(content: &str, query: &str) -> f64 {
    let content_words: Vec<&str> = content.split_whitespace().collect();
    if content_words.is_empty() {
        return 0.0;
    }
    let matches: usize = query
        .split_whitespace()
        .map(|q| content_words.iter().filter(|w| w.contains(q)).count())
        .sum();
    (matches as f64 / (content_words.len() as f64).sqrt()).min(1.0)
}

/// Freshness bucket for a source age in days; unknown age is neutral
pub fn freshness(age_days: Option<i64>) -> f64 {
    match age_days {
        None => 0.5,
        Some(d) if d < 7 => 1.0,
        Some(d) if d < 30 => 0.8,
        Some(d) if d < 90 => 0.6,
        Some(d) if d < 365 => 0.4,
        Some(_) => 0.2,
    }
}

fn popularity(metadata: &EvidenceMetadata) -> f64 {
    let mut score: f64 = 0.5;
    score += match metadata.views {
        v if v > 100 => 0.3,
        v if v > 50 => 0.2,
        v if v > 10 => 0.1,
        _ => 0.0,
    };
    if metadata.rating.is_some_and(|r| r > 4.0) {
        score += 0.2;
    }
    score.min(1.0)
}

fn context_match(content: &str, context: &[String]) -> f64 {
    if context.is_empty() {
        return 0.5;
    }
    let matches = context.iter().filter(|t| content.contains(&t.to_lowercase())).count();
    matches as f64 / context.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use evident_domain::EvidenceTier;

    fn item(name: &str, snippet: &str, relevance: f64) -> EvidenceItem {
        EvidenceItem::new(name, name, snippet, relevance, EvidenceTier::Document)
    }

    #[test]
    fn test_title_match_levels() {
        assert_eq!(title_match("refund policy", "refund policy"), 1.0);
        assert_eq!(title_match("2024 refund policy", "refund policy"), 0.8);
        assert_eq!(title_match("policy on refund", "refund policy"), 0.6);
        assert_eq!(title_match("refund guide", "refund policy"), 0.25);
        assert_eq!(title_match("", "refund policy"), 0.0);
    }

    #[test]
    fn test_freshness_buckets() {
        assert_eq!(freshness(None), 0.5);
        assert_eq!(freshness(Some(3)), 1.0);
        assert_eq!(freshness(Some(20)), 0.8);
        assert_eq!(freshness(Some(60)), 0.6);
        assert_eq!(freshness(Some(200)), 0.4);
        assert_eq!(freshness(Some(400)), 0.2);
    }

    #[test]
    fn test_popularity() {
        let mut meta = EvidenceMetadata::default();
        assert_eq!(popularity(&meta), 0.5);
        meta.views = 120;
        meta.rating = Some(4.5);
        assert_eq!(popularity(&meta), 1.0);
    }

    #[test]
    fn test_content_match_is_length_normalized() {
        let score = content_match("fees fees fees fees", "fees");
        assert_eq!(score, 1.0);
        let long = format!("fees {}", "word ".repeat(99));
        assert!((content_match(&long, "fees") - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_rerank_promotes_title_match() {
        let now = Utc::now();
        let reranker = Reranker::default();
        let a = item("Equipment List", "terminals and readers", 0.6);
        let b = item("Refund Policy", "refund policy: 30 days", 0.5);

        let reranked = reranker.rerank("refund policy", vec![a, b], &[], now);
        assert_eq!(reranked[0].document_name, "Refund Policy");
        assert!(reranked.iter().all(|i| (0.0..=1.0).contains(&i.relevance)));
    }

    #[test]
    fn test_rerank_prefers_fresh_sources() {
        let now = Utc::now();
        let reranker = Reranker::default();
        let fresh = item("Rates A", "rates", 0.5);
        let stale = item("Rates B", "rates", 0.5).with_last_verified(now - Duration::days(500));

        let reranked = reranker.rerank("rates", vec![stale, fresh], &[], now);
        assert_eq!(reranked[0].document_name, "Rates A");
    }
}
