//! Retrieval cache
//!
//! Exact lookups go through a `moka` TTL cache keyed by normalized query.
//! Approximate lookups use an inverted token index over cached keys and
//! accept the best key with Jaccard similarity at or above the threshold.
//!
//! # Examples
//!
//! ```
//! use evident_retrieval::{CacheConfig, RetrievalCache};
//! use evident_domain::{EvidenceItem, EvidenceTier};
//!
//! let cache = RetrievalCache::new(CacheConfig::default());
//! let item = EvidenceItem::new("d1", "Fee Schedule", "2.5% per swipe", 0.8, EvidenceTier::Document);
//! cache.insert("card present fees for retail merchants", vec![item]);
//!
//! assert!(cache.get("Card present fees for retail merchants").is_some());
//! assert!(cache.get("card present fees").is_none());
//! ```

use crate::config::CacheConfig;
use chrono::{DateTime, Utc};
use evident_domain::{normalize_query, EvidenceItem, PipelineResult};
use moka::sync::Cache;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// A cached retrieval result
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Normalized query the entry was stored under
    pub key: String,
    /// Cached evidence, in ranked order
    pub evidence: Vec<EvidenceItem>,
    /// Source ids of the evidence
    pub document_ids: Vec<String>,
    /// Best relevance among the evidence
    pub score: f64,
    /// Free-form annotations
    pub metadata: HashMap<String, String>,
    /// When the entry was stored
    pub inserted_at: DateTime<Utc>,
}

/// Result of [`RetrievalCache::get_or_compute`]
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Served from the cache
    Hit(CacheEntry),
    /// Freshly computed (and cached when non-empty)
    Computed(Vec<EvidenceItem>),
}

/// Hit/miss counters and size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Exact and approximate hits
    pub hits: u64,
    /// Approximate hits only
    pub approximate_hits: u64,
    /// Misses
    pub misses: u64,
    /// Keys currently indexed
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct TokenIndex {
    postings: HashMap<String, HashSet<String>>,
    keys: HashMap<String, HashSet<String>>,
}

impl TokenIndex {
    fn insert(&mut self, key: &str) {
        let tokens = tokens(key);
        for token in &tokens {
            self.postings.entry(token.clone()).or_default().insert(key.to_string());
        }
        self.keys.insert(key.to_string(), tokens);
    }

    fn remove(&mut self, key: &str) {
        if let Some(tokens) = self.keys.remove(key) {
            for token in tokens {
                if let Some(keys) = self.postings.get_mut(&token) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.postings.remove(&token);
                    }
                }
            }
        }
    }

    /// Best key by Jaccard similarity, if any reaches `threshold`
    fn nearest(&self, query: &str, threshold: f64) -> Option<(String, f64)> {
        let query_tokens = tokens(query);
        let candidates: HashSet<&String> = query_tokens
            .iter()
            .filter_map(|t| self.postings.get(t))
            .flatten()
            .collect();

        candidates
            .into_iter()
            .filter_map(|key| {
                let key_tokens = self.keys.get(key)?;
                let similarity = jaccard(&query_tokens, key_tokens);
                (similarity >= threshold).then(|| (key.clone(), similarity))
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Jaccard similarity of two token sets
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// TTL cache with approximate key matching
pub struct RetrievalCache {
    entries: Cache<String, CacheEntry>,
    index: Mutex<TokenIndex>,
    threshold: f64,
    hits: AtomicU64,
    approximate_hits: AtomicU64,
    misses: AtomicU64,
}

impl RetrievalCache {
    /// Create a cache from configuration
    pub fn new(config: CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl())
            .build();

        Self {
            entries,
            index: Mutex::new(TokenIndex::default()),
            threshold: config.similarity_threshold,
            hits: AtomicU64::new(0),
            approximate_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn index(&self) -> MutexGuard<'_, TokenIndex> {
        self.index.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Look up a query, exactly first and then approximately
    pub fn get(&self, query: &str) -> Option<CacheEntry> {
        let key = normalize_query(query);
        if key.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Retrieval cache hit for '{}'", key);
            return Some(entry);
        }

        let mut index = self.index();
        while let Some((candidate, similarity)) = index.nearest(&key, self.threshold) {
            match self.entries.get(&candidate) {
                Some(entry) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    self.approximate_hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        "Retrieval cache similarity hit: '{}' ~ '{}' ({:.2})",
                        key,
                        candidate,
                        similarity
                    );
                    return Some(entry);
                }
                // Expired or evicted; drop it and try the next best key
                None => index.remove(&candidate),
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store evidence under a query (last write wins)
    pub fn insert(&self, query: &str, evidence: Vec<EvidenceItem>) {
        self.insert_with_metadata(query, evidence, HashMap::new());
    }

    /// Store evidence with annotations
    pub fn insert_with_metadata(&self, query: &str, evidence: Vec<EvidenceItem>, metadata: HashMap<String, String>) {
        let key = normalize_query(query);
        if key.is_empty() {
            return;
        }
        let entry = CacheEntry {
            key: key.clone(),
            document_ids: evidence.iter().map(|e| e.source_id.clone()).collect(),
            score: evidence.iter().map(|e| e.relevance).fold(0.0, f64::max),
            evidence,
            metadata,
            inserted_at: Utc::now(),
        };
        self.entries.insert(key.clone(), entry);
        self.index().insert(&key);
    }

    /// Return the cached evidence for `query`, or compute and cache it
    ///
    /// Empty results and errors are not cached.
    pub async fn get_or_compute<F, Fut>(&self, query: &str, compute: F) -> PipelineResult<Lookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PipelineResult<Vec<EvidenceItem>>>,
    {
        if let Some(entry) = self.get(query) {
            return Ok(Lookup::Hit(entry));
        }
        let evidence = compute().await?;
        if !evidence.is_empty() {
            self.insert(query, evidence.clone());
        }
        Ok(Lookup::Computed(evidence))
    }

    /// Drop expired entries from the store and the token index
    ///
    /// Returns the number of keys pruned from the index.
    pub fn invalidate_expired(&self) -> usize {
        self.entries.run_pending_tasks();
        let mut index = self.index();
        let stale: Vec<String> = index
            .keys
            .keys()
            .filter(|k| !self.entries.contains_key(k.as_str()))
            .cloned()
            .collect();
        for key in &stale {
            index.remove(key);
        }
        stale.len()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.invalidate_all();
        *self.index() = TokenIndex::default();
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            approximate_hits: self.approximate_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.index().keys.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_domain::EvidenceTier;
    use std::time::Duration;

    fn evidence(id: &str) -> Vec<EvidenceItem> {
        vec![EvidenceItem::new(id, "Doc", "snippet", 0.7, EvidenceTier::Document)]
    }

    #[test]
    fn test_exact_hit_after_normalization() {
        let cache = RetrievalCache::new(CacheConfig::default());
        cache.insert("Refund Policy", evidence("d1"));

        let entry = cache.get("  refund   POLICY ").unwrap();
        assert_eq!(entry.key, "refund policy");
        assert_eq!(entry.document_ids, vec!["d1".to_string()]);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_similarity_hit_above_threshold() {
        let cache = RetrievalCache::new(CacheConfig::default());
        let key = "what are the card present processing fees for retail merchants in texas";
        cache.insert(key, evidence("d1"));

        // 12 of 13 tokens shared
        let near = "what are the card present processing fees for retail merchants in texas today";
        assert!(cache.get(near).is_some());
        assert_eq!(cache.stats().approximate_hits, 1);

        assert!(cache.get("card present fees").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_jaccard() {
        let a = tokens("a b c d");
        let b = tokens("a b c e");
        assert!((jaccard(&a, &b) - 0.6).abs() < 1e-9);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn test_entries_expire() {
        let cache = RetrievalCache::new(CacheConfig {
            ttl_secs: 1,
            ..CacheConfig::default()
        });
        cache.insert("refund policy", evidence("d1"));
        std::thread::sleep(Duration::from_millis(1100));

        assert_eq!(cache.invalidate_expired(), 1);
        assert_eq!(cache.stats().entries, 0);
        assert!(cache.get("refund policy").is_none());
    }

    #[tokio::test]
    async fn test_get_or_compute_caches_non_empty() {
        let cache = RetrievalCache::new(CacheConfig::default());

        let first = cache
            .get_or_compute("chargeback timeline", || async { Ok(evidence("d9")) })
            .await
            .unwrap();
        assert!(matches!(first, Lookup::Computed(ref items) if items.len() == 1));

        let second = cache
            .get_or_compute("chargeback timeline", || async { Ok(Vec::new()) })
            .await
            .unwrap();
        assert!(matches!(second, Lookup::Hit(ref entry) if entry.document_ids == vec!["d9".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_results_not_cached() {
        let cache = RetrievalCache::new(CacheConfig::default());
        cache.get_or_compute("nothing here", || async { Ok(Vec::new()) }).await.unwrap();
        assert!(cache.get("nothing here").is_none());
    }

    mod prop {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_jaccard_bounded_and_symmetric(a in "[a-d ]{0,20}", b in "[a-d ]{0,20}") {
                let (ta, tb) = (tokens(&a), tokens(&b));
                let forward = jaccard(&ta, &tb);
                prop_assert!((0.0..=1.0).contains(&forward));
                prop_assert_eq!(forward, jaccard(&tb, &ta));
                prop_assert_eq!(jaccard(&ta, &ta), 1.0);
            }
        }
    }
}
