//! Configuration for retrieval
//!
//! Tier thresholds, cache sizing, and reranker weights.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retrieval cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live (seconds)
    pub ttl_secs: u64,

    /// Maximum cached queries
    pub max_entries: u64,

    /// Minimum Jaccard similarity for an approximate key hit
    pub similarity_threshold: f64,

    /// How often the sweeper prunes expired entries (seconds)
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 1000,
            similarity_threshold: 0.85,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    /// Entry TTL as a Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweep interval as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs == 0 {
            return Err("cache ttl_secs must be greater than 0".to_string());
        }
        if self.max_entries == 0 {
            return Err("cache max_entries must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) || self.similarity_threshold == 0.0 {
            return Err(format!(
                "cache similarity_threshold must be in (0.0, 1.0], got {}",
                self.similarity_threshold
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err("cache sweep_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Weights of the reranking signals
///
/// Weights should sum to 1.0 so final scores stay in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Query match against the document name
    pub title_weight: f64,
    /// Query term frequency in the snippet
    pub content_weight: f64,
    /// Age of the source
    pub freshness_weight: f64,
    /// Views and rating
    pub popularity_weight: f64,
    /// Match against conversation context terms
    pub context_weight: f64,
    /// Incoming relevance score
    pub original_weight: f64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            title_weight: 0.25,
            content_weight: 0.20,
            freshness_weight: 0.10,
            popularity_weight: 0.10,
            context_weight: 0.15,
            original_weight: 0.20,
        }
    }
}

impl RerankerConfig {
    fn weights(&self) -> [f64; 6] {
        [
            self.title_weight,
            self.content_weight,
            self.freshness_weight,
            self.popularity_weight,
            self.context_weight,
            self.original_weight,
        ]
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let weights = self.weights();
        if weights.iter().any(|w| *w < 0.0) {
            return Err("reranker weights must be non-negative".to_string());
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(format!("reranker weights must sum to 1.0, got {:.3}", total));
        }
        Ok(())
    }
}

/// Search hierarchy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Minimum score for a curated Q&A entry to count as a hit
    pub faq_threshold: f64,

    /// Maximum evidence items returned by the document tier
    pub max_document_results: usize,

    /// Nearest neighbours requested per query variant
    pub vector_k: usize,

    /// Maximum query expansions (excluding the original query)
    pub max_query_variants: usize,

    /// Whether the web tier may run at all
    #[serde(default = "default_web_enabled")]
    pub web_enabled: bool,

    /// Retrieval cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Reranker weights
    #[serde(default)]
    pub reranker: RerankerConfig,
}

fn default_web_enabled() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            faq_threshold: 0.3,
            max_document_results: 8,
            vector_k: 10,
            max_query_variants: 15,
            web_enabled: true,
            cache: CacheConfig::default(),
            reranker: RerankerConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Strict preset: higher FAQ bar, fewer results, no web fallback
    pub fn strict() -> Self {
        Self {
            faq_threshold: 0.5,
            max_document_results: 5,
            web_enabled: false,
            ..Self::default()
        }
    }

    /// Lenient preset: lower FAQ bar and more document results
    pub fn lenient() -> Self {
        Self {
            faq_threshold: 0.2,
            max_document_results: 12,
            vector_k: 15,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.faq_threshold) {
            return Err(format!("faq_threshold must be in [0.0, 1.0], got {}", self.faq_threshold));
        }
        if self.max_document_results == 0 {
            return Err("max_document_results must be greater than 0".to_string());
        }
        if self.vector_k == 0 {
            return Err("vector_k must be greater than 0".to_string());
        }
        self.cache.validate()?;
        self.reranker.validate()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(OrchestratorConfig::strict().validate().is_ok());
        assert!(OrchestratorConfig::lenient().validate().is_ok());
        assert!(!OrchestratorConfig::strict().web_enabled);
    }

    #[test]
    fn test_reranker_weights_must_sum_to_one() {
        let mut config = OrchestratorConfig::default();
        config.reranker.title_weight = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_similarity_threshold() {
        let mut config = CacheConfig::default();
        config.similarity_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = OrchestratorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = OrchestratorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_durations() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(300));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }
}
