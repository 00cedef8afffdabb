//! Configuration for the document relationship engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits and prompt sizes for document graph analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Characters of each document shown when judging a relationship
    pub relationship_preview_chars: usize,

    /// Characters of each document shown when looking for conflicts
    pub conflict_preview_chars: usize,

    /// Characters shown for entity and claim extraction
    pub extraction_preview_chars: usize,

    /// Characters shown for topic extraction
    pub topic_preview_chars: usize,

    /// Folder neighbours compared against a document
    pub max_folder_documents: usize,

    /// Documents considered in one conflict scan
    pub max_conflict_documents: usize,

    /// Relationships at or below this confidence (0-100) are dropped
    pub min_relationship_confidence: u8,

    /// Sampling temperature for every analysis call
    pub temperature: f32,

    /// Upper bound on a single analysis call (seconds)
    pub call_timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            relationship_preview_chars: 500,
            conflict_preview_chars: 1000,
            extraction_preview_chars: 2000,
            topic_preview_chars: 1500,
            max_folder_documents: 10,
            max_conflict_documents: 20,
            min_relationship_confidence: 60,
            temperature: 0.1,
            call_timeout_secs: 60,
        }
    }
}

impl GraphConfig {
    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.relationship_preview_chars == 0 || self.conflict_preview_chars == 0 {
            return Err("preview sizes must be greater than 0".to_string());
        }
        if self.extraction_preview_chars == 0 || self.topic_preview_chars == 0 {
            return Err("extraction preview sizes must be greater than 0".to_string());
        }
        if self.max_conflict_documents < 2 {
            return Err("max_conflict_documents must be at least 2".to_string());
        }
        if self.min_relationship_confidence > 100 {
            return Err("min_relationship_confidence must be at most 100".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GraphConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_conflict_cap() {
        let config = GraphConfig {
            max_conflict_documents: 1,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GraphConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(GraphConfig::from_toml(&toml).unwrap(), config);
    }
}
