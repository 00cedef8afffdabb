//! Configuration for the answer composer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Answer composer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Role the answering model plays
    pub role: String,

    /// Evidence items placed in the prompt
    pub context_items: usize,

    /// Characters of each evidence snippet placed in the prompt
    pub context_snippet_chars: usize,

    /// Characters of each snippet returned as a source
    pub source_snippet_chars: usize,

    /// Sampling temperature of the answer
    pub temperature: f32,

    /// Token limit of the answer
    pub max_tokens: u32,

    /// Route complex questions through the reasoning engine
    pub reason_complex: bool,

    /// Verify and cite answers when the engines are configured
    pub verify_answers: bool,

    /// Answer cache TTL in seconds
    pub response_cache_ttl_secs: u64,

    /// Maximum cached answers
    pub response_cache_capacity: u64,

    /// Upper bound on the answer call (seconds)
    pub call_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            role: "Sales Agent".to_string(),
            context_items: 5,
            context_snippet_chars: 200,
            source_snippet_chars: 150,
            temperature: 0.7,
            max_tokens: 1000,
            reason_complex: true,
            verify_answers: true,
            response_cache_ttl_secs: 300,
            response_cache_capacity: 1000,
            call_timeout_secs: 60,
        }
    }
}

impl AssistantConfig {
    /// Configuration that skips the reasoning, verification, and citation passes
    pub fn fast() -> Self {
        Self {
            reason_complex: false,
            verify_answers: false,
            ..Self::default()
        }
    }

    /// Answer cache TTL as a Duration
    pub fn response_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.response_cache_ttl_secs)
    }

    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.context_items == 0 {
            return Err("context_items must be greater than 0".to_string());
        }
        if self.context_snippet_chars == 0 || self.source_snippet_chars == 0 {
            return Err("snippet lengths must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
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
        let config = AssistantConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.response_cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_fast_preset_skips_passes() {
        let config = AssistantConfig::fast();
        assert!(!config.reason_complex);
        assert!(!config.verify_answers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_temperature() {
        let config = AssistantConfig {
            temperature: 3.0,
            ..AssistantConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AssistantConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(AssistantConfig::from_toml(&toml).unwrap(), config);
    }
}
