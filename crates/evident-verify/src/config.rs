//! Configuration for fact verification and citations

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fact verifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Evidence candidates retrieved per claim
    pub max_evidence: usize,

    /// Contradictions above this confidence decide the verdict
    pub contradiction_threshold: f64,

    /// Evidence below this relevance counts as weak
    pub low_relevance: f64,

    /// Characters of evidence shown to the classifier
    pub evidence_chars: usize,

    /// Temperature of classification calls
    pub temperature: f32,

    /// Upper bound on a single completion call (seconds)
    pub call_timeout_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_evidence: 10,
            contradiction_threshold: 0.8,
            low_relevance: 0.5,
            evidence_chars: 1500,
            temperature: 0.1,
            call_timeout_secs: 60,
        }
    }
}

impl VerificationConfig {
    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_evidence == 0 {
            return Err("max_evidence must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.contradiction_threshold) {
            return Err("contradiction_threshold must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.low_relevance) {
            return Err("low_relevance must be between 0.0 and 1.0".to_string());
        }
        if self.evidence_chars == 0 {
            return Err("evidence_chars must be greater than 0".to_string());
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

/// Citation engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Sources above this reliability are primary
    pub primary_reliability: f64,

    /// Primary sources kept
    pub max_primary: usize,

    /// Secondary sources kept
    pub max_secondary: usize,

    /// Sources below this reliability count toward the low-reliability warning
    pub low_reliability: f64,

    /// Sources last verified more than this many days ago are flagged
    pub outdated_after_days: i64,

    /// Citations below this confidence are flagged for manual review
    pub review_below: f64,

    /// Characters of each source shown to snippet extraction
    pub extraction_chars: usize,

    /// Temperature of snippet extraction
    pub temperature: f32,

    /// Upper bound on a single completion call (seconds)
    pub call_timeout_secs: u64,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            primary_reliability: 0.7,
            max_primary: 3,
            max_secondary: 2,
            low_reliability: 0.4,
            outdated_after_days: 365,
            review_below: 0.6,
            extraction_chars: 1500,
            temperature: 0.1,
            call_timeout_secs: 60,
        }
    }
}

impl CitationConfig {
    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.primary_reliability) {
            return Err("primary_reliability must be between 0.0 and 1.0".to_string());
        }
        if self.max_primary == 0 {
            return Err("max_primary must be greater than 0".to_string());
        }
        if self.outdated_after_days <= 0 {
            return Err("outdated_after_days must be positive".to_string());
        }
        if self.extraction_chars == 0 {
            return Err("extraction_chars must be greater than 0".to_string());
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
        assert!(VerificationConfig::default().validate().is_ok());
        assert!(CitationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        let config = VerificationConfig {
            contradiction_threshold: 1.5,
            ..VerificationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CitationConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(CitationConfig::from_toml(&toml).unwrap(), config);

        let config = VerificationConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(VerificationConfig::from_toml(&toml).unwrap(), config);
    }
}
