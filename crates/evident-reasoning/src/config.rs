//! Configuration for the reasoning engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reasoning engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Sub-queries kept from a decomposition
    pub max_sub_queries: usize,

    /// Evidence items retrieved per step
    pub evidence_per_step: usize,

    /// Temperature of the decomposition call
    pub decompose_temperature: f32,

    /// Temperature of each step call
    pub step_temperature: f32,

    /// Temperature of the synthesis call
    pub synthesis_temperature: f32,

    /// Temperature of verification and inference calls
    pub verify_temperature: f32,

    /// Support confidence (0-100) above which a step counts as verified
    pub verified_threshold: f64,

    /// Steps below this confidence are flagged
    pub low_confidence: f64,

    /// Upper bound on a single completion call (seconds)
    pub call_timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_sub_queries: 5,
            evidence_per_step: 5,
            decompose_temperature: 0.1,
            step_temperature: 0.2,
            synthesis_temperature: 0.3,
            verify_temperature: 0.1,
            verified_threshold: 70.0,
            low_confidence: 0.5,
            call_timeout_secs: 60,
        }
    }
}

impl ReasoningConfig {
    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sub_queries == 0 {
            return Err("max_sub_queries must be greater than 0".to_string());
        }
        if self.evidence_per_step == 0 {
            return Err("evidence_per_step must be greater than 0".to_string());
        }
        for t in [
            self.decompose_temperature,
            self.step_temperature,
            self.synthesis_temperature,
            self.verify_temperature,
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("temperature {} must be between 0.0 and 2.0", t));
            }
        }
        if !(0.0..=100.0).contains(&self.verified_threshold) {
            return Err("verified_threshold must be between 0 and 100".to_string());
        }
        if !(0.0..=1.0).contains(&self.low_confidence) {
            return Err("low_confidence must be between 0.0 and 1.0".to_string());
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
        assert!(ReasoningConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_temperature() {
        let config = ReasoningConfig {
            step_temperature: 3.0,
            ..ReasoningConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ReasoningConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(ReasoningConfig::from_toml(&toml).unwrap(), config);
    }
}
