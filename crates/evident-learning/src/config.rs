//! Configuration for the learning loop

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Learning loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Days of history used for pattern analysis
    pub analysis_window_days: i64,

    /// Records loaded for pattern analysis
    pub max_analysis_records: usize,

    /// Days within which repeated negative feedback proposes an improvement
    pub improvement_window_days: i64,

    /// Negative records needed to propose an improvement
    pub improvement_min_negatives: usize,

    /// Generate a personalized prompt template after each update
    pub generate_prompt_templates: bool,

    /// Temperature of the pattern analysis call
    pub analysis_temperature: f32,

    /// Temperature of the template and improvement calls
    pub template_temperature: f32,

    /// Upper bound on a single completion call (seconds)
    pub call_timeout_secs: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            analysis_window_days: 30,
            max_analysis_records: 50,
            improvement_window_days: 7,
            improvement_min_negatives: 3,
            generate_prompt_templates: false,
            analysis_temperature: 0.2,
            template_temperature: 0.3,
            call_timeout_secs: 60,
        }
    }
}

impl LearningConfig {
    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Pattern analysis window
    pub fn analysis_window(&self) -> ChronoDuration {
        ChronoDuration::days(self.analysis_window_days)
    }

    /// Improvement detection window
    pub fn improvement_window(&self) -> ChronoDuration {
        ChronoDuration::days(self.improvement_window_days)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.analysis_window_days <= 0 || self.improvement_window_days <= 0 {
            return Err("windows must be positive".to_string());
        }
        if self.improvement_window_days > self.analysis_window_days {
            return Err("improvement_window_days must not exceed analysis_window_days".to_string());
        }
        if self.max_analysis_records == 0 {
            return Err("max_analysis_records must be greater than 0".to_string());
        }
        if self.improvement_min_negatives == 0 {
            return Err("improvement_min_negatives must be greater than 0".to_string());
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
        assert!(LearningConfig::default().validate().is_ok());
    }

    #[test]
    fn test_improvement_window_bounded_by_analysis_window() {
        let config = LearningConfig {
            improvement_window_days: 60,
            ..LearningConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = LearningConfig {
            generate_prompt_templates: true,
            ..LearningConfig::default()
        };
        let toml = config.to_toml().unwrap();
        assert_eq!(LearningConfig::from_toml(&toml).unwrap(), config);
    }
}
