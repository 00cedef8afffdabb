//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use evident_assistant::AssistantConfig;
use evident_graph::GraphConfig;
use evident_learning::LearningConfig;
use evident_llm::LlmConfig;
use evident_reasoning::ReasoningConfig;
use evident_retrieval::OrchestratorConfig;
use evident_verify::{CitationConfig, VerificationConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name
    #[serde(default = "default_profile")]
    pub active_profile: String,

    /// Available profiles
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// File this configuration was loaded from
    #[serde(skip)]
    location: Option<PathBuf>,
}

/// Pipeline profile: where evidence lives and which models answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// SQLite database path
    pub database: String,

    /// Primary completion provider
    pub primary: LlmConfig,

    /// Provider used when the primary fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<LlmConfig>,

    /// Whether the web tier may run
    #[serde(default)]
    pub web_search: bool,

    /// Web search model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_model: Option<String>,

    /// Web search endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_endpoint: Option<String>,

    /// Engine tuning
    #[serde(default)]
    pub engines: EngineSettings,
}

/// Per-engine settings carried by a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Search hierarchy
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Document relationships and conflicts
    #[serde(default)]
    pub graph: GraphConfig,

    /// Multi-step reasoning
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Fact verification
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Citation scoring
    #[serde(default)]
    pub citation: CitationConfig,

    /// Feedback learning
    #[serde(default)]
    pub learning: LearningConfig,

    /// Answer composition
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Command history size
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Directory holding the configuration, history, and default database.
    pub fn home() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".evident"))
    }

    /// Get the configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home()?.join("config.toml"))
    }

    /// Load configuration from the default location or create default.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path` or create default.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)?;
            toml::from_str::<Config>(&contents)?
        } else {
            Self::default()
        };
        config.validate()?;
        config.location = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to the file it was loaded from.
    pub fn save(&self) -> Result<()> {
        let path = match &self.location {
            Some(path) => path.clone(),
            None => Self::path()?,
        };

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Check every profile's settings.
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in &self.profiles {
            profile
                .validate()
                .map_err(|e| CliError::Config(format!("Profile '{}': {}", name, e)))?;
        }
        Ok(())
    }

    /// Get the active profile.
    pub fn get_active_profile(&self) -> Result<&Profile> {
        self.profiles
            .get(&self.active_profile)
            .ok_or_else(|| CliError::Config(format!("Profile '{}' not found", self.active_profile)))
    }

    /// Add or update a profile.
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Switch to a different profile.
    pub fn switch_profile(&mut self, name: String) -> Result<()> {
        if !self.profiles.contains_key(&name) {
            return Err(CliError::Config(format!("Profile '{}' does not exist", name)));
        }
        self.active_profile = name;
        Ok(())
    }
}

impl Profile {
    /// Local profile backed by `database` and an Ollama model.
    pub fn local(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            primary: LlmConfig::ollama("llama3.1"),
            fallback: None,
            web_search: false,
            web_model: None,
            web_endpoint: None,
            engines: EngineSettings::default(),
        }
    }

    /// Validate provider and engine settings.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.database.trim().is_empty() {
            return Err("database must not be empty".to_string());
        }
        self.primary.validate().map_err(|e| format!("primary: {}", e))?;
        if let Some(fallback) = &self.fallback {
            fallback.validate().map_err(|e| format!("fallback: {}", e))?;
        }
        let engines = &self.engines;
        engines.orchestrator.validate().map_err(|e| format!("orchestrator: {}", e))?;
        engines.graph.validate().map_err(|e| format!("graph: {}", e))?;
        engines.reasoning.validate().map_err(|e| format!("reasoning: {}", e))?;
        engines.verification.validate().map_err(|e| format!("verification: {}", e))?;
        engines.citation.validate().map_err(|e| format!("citation: {}", e))?;
        engines.learning.validate().map_err(|e| format!("learning: {}", e))?;
        engines.assistant.validate().map_err(|e| format!("assistant: {}", e))?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let database = Self::home()
            .map(|home| home.join("evident.db").to_string_lossy().into_owned())
            .unwrap_or_else(|_| "evident.db".to_string());

        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), Profile::local(database));

        Self {
            active_profile: "default".to_string(),
            profiles,
            settings: Settings::default(),
            location: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            history_size: 1000,
        }
    }
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_history_size() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_llm::ProviderKind;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.active_profile, "default");
        assert!(config.profiles.contains_key("default"));
        assert!(config.settings.color);
        assert!(config.validate().is_ok());
        assert!(!config.get_active_profile().unwrap().web_search);
    }

    #[test]
    fn test_profile_management() {
        let mut config = Config::default();

        let mut profile = Profile::local("/tmp/test.db");
        profile.primary = LlmConfig::anthropic("claude-sonnet");
        profile.fallback = Some(LlmConfig::openai("gpt-4o-mini"));

        config.set_profile("test".to_string(), profile);
        assert!(config.profiles.contains_key("test"));

        config.switch_profile("test".to_string()).unwrap();
        assert_eq!(config.active_profile, "test");
        assert_eq!(config.get_active_profile().unwrap().primary.provider, ProviderKind::Anthropic);
    }

    #[test]
    fn test_switch_to_nonexistent_profile() {
        let mut config = Config::default();
        let result = config.switch_profile("nonexistent".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        let mut profile = Profile::local("/data/evident.db");
        profile.web_search = true;
        profile.web_model = Some("sonar-pro".to_string());
        profile.engines.assistant.role = "Account Manager".to_string();
        config.set_profile("work".to_string(), profile);
        config.switch_profile("work".to_string()).unwrap();
        config.settings.format = OutputFormat::Json;
        config.save().unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.active_profile, "work");
        assert_eq!(loaded.settings.format, OutputFormat::Json);
        let work = loaded.get_active_profile().unwrap();
        assert!(work.web_search);
        assert_eq!(work.web_model.as_deref(), Some("sonar-pro"));
        assert_eq!(work.engines.assistant.role, "Account Manager");
    }

    #[test]
    fn test_api_keys_are_never_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        let mut profile = Profile::local("evident.db");
        profile.primary.api_key = Some("sk-secret".to_string());
        config.set_profile("default".to_string(), profile);
        config.save().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("sk-secret"));
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
active_profile = "local"

[profiles.local]
database = "local.db"

[profiles.local.primary]
provider = "ollama"
model = "llama3.1"
timeout_secs = 30
max_retries = 3
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let local = config.get_active_profile().unwrap();
        assert_eq!(local.database, "local.db");
        assert!(local.fallback.is_none());
        assert_eq!(local.engines.assistant, AssistantConfig::default());
        assert_eq!(config.settings.history_size, 1000);
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let mut config = Config::default();
        let mut profile = Profile::local("db");
        profile.primary.model = String::new();
        config.set_profile("broken".to_string(), profile);
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }
}
