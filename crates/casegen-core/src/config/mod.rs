//! Configuration management for Casegen.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `casegen.toml` file
//! 3. User config `~/.config/casegen/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration.
    pub llm: LLMConfig,

    /// Generation engine configuration.
    pub generation: GenerationConfig,

    /// Coverage scoring heuristics.
    pub coverage: CoverageSettings,

    /// Knowledge store configuration.
    pub knowledge: KnowledgeConfig,

    /// External test-data agent configuration.
    pub test_data: TestDataConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./casegen.toml` (project local)
    /// 2. `~/.config/casegen/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("casegen.toml").exists() {
            return Self::from_file("casegen.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("casegen").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string without environment overrides.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("CASEGEN_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("CASEGEN_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Ok(url) = std::env::var("CASEGEN_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("CASEGEN_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(tokens) = std::env::var("CASEGEN_LLM_MAX_TOKENS") {
            if let Ok(n) = tokens.parse() {
                self.llm.max_tokens = n;
            }
        }

        if let Ok(secs) = std::env::var("CASEGEN_TIMEOUT_SECS") {
            if let Ok(n) = secs.parse() {
                self.generation.timeout_secs = n;
            }
        }

        if let Ok(dir) = std::env::var("CASEGEN_KNOWLEDGE_DIR") {
            self.knowledge.data_dir = dir;
        }

        if let Ok(url) = std::env::var("CASEGEN_TEST_DATA_URL") {
            self.test_data.endpoint = Some(url);
        }
    }

    /// Checks values that would make the engine misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generation.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.generation.max_count == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_count must be greater than zero".to_string(),
            ));
        }
        let split = self.coverage.ideal_high_share
            + self.coverage.ideal_medium_share
            + self.coverage.ideal_low_share;
        if (split - 100.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "coverage ideal priority shares must add up to 100, got {split}"
            )));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        Config::default().to_toml_string()
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Provider name: "openai", "ollama", "openrouter", or "openai-compatible".
    pub provider: String,

    /// Model name (provider-specific).
    pub model: Option<String>,

    /// Base URL for API (for openai-compatible providers).
    pub base_url: Option<String>,

    /// API key (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum tokens for response.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl LLMConfig {
    /// Get the model name, falling back to provider defaults.
    pub fn model_or_default(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider.as_str() {
            "ollama" => DEFAULT_OLLAMA_MODEL.to_string(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        })
    }

    /// Get the base URL, falling back to provider defaults.
    pub fn base_url_or_default(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| match self.provider.as_str() {
                "ollama" => DEFAULT_OLLAMA_URL.to_string(),
                "openrouter" => DEFAULT_OPENROUTER_URL.to_string(),
                _ => DEFAULT_OPENAI_URL.to_string(),
            })
    }

    /// Get API key from config or environment.
    pub fn api_key_or_env(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("CASEGEN_LLM_API_KEY").ok())
            .or_else(|| match self.provider.as_str() {
                "ollama" => None,
                "openrouter" => std::env::var("OPENROUTER_API_KEY").ok(),
                _ => std::env::var("OPENAI_API_KEY").ok(),
            })
    }
}

/// Generation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Timeout applied to every LLM call, in seconds.
    pub timeout_secs: u64,

    /// Maximum number of test cases a single request may ask for.
    pub max_count: usize,

    /// System prompt for generation.
    /// If not set, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Maximum length of response excerpts in error messages.
    pub error_context_length: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_count: DEFAULT_MAX_COUNT,
            system_prompt: None,
            error_context_length: DEFAULT_ERROR_CONTEXT_LENGTH,
        }
    }
}

impl GenerationConfig {
    /// The LLM timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Heuristic constants used by the coverage analyzer.
///
/// None of these have a derivation beyond "worked well enough"; they are
/// exposed so teams can tune scoring without patching the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageSettings {
    pub ideal_high_share: f64,
    pub ideal_medium_share: f64,
    pub ideal_low_share: f64,
    /// Allowed deviation (percentage points) from a policy's priority share.
    pub priority_tolerance: f64,
    pub min_recommended_tests: usize,
    pub min_distinct_types: usize,
    pub max_high_priority_share: f64,
    pub min_high_priority_share: f64,
    pub requirement_coverage_threshold: f64,
    pub edge_case_threshold: f64,
    pub edge_case_multiplier: f64,
    /// Delta (points) at which a comparison reports an improvement or regression.
    pub trend_threshold: f64,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            ideal_high_share: DEFAULT_IDEAL_HIGH_SHARE,
            ideal_medium_share: DEFAULT_IDEAL_MEDIUM_SHARE,
            ideal_low_share: DEFAULT_IDEAL_LOW_SHARE,
            priority_tolerance: DEFAULT_PRIORITY_TOLERANCE,
            min_recommended_tests: DEFAULT_MIN_RECOMMENDED_TESTS,
            min_distinct_types: DEFAULT_MIN_DISTINCT_TYPES,
            max_high_priority_share: DEFAULT_MAX_HIGH_PRIORITY_SHARE,
            min_high_priority_share: DEFAULT_MIN_HIGH_PRIORITY_SHARE,
            requirement_coverage_threshold: DEFAULT_REQUIREMENT_COVERAGE_THRESHOLD,
            edge_case_threshold: DEFAULT_EDGE_CASE_THRESHOLD,
            edge_case_multiplier: DEFAULT_EDGE_CASE_MULTIPLIER,
            trend_threshold: DEFAULT_TREND_THRESHOLD,
        }
    }
}

/// Knowledge store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Whether generated cases are learned and reused as context.
    pub enabled: bool,

    /// Directory holding learned entries.
    pub data_dir: String,

    /// Number of similar cases pulled into a prompt.
    pub similar_limit: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_dir: DEFAULT_KNOWLEDGE_DIR.to_string(),
            similar_limit: DEFAULT_SIMILAR_LIMIT,
        }
    }
}

impl KnowledgeConfig {
    /// Get the full path to the entries directory.
    pub fn entries_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DEFAULT_ENTRIES_DIR)
    }
}

/// External test-data agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestDataConfig {
    /// Base URL of the agent; enrichment skips sample data when unset.
    pub endpoint: Option<String>,
}
