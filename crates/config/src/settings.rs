//! Agent settings
//!
//! Top-level configuration: locale data (lexicon, taxonomy, prompts) plus
//! dialogue and completion tuning. Loaded from a YAML file, then overridden
//! from `EXPENSE_AGENT__*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use expense_agent_core::RoundingPolicy;

use crate::constants::{conversation, endpoints, timeouts};
use crate::lexicon::LexiconConfig;
use crate::prompts::PromptTemplates;
use crate::taxonomy::CategoryTaxonomy;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "EXPENSE_AGENT";

/// Settings errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found: {0}: {1}")]
    FileNotFound(String, String),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to parse settings: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("environment override failed: {0}")]
    Environment(#[from] config::ConfigError),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Dialogue tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueSettings {
    /// Turns kept per conversation
    pub history_window: usize,
    /// Inactivity before a conversation expires
    pub ttl_minutes: i64,
    /// Minimum folded length for a message to replace an open conversation
    pub min_new_transaction_chars: usize,
    /// Pick the only active card without asking
    pub auto_select_single_card: bool,
    /// How installment remainders are handled
    pub rounding: RoundingPolicy,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            history_window: conversation::HISTORY_WINDOW,
            ttl_minutes: conversation::TTL_MINUTES,
            min_new_transaction_chars: conversation::MIN_NEW_TRANSACTION_CHARS,
            auto_select_single_card: true,
            rounding: RoundingPolicy::default(),
        }
    }
}

impl DialogueSettings {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes)
    }
}

/// Completion service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// When false, confirmations always use the static template
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: endpoints::OLLAMA_DEFAULT.to_string(),
            model: endpoints::DEFAULT_MODEL.to_string(),
            timeout_ms: timeouts::COMPLETION_MS,
            max_tokens: 80,
            temperature: 0.4,
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub lexicon: LexiconConfig,
    pub taxonomy: CategoryTaxonomy,
    pub prompts: PromptTemplates,
    pub dialogue: DialogueSettings,
    pub completion: CompletionSettings,
}

impl AgentSettings {
    /// Load from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides()?;
        settings.validate()?;
        tracing::debug!(
            locale = %settings.lexicon.locale,
            rules = settings.taxonomy.rules.len(),
            completion = settings.completion.enabled,
            "Loaded agent settings"
        );
        Ok(settings)
    }

    /// Load from a YAML (or `.toml`) file without environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(path.display().to_string(), e.to_string()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `EXPENSE_AGENT__SECTION__KEY` overrides for scalar settings
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let env = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        if let Ok(v) = env.get_bool("completion.enabled") {
            self.completion.enabled = v;
        }
        if let Ok(v) = env.get_string("completion.endpoint") {
            self.completion.endpoint = v;
        }
        if let Ok(v) = env.get_string("completion.model") {
            self.completion.model = v;
        }
        if let Ok(v) = env.get_int("completion.timeout_ms") {
            self.completion.timeout_ms = v.max(0) as u64;
        }
        if let Ok(v) = env.get_int("dialogue.ttl_minutes") {
            self.dialogue.ttl_minutes = v;
        }
        if let Ok(v) = env.get_int("dialogue.history_window") {
            self.dialogue.history_window = v.max(0) as usize;
        }
        if let Ok(v) = env.get_bool("dialogue.auto_select_single_card") {
            self.dialogue.auto_select_single_card = v;
        }
        Ok(())
    }

    /// Reject settings the dialogue cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.taxonomy.catch_all.trim().is_empty() {
            return Err(ConfigError::Invalid("taxonomy.catch_all is empty".into()));
        }
        if let Some(rule) = self
            .taxonomy
            .rules
            .iter()
            .find(|r| r.keywords.is_empty() || r.target.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "taxonomy rule '{}' needs a target and keywords",
                rule.target
            )));
        }
        if self.dialogue.history_window < 2 {
            return Err(ConfigError::Invalid(
                "dialogue.history_window must hold a question and its answer".into(),
            ));
        }
        if self.dialogue.ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("dialogue.ttl_minutes must be positive".into()));
        }
        for pattern in &self.lexicon.nonsense_patterns {
            regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}
