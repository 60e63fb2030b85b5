//! Engine configuration: defaults, loading, and validation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for the conversation engine.
///
/// Every field has a serde default so a partial (or missing) config file
/// still yields a usable configuration. All fields except
/// `similarity_threshold` can be overridden per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default generation temperature.
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default chat model identifier.
    #[serde(default = "default_chat_model")]
    pub default_chat_model: String,

    /// Default embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub default_embedding_model: String,

    /// Default number of records to retrieve per turn.
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Minimum similarity for a record to count as context.
    ///
    /// System-wide quality floor; deliberately not overridable per turn.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// System prompt used when a turn does not supply one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_system_prompt: Option<String>,

    /// Sessions idle longer than this are eligible for the retention sweep.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Timeout applied independently to each external call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts for the history commit after a successful generation.
    #[serde(default = "default_commit_retries")]
    pub commit_retries: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_k() -> usize {
    4
}

fn default_similarity_threshold() -> f32 {
    0.5
}

fn default_session_ttl_secs() -> u64 {
    // 30 days
    30 * 24 * 60 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_commit_retries() -> u32 {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_temperature: default_temperature(),
            default_chat_model: default_chat_model(),
            default_embedding_model: default_embedding_model(),
            default_k: default_k(),
            similarity_threshold: default_similarity_threshold(),
            default_system_prompt: None,
            session_ttl_secs: default_session_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            commit_retries: default_commit_retries(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(0.0..=2.0).contains(&self.default_temperature) {
            errors.push(format!(
                "default_temperature must be 0.0-2.0, got {}",
                self.default_temperature
            ));
        }

        if !(1..=20).contains(&self.default_k) {
            errors.push(format!("default_k must be 1-20, got {}", self.default_k));
        }

        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            errors.push(format!(
                "similarity_threshold must be -1.0-1.0, got {}",
                self.similarity_threshold
            ));
        }

        if self.default_chat_model.is_empty() {
            errors.push("default_chat_model cannot be empty".to_string());
        }

        if self.default_embedding_model.is_empty() {
            errors.push("default_embedding_model cannot be empty".to_string());
        }

        if self.session_ttl_secs == 0 {
            errors.push("session_ttl_secs cannot be 0".to_string());
        }

        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Session TTL as a [`Duration`].
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Per-call timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
