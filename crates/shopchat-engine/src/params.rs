//! Per-turn parameter overrides and boundary validation.

use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use shopchat_core::EngineConfig;
use shopchat_index::MetadataFilter;

/// Per-request overrides; every field is optional and falls back to the
/// engine configuration.
///
/// The similarity threshold is intentionally absent: it is a system-wide
/// quality floor, not a per-call knob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnParameters {
    /// Generation temperature (0-2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Chat model identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,

    /// Embedding model identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    /// Number of records to retrieve (1-20).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,

    /// Metadata filter for retrieval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<MetadataFilter>,

    /// System prompt override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Fully resolved settings for one turn.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub temperature: f32,
    pub chat_model: String,
    pub embedding_model: String,
    pub k: usize,
    pub threshold: f32,
    pub filter: MetadataFilter,
    pub system_prompt: Option<String>,
}

impl TurnParameters {
    /// Validate the message and overrides before any external call.
    pub fn validate(&self, message: &str) -> Result<()> {
        let mut errors = Vec::new();

        if message.trim().is_empty() {
            errors.push("message cannot be empty".to_string());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                errors.push(format!("temperature must be 0.0-2.0, got {temperature}"));
            }
        }

        if let Some(k) = self.k {
            if !(1..=20).contains(&k) {
                errors.push(format!("k must be 1-20, got {k}"));
            }
        }

        if let Some(model) = &self.chat_model {
            if model.is_empty() {
                errors.push("chat_model cannot be empty".to_string());
            }
        }

        if let Some(model) = &self.embedding_model {
            if model.is_empty() {
                errors.push("embedding_model cannot be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(errors.join("; ")))
        }
    }

    /// Merge with the engine configuration into concrete settings.
    pub fn resolve(self, config: &EngineConfig) -> TurnSettings {
        TurnSettings {
            temperature: self.temperature.unwrap_or(config.default_temperature),
            chat_model: self
                .chat_model
                .unwrap_or_else(|| config.default_chat_model.clone()),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| config.default_embedding_model.clone()),
            k: self.k.unwrap_or(config.default_k),
            threshold: config.similarity_threshold,
            filter: self.filters.unwrap_or_default(),
            system_prompt: self.system_prompt.or_else(|| config.default_system_prompt.clone()),
        }
    }
}
