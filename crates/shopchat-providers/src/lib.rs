//! Model provider capability interfaces for ShopChat.
//!
//! This crate defines the two external capabilities the engine depends on -
//! "embed text into a vector" and "generate an answer from a prompt" - plus
//! OpenAI-compatible HTTP implementations of both.
//!
//! Version- and vendor-specific adaptation belongs entirely here; the
//! orchestrator only ever sees these traits.

mod error;

pub mod openai;

pub use error::{ProviderError, Result};
pub use openai::{OpenAIChat, OpenAIEmbeddings};

use async_trait::async_trait;
use shopchat_core::ChatMessage;

/// External capability: text in, fixed-dimension vector out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Embedding dimension produced by `model`.
    fn dimension(&self, model: &str) -> usize;

    /// Generate embeddings for a batch of texts.
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    async fn embed_one(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(&[text.to_string()], model).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::internal("No embedding returned"))
    }
}

/// A fully assembled generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Chat model identifier.
    pub model: String,

    /// System instruction text, retrieved context included.
    pub system_prompt: String,

    /// Prior history plus the new user message, in order.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f32,
}

/// External capability: prompt plus conversation in, answer text out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Generate an answer for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
