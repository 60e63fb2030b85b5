//! OpenAI-compatible HTTP providers.
//!
//! Both clients talk to the standard `/v1` REST surface, so they also work
//! against Azure OpenAI and other compatible gateways via `with_base_url`.

use crate::{ChatProvider, EmbeddingProvider, GenerationRequest, ProviderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use shopchat_core::Role;
use tracing::debug;

/// Default OpenAI API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {}", e)))
}

async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 | 403 => ProviderError::auth(body),
        404 => ProviderError::ModelNotFound(body),
        429 => ProviderError::rate_limit(body, retry_after),
        code if code >= 500 => ProviderError::server_error(code, body),
        _ => ProviderError::invalid_request(body),
    }
}

/// OpenAI embeddings provider.
pub struct OpenAIEmbeddings {
    client: Client,
    api_key: SecretString,
    api_base: String,
}

impl OpenAIEmbeddings {
    /// Create a new embeddings provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ProviderError::config("API key is required"));
        }

        Ok(Self {
            client: build_client()?,
            api_key: SecretString::new(api_key),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Create a new provider from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::config("OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Set the API base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self, model: &str) -> usize {
        match model {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536,
        }
    }

    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct Response {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        debug!(model, count = texts.len(), "Requesting embeddings");

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&Request { model, input: texts })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let response: Response = response.json().await?;
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// OpenAI chat completion provider.
pub struct OpenAIChat {
    client: Client,
    api_key: SecretString,
    api_base: String,
}

impl OpenAIChat {
    /// Create a new chat provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ProviderError::config("API key is required"));
        }

        Ok(Self {
            client: build_client()?,
            api_key: SecretString::new(api_key),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Create a new provider from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::config("OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Set the API base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[async_trait]
impl ChatProvider for OpenAIChat {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: Vec<OpenAIMessage<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(OpenAIMessage {
            role: "system",
            content: &request.system_prompt,
        });
        for message in &request.messages {
            messages.push(OpenAIMessage {
                role: match message.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &message.content,
            });
        }

        debug!(model = %request.model, messages = messages.len(), "Requesting chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&Request {
                model: &request.model,
                messages,
                temperature: request.temperature,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let response: Response = response.json().await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::internal("No choices in response"))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
