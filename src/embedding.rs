//! Embedding provider implementations.
//!
//! Concrete backends for [`EmbeddingProvider`]:
//! - **[`DisabledEmbedder`]** fails every call; used when embeddings are not configured.
//! - **[`OpenAiEmbedder`]** calls `POST {url}/v1/embeddings`.
//! - **[`OllamaEmbedder`]** calls `POST {url}/api/embed` on a local Ollama instance.
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to build the provider named in `[embedding]`:
//!
//! ```rust
//! # use context_qa::config::EmbeddingConfig;
//! # use context_qa::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_embedder(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! When `dims` is configured, any vector of a different length is rejected
//! as `InvalidInput` before it can reach the store.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use context_qa_core::embedding::EmbeddingProvider;
use context_qa_core::ProviderError;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::http::{endpoint, JsonClient, RetryPolicy};

pub const OPENAI_URL: &str = "https://api.openai.com";
pub const OLLAMA_URL: &str = "http://localhost:11434";

// ============ Disabled Provider ============

/// Embedding provider used when `embedding.provider = "disabled"`.
pub struct DisabledEmbedder;

#[async_trait]
impl EmbeddingProvider for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        Err(ProviderError::unavailable(
            "Embedding provider is disabled. Set [embedding] provider in config.",
        ))
    }
}

// ============ OpenAI Provider ============

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider using the OpenAI API.
pub struct OpenAiEmbedder {
    model: String,
    dims: Option<usize>,
    url: String,
    client: JsonClient,
}

impl OpenAiEmbedder {
    /// Create a provider that authenticates with `api_key`.
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let url = config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string());
        let client = JsonClient::new(
            "OpenAI",
            Duration::from_secs(config.timeout_secs),
            Some(api_key),
            RetryPolicy::new(config.max_retries),
        )?;
        Ok(Self {
            model,
            dims: config.dims,
            url,
            client,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.client = self.client.clone().with_retry(retry);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims.unwrap_or(0)
    }
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response: OpenAiEmbeddingResponse = self
            .client
            .post(&endpoint(&self.url, "/v1/embeddings"), &request)
            .await?;
        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::unavailable("Invalid OpenAI response: empty data array"))?;
        check_vector(vector, self.dims)
    }
}

// ============ Ollama Provider ============

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider using a local Ollama instance.
///
/// Requires Ollama to be running with an embedding model pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: Option<usize>,
    url: String,
    client: JsonClient,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let url = config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string());
        let client = JsonClient::new(
            "Ollama",
            Duration::from_secs(config.timeout_secs),
            None,
            RetryPolicy::new(config.max_retries),
        )?;
        Ok(Self {
            model,
            dims: config.dims,
            url,
            client,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.client = self.client.clone().with_retry(retry);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims.unwrap_or(0)
    }
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let request = OllamaEmbedRequest {
            model: &self.model,
            input: text,
        };
        let response: OllamaEmbedResponse = self
            .client
            .post(&endpoint(&self.url, "/api/embed"), &request)
            .await?;
        let vector = response.embeddings.into_iter().next().ok_or_else(|| {
            ProviderError::unavailable("Invalid Ollama response: empty embeddings array")
        })?;
        check_vector(vector, self.dims)
    }
}

fn check_vector(
    vector: Vec<f32>,
    dims: Option<usize>,
) -> std::result::Result<Vec<f32>, ProviderError> {
    if vector.is_empty() {
        return Err(ProviderError::invalid_input("provider returned an empty vector"));
    }
    match dims {
        Some(expected) if vector.len() != expected => Err(ProviderError::invalid_input(format!(
            "provider returned {} components, embedding.dims is {}",
            vector.len(),
            expected
        ))),
        _ => Ok(vector),
    }
}

/// Create the [`EmbeddingProvider`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAiEmbedder`] (reads `OPENAI_API_KEY`) |
/// | `"ollama"` | [`OllamaEmbedder`] |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config, openai_api_key()?)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Read `OPENAI_API_KEY` from the environment.
pub fn openai_api_key() -> Result<String> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => bail!("OPENAI_API_KEY environment variable not set"),
    }
}
