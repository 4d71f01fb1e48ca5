//! Completion provider implementations.
//!
//! - **[`DisabledCompleter`]** fails every call.
//! - **[`OpenAiCompleter`]** calls the legacy `POST {url}/v1/completions` endpoint.
//! - **[`OllamaCompleter`]** calls `POST {url}/api/generate` with streaming off.
//!
//! Responses are returned untrimmed; the query engine trims them.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use context_qa_core::completion::{Completion, CompletionParams, CompletionProvider};
use context_qa_core::ProviderError;
use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::embedding::{openai_api_key, OLLAMA_URL, OPENAI_URL};
use crate::http::{endpoint, JsonClient, RetryPolicy};

pub struct DisabledCompleter;

#[async_trait]
impl CompletionProvider for DisabledCompleter {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(
        &self,
        _prompt: &str,
        _params: &CompletionParams,
    ) -> std::result::Result<Completion, ProviderError> {
        Err(ProviderError::unavailable(
            "Completion provider is disabled. Set [completion] provider in config.",
        ))
    }
}

#[derive(Serialize)]
struct OpenAiCompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiCompletionResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    text: String,
}

pub struct OpenAiCompleter {
    model: String,
    url: String,
    client: JsonClient,
}

impl OpenAiCompleter {
    pub fn new(config: &CompletionConfig, api_key: String) -> Result<Self> {
        let client = JsonClient::new(
            "OpenAI",
            Duration::from_secs(config.timeout_secs),
            Some(api_key),
            RetryPolicy::new(config.max_retries),
        )?;
        Ok(Self {
            model: config.model.clone(),
            url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            client,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.client = self.client.clone().with_retry(retry);
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompleter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> std::result::Result<Completion, ProviderError> {
        let request = OpenAiCompletionRequest {
            model: &params.model,
            prompt,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let response: OpenAiCompletionResponse = self
            .client
            .post(&endpoint(&self.url, "/v1/completions"), &request)
            .await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ProviderError::unavailable("Invalid OpenAI response: no choices"))?;
        Ok(Completion { text })
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

pub struct OllamaCompleter {
    model: String,
    url: String,
    client: JsonClient,
}

impl OllamaCompleter {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = JsonClient::new(
            "Ollama",
            Duration::from_secs(config.timeout_secs),
            None,
            RetryPolicy::new(config.max_retries),
        )?;
        Ok(Self {
            model: config.model.clone(),
            url: config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            client,
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaCompleter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> std::result::Result<Completion, ProviderError> {
        let request = OllamaGenerateRequest {
            model: &params.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };
        let response: OllamaGenerateResponse = self
            .client
            .post(&endpoint(&self.url, "/api/generate"), &request)
            .await?;
        Ok(Completion {
            text: response.response,
        })
    }
}

/// Create the [`CompletionProvider`] named by `config.provider`.
pub fn create_completer(config: &CompletionConfig) -> Result<Box<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledCompleter)),
        "openai" => Ok(Box::new(OpenAiCompleter::new(config, openai_api_key()?)?)),
        "ollama" => Ok(Box::new(OllamaCompleter::new(config)?)),
        other => bail!("Unknown completion provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_qa_core::ProviderErrorKind;

    #[tokio::test]
    async fn test_disabled_completer() {
        let err = DisabledCompleter
            .complete("prompt", &CompletionParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Unavailable);
    }

    #[test]
    fn test_ollama_request_shape() {
        let request = OllamaGenerateRequest {
            model: "llama3",
            prompt: "Q",
            stream: false,
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: 300,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 300);
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = CompletionConfig {
            provider: "bard".to_string(),
            ..CompletionConfig::default()
        };
        assert!(create_completer(&config).is_err());
    }
}
