//! Completion provider trait and decoding parameters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Decoding configuration sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    /// Deterministic decoding with a bounded answer length.
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-instruct".to_string(),
            temperature: 0.0,
            max_tokens: 300,
        }
    }
}

/// Raw provider output, before trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

/// Trait for text-completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<Completion, ProviderError>;
}
