//! TOML configuration.
//!
//! Every section except `[corpus]` and `[store]` is optional and falls back
//! to the defaults below. [`load_config`] parses and validates in one step;
//! an invalid file never produces a [`Config`].

use anyhow::{bail, Context, Result};
use context_qa_core::completion::CompletionParams;
use context_qa_core::context::{DEFAULT_MAX_TOKENS, DEFAULT_SEPARATOR};
use context_qa_core::rank::Similarity;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
}

/// Location of the passage table (`title,heading,content,tokens`).
#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
}

/// Location of the persisted embedding file.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: 30,
            max_retries: 0,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_completion_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: default_completion_model(),
            temperature: 0.0,
            max_tokens: default_completion_max_tokens(),
            url: None,
            timeout_secs: 60,
            max_retries: 0,
        }
    }
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn params(&self) -> CompletionParams {
        CompletionParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_context_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Fixed separator cost. Counted with `[tokens]` when absent.
    #[serde(default)]
    pub separator_tokens: Option<usize>,
    #[serde(default)]
    pub similarity: Similarity,
    #[serde(default)]
    pub preamble: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            separator: DEFAULT_SEPARATOR.to_string(),
            separator_tokens: None,
            similarity: Similarity::default(),
            preamble: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokensConfig {
    #[serde(default = "default_counter")]
    pub counter: String,
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            counter: default_counter(),
            chars_per_token: default_chars_per_token(),
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Minimum spacing between embedding calls during `cqa index`.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_completion_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}
fn default_completion_max_tokens() -> u32 {
    300
}
fn default_completion_timeout_secs() -> u64 {
    60
}
fn default_context_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}
fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}
fn default_counter() -> String {
    "chars".to_string()
}
fn default_chars_per_token() -> usize {
    4
}
fn default_min_interval_ms() -> u64 {
    250
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.model.is_none() {
        bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    match config.completion.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown completion provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.completion.max_tokens == 0 {
        bail!("completion.max_tokens must be > 0");
    }
    if !(0.0..=2.0).contains(&config.completion.temperature) {
        bail!("completion.temperature must be in [0.0, 2.0]");
    }

    if config.context.max_tokens == 0 {
        bail!("context.max_tokens must be > 0");
    }

    match config.tokens.counter.as_str() {
        "chars" | "whitespace" => {}
        "tokenizer" => {
            if config.tokens.tokenizer_path.is_none() {
                bail!("tokens.tokenizer_path must be specified when counter is 'tokenizer'");
            }
        }
        other => bail!(
            "Unknown token counter: '{}'. Must be chars, whitespace, or tokenizer.",
            other
        ),
    }
    if config.tokens.chars_per_token == 0 {
        bail!("tokens.chars_per_token must be > 0");
    }

    Ok(())
}
