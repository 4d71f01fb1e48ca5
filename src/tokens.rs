//! Token counter selection from `[tokens]`.

use anyhow::{bail, Result};
use context_qa_core::tokens::{CharRatioCounter, TokenCounter, WhitespaceCounter};

use crate::config::TokensConfig;

/// Build the counter named by `config.counter`.
pub fn create_counter(config: &TokensConfig) -> Result<Box<dyn TokenCounter>> {
    match config.counter.as_str() {
        "chars" => Ok(Box::new(CharRatioCounter::new(config.chars_per_token))),
        "whitespace" => Ok(Box::new(WhitespaceCounter)),
        "tokenizer" => tokenizer_counter(config),
        other => bail!("Unknown token counter: {}", other),
    }
}

#[cfg(feature = "hf-tokenizer")]
fn tokenizer_counter(config: &TokensConfig) -> Result<Box<dyn TokenCounter>> {
    let path = config
        .tokenizer_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("tokens.tokenizer_path required for tokenizer counter"))?;
    Ok(Box::new(hf::HfTokenCounter::from_file(path)?))
}

#[cfg(not(feature = "hf-tokenizer"))]
fn tokenizer_counter(_config: &TokensConfig) -> Result<Box<dyn TokenCounter>> {
    bail!("Tokenizer counter requires --features hf-tokenizer")
}

#[cfg(feature = "hf-tokenizer")]
pub mod hf {
    use std::path::Path;

    use anyhow::Result;
    use context_qa_core::tokens::TokenCounter;

    /// Counts tokens with a Hugging Face `tokenizer.json`.
    pub struct HfTokenCounter {
        tokenizer: tokenizers::Tokenizer,
    }

    impl HfTokenCounter {
        pub fn from_file(path: &Path) -> Result<Self> {
            let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| {
                anyhow::anyhow!("Failed to load tokenizer {}: {}", path.display(), e)
            })?;
            Ok(Self { tokenizer })
        }
    }

    impl TokenCounter for HfTokenCounter {
        fn count_tokens(&self, text: &str) -> usize {
            match self.tokenizer.encode(text, false) {
                Ok(encoding) => encoding.len(),
                Err(e) => {
                    tracing::warn!(error = %e, "tokenizer failed; falling back to 4 chars per token");
                    text.chars().count().div_ceil(4)
                }
            }
        }
    }
}
