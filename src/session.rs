//! Everything a query needs, loaded once from configuration.

use anyhow::{bail, Context, Result};
use context_qa_core::context::ContextBudget;
use context_qa_core::models::Corpus;
use context_qa_core::prompt::PromptTemplate;
use context_qa_core::rank::Similarity;
use context_qa_core::store::EmbeddingStore;
use context_qa_core::tokens::TokenCounter;

use crate::config::{Config, ContextConfig};
use crate::corpus::load_corpus;
use crate::tokens::create_counter;

/// Corpus, embedding store and query settings for one run.
pub struct Session {
    pub corpus: Corpus,
    pub store: EmbeddingStore,
    pub budget: ContextBudget,
    pub similarity: Similarity,
    pub template: PromptTemplate,
}

impl Session {
    pub fn open(config: &Config) -> Result<Self> {
        let corpus = load_corpus(&config.corpus.path)?;

        if !config.store.path.exists() {
            bail!(
                "Embedding store not found: {}. Run `cqa index` first.",
                config.store.path.display()
            );
        }
        let store = EmbeddingStore::load(&config.store.path).with_context(|| {
            format!(
                "Failed to load embedding store: {}",
                config.store.path.display()
            )
        })?;

        let orphans = store.iter().filter(|(k, _)| !corpus.contains(k)).count();
        if orphans > 0 {
            tracing::warn!(
                orphans,
                "embedding store has passages that are not in the corpus; they will be skipped"
            );
        }
        let unranked = corpus.len().saturating_sub(store.len() - orphans);
        if unranked > 0 {
            tracing::debug!(unranked, "corpus passages without an embedding");
        }

        let off = misnormalized(&store, config.context.similarity);
        if off > 0 {
            tracing::warn!(
                vectors = off,
                "stored vectors are not unit length; dot-product scores are unnormalized"
            );
        }

        let counter = create_counter(&config.tokens)?;
        Ok(Self {
            corpus,
            store,
            budget: budget_from_config(&config.context, counter.as_ref()),
            similarity: config.context.similarity,
            template: template_from_config(&config.context),
        })
    }
}

/// The assembly budget, pricing the separator with `counter` unless a
/// fixed cost is configured.
pub fn budget_from_config(context: &ContextConfig, counter: &dyn TokenCounter) -> ContextBudget {
    match context.separator_tokens {
        Some(cost) => ContextBudget::new(context.max_tokens, context.separator.clone(), cost),
        None => ContextBudget::counted(context.max_tokens, context.separator.clone(), counter),
    }
}

/// Stored vectors whose length skews scores under `similarity`.
fn misnormalized(store: &EmbeddingStore, similarity: Similarity) -> usize {
    match similarity {
        Similarity::Dot => store.non_unit_count(),
        Similarity::Cosine => 0,
    }
}

pub fn template_from_config(context: &ContextConfig) -> PromptTemplate {
    match &context.preamble {
        Some(preamble) => PromptTemplate::new(preamble.clone()),
        None => PromptTemplate::default(),
    }
}
