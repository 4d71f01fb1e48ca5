//! Query orchestration: embed → rank → assemble → render → complete.
//!
//! [`Retriever`] covers everything up to the rendered prompt and needs only
//! an embedding provider. [`QueryEngine`] adds the completion call.
//!
//! Provider errors propagate unchanged. An empty assembled context is not
//! an error: the prompt is still rendered and submitted.

use crate::completion::{CompletionParams, CompletionProvider};
use crate::context::{assemble, ContextBudget};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::models::{AssembledContext, Corpus, RankedCandidate};
use crate::prompt::PromptTemplate;
use crate::rank::{rank, top_k, Similarity};
use crate::store::EmbeddingStore;

/// A rendered prompt and the context it was built from.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub prompt: String,
    pub context: AssembledContext,
}

/// The final answer plus the diagnostics that produced it.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Completion text trimmed of surrounding spaces and newlines.
    pub text: String,
    pub prompt: String,
    pub context: AssembledContext,
}

/// Embeds queries and turns them into ranked candidates and prompts.
pub struct Retriever<'a> {
    embedder: &'a dyn EmbeddingProvider,
    budget: ContextBudget,
    similarity: Similarity,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn EmbeddingProvider, budget: ContextBudget) -> Self {
        Self {
            embedder,
            budget,
            similarity: Similarity::default(),
        }
    }

    pub fn with_similarity(mut self, similarity: Similarity) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// Rank every stored passage against `query`.
    pub async fn rank(&self, query: &str, store: &EmbeddingStore) -> Result<Vec<RankedCandidate>> {
        let query_vector = self.embedder.embed(query).await?;
        rank(&query_vector, store, self.similarity)
    }

    /// The `k` best passages for `query`.
    pub async fn search(
        &self,
        query: &str,
        store: &EmbeddingStore,
        k: usize,
    ) -> Result<Vec<RankedCandidate>> {
        let query_vector = self.embedder.embed(query).await?;
        top_k(&query_vector, store, self.similarity, k)
    }

    /// Embed, rank, assemble and render the prompt for `query`.
    pub async fn construct_prompt(
        &self,
        query: &str,
        corpus: &Corpus,
        store: &EmbeddingStore,
        template: &PromptTemplate,
    ) -> Result<PreparedPrompt> {
        let ranked = self.rank(query, store).await?;
        let context = assemble(&ranked, corpus, &self.budget);

        let sections: Vec<String> = context.keys.iter().map(ToString::to_string).collect();
        tracing::info!(
            selected = context.len(),
            ranked = ranked.len(),
            used_tokens = context.used_tokens,
            budget = self.budget.max_tokens,
            "Selected {} document sections: {}",
            context.len(),
            sections.join(", ")
        );

        let prompt = template.render(&context, query);
        Ok(PreparedPrompt { prompt, context })
    }
}

/// Full question answering over a corpus and its embedding store.
pub struct QueryEngine<'a> {
    retriever: Retriever<'a>,
    completer: &'a dyn CompletionProvider,
    params: CompletionParams,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        retriever: Retriever<'a>,
        completer: &'a dyn CompletionProvider,
        params: CompletionParams,
    ) -> Self {
        Self {
            retriever,
            completer,
            params,
        }
    }

    pub fn retriever(&self) -> &Retriever<'a> {
        &self.retriever
    }

    /// Answer `query` from the passages in `corpus`.
    ///
    /// With `emit_prompt` the rendered prompt is logged at `info` level;
    /// otherwise at `debug`.
    pub async fn answer(
        &self,
        query: &str,
        corpus: &Corpus,
        store: &EmbeddingStore,
        template: &PromptTemplate,
        emit_prompt: bool,
    ) -> Result<Answer> {
        let PreparedPrompt { prompt, context } = self
            .retriever
            .construct_prompt(query, corpus, store, template)
            .await?;

        if emit_prompt {
            tracing::info!("prompt:\n{}", prompt);
        } else {
            tracing::debug!("prompt:\n{}", prompt);
        }

        let completion = self.completer.complete(&prompt, &self.params).await?;
        let text = completion
            .text
            .trim_matches(|c| c == ' ' || c == '\n')
            .to_string();

        Ok(Answer {
            text,
            prompt,
            context,
        })
    }
}
