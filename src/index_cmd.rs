//! `cqa index`: batch-embed the corpus and persist the embedding store.
//!
//! One embedding call per passage, each gated by the configured
//! [`RateLimiter`]. The store is written only after every passage has been
//! embedded; any provider error aborts the run and leaves an existing store
//! file untouched.

use anyhow::{bail, Context, Result};
use context_qa_core::embedding::EmbeddingProvider;
use context_qa_core::models::Passage;
use context_qa_core::store::EmbeddingStore;

use crate::config::Config;
use crate::corpus::load_corpus;
use crate::embedding::create_embedder;
use crate::progress::{IndexProgressEvent, IndexProgressReporter, ProgressMode};
use crate::rate_limit::{limiter_for, RateLimiter};

pub async fn run_index(
    config: &Config,
    limit: Option<usize>,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let corpus = load_corpus(&config.corpus.path)?;
    let take = limit.unwrap_or(corpus.len()).min(corpus.len());
    let passages = &corpus.passages()[..take];

    if dry_run {
        println!("index (dry-run)");
        println!("  corpus passages: {}", corpus.len());
        println!("  passages to embed: {}", passages.len());
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let embedder = create_embedder(&config.embedding)?;
    let limiter = limiter_for(config.indexing.min_interval_ms);
    let reporter = progress.reporter();

    let store = embed_passages(passages, embedder.as_ref(), limiter.as_ref(), reporter.as_ref())
        .await?;

    if let Some(parent) = config.store.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }
    }
    store
        .save(&config.store.path)
        .with_context(|| format!("Failed to write store: {}", config.store.path.display()))?;
    reporter.report(IndexProgressEvent::Saved {
        path: config.store.path.display().to_string(),
        vectors: store.len() as u64,
    });

    tracing::info!(
        model = embedder.model_name(),
        vectors = store.len(),
        "embedding store written"
    );

    println!("index");
    println!("  model: {}", embedder.model_name());
    println!("  embedded: {}", store.len());
    println!("  dims: {}", store.dims().unwrap_or(0));
    println!("  store: {}", config.store.path.display());
    Ok(())
}

/// Embed each passage's content and collect the vectors into a new store.
///
/// Fails on the first provider or dimension error; nothing is returned
/// for a partial run.
pub async fn embed_passages(
    passages: &[Passage],
    embedder: &dyn EmbeddingProvider,
    limiter: &dyn RateLimiter,
    reporter: &dyn IndexProgressReporter,
) -> Result<EmbeddingStore> {
    let total = passages.len() as u64;
    reporter.report(IndexProgressEvent::Started { total });

    let mut keys = Vec::with_capacity(passages.len());
    let mut vectors = Vec::with_capacity(passages.len());

    for (i, passage) in passages.iter().enumerate() {
        limiter.acquire().await;
        let vector = embedder
            .embed(&passage.content)
            .await
            .with_context(|| format!("Failed to embed passage {}", passage.key))?;
        tracing::debug!(key = %passage.key, dims = vector.len(), "embedded passage");

        keys.push(passage.key.clone());
        vectors.push(vector);
        reporter.report(IndexProgressEvent::Embedding {
            n: i as u64 + 1,
            total,
        });
    }

    let mut store = EmbeddingStore::with_dims(embedder.dims());
    store.put_all(keys, vectors)?;

    let off = store.non_unit_count();
    if off > 0 {
        tracing::warn!(
            vectors = off,
            "provider returned vectors that are not unit length; consider similarity = \"cosine\""
        );
    }
    Ok(store)
}
