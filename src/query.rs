//! `cqa search`, `cqa prompt` and `cqa ask`.

use anyhow::{bail, Result};
use context_qa_core::answer::{QueryEngine, Retriever};
use context_qa_core::embedding::EmbeddingProvider;
use context_qa_core::models::{Corpus, RankedCandidate};

use crate::completion::create_completer;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::session::Session;

const EXCERPT_CHARS: usize = 160;

/// Print the `limit` best passages for `query` with their scores.
pub async fn run_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    let (session, embedder) = open(config)?;
    let retriever = retriever(&session, embedder.as_ref());
    let hits = retriever.search(query, &session.store, limit).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        print!("{}", format_hit(i + 1, hit, &session.corpus));
    }
    Ok(())
}

/// Print the prompt that `ask` would submit, without calling the completion provider.
pub async fn run_prompt(config: &Config, query: &str) -> Result<()> {
    let (session, embedder) = open(config)?;
    let retriever = retriever(&session, embedder.as_ref());
    let prepared = retriever
        .construct_prompt(query, &session.corpus, &session.store, &session.template)
        .await?;
    println!("{}", prepared.prompt);
    Ok(())
}

/// Answer `query` and print the completion text.
pub async fn run_ask(config: &Config, query: &str, show_prompt: bool) -> Result<()> {
    if !config.completion.is_enabled() {
        bail!("Completion provider is disabled. Set [completion] provider in config.");
    }
    let (session, embedder) = open(config)?;
    let completer = create_completer(&config.completion)?;
    let engine = QueryEngine::new(
        retriever(&session, embedder.as_ref()),
        completer.as_ref(),
        config.completion.params(),
    );

    let answer = engine
        .answer(
            query,
            &session.corpus,
            &session.store,
            &session.template,
            show_prompt,
        )
        .await?;
    println!("{}", answer.text);
    Ok(())
}

fn open(config: &Config) -> Result<(Session, Box<dyn EmbeddingProvider>)> {
    if !config.embedding.is_enabled() {
        bail!("Queries require embeddings. Set [embedding] provider in config.");
    }
    let session = Session::open(config)?;
    let embedder = create_embedder(&config.embedding)?;
    Ok((session, embedder))
}

fn retriever<'a>(session: &Session, embedder: &'a dyn EmbeddingProvider) -> Retriever<'a> {
    Retriever::new(embedder, session.budget.clone()).with_similarity(session.similarity)
}

fn format_hit(rank: usize, hit: &RankedCandidate, corpus: &Corpus) -> String {
    let mut out = format!(
        "{}. [{:.4}] {} / {}\n",
        rank, hit.score, hit.key.title, hit.key.heading
    );
    match corpus.get(&hit.key) {
        Some(passage) => {
            let flat = passage.content.replace('\n', " ");
            let excerpt: String = flat.trim().chars().take(EXCERPT_CHARS).collect();
            out.push_str(&format!("    tokens: {}\n", passage.tokens));
            out.push_str(&format!("    excerpt: \"{}\"\n", excerpt));
        }
        None => out.push_str("    (not in corpus)\n"),
    }
    out.push('\n');
    out
}
