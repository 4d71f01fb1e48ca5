//! # Context QA Core
//!
//! The retrieval engine behind `context-qa`: passage models, the embedding
//! store and its CSV persistence, similarity ranking, greedy context
//! assembly, prompt rendering, and the query orchestrator.
//!
//! This crate performs no network I/O and carries no async runtime. The
//! embedding and completion providers are injected through the traits in
//! [`embedding`] and [`completion`]; the application crate supplies HTTP
//! implementations and tests supply deterministic fakes.
//!
//! ## Pipeline
//!
//! ```text
//! query ──▶ EmbeddingProvider ──▶ rank() ──▶ assemble() ──▶ PromptTemplate ──▶ CompletionProvider
//!                                   ▲            ▲
//!                            EmbeddingStore    Corpus
//! ```

pub mod answer;
pub mod completion;
pub mod context;
pub mod embedding;
pub mod error;
pub mod models;
pub mod prompt;
pub mod rank;
pub mod store;
pub mod tokens;

pub use error::{Error, ProviderError, ProviderErrorKind, Result};
