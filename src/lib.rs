//! # Context QA
//!
//! Retrieval-augmented question answering over a pre-indexed passage corpus.
//!
//! The retrieval engine itself (embedding store, ranker, context assembler,
//! prompt rendering, query orchestration) lives in `context-qa-core`. This
//! crate adds everything needed to run it: configuration, the corpus
//! loader, HTTP provider clients, rate limiting, and the `cqa` commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Corpus CSV  │──▶│  cqa index   │──▶│ Embedding CSV│
//! │ title/head. │   │ embed+gate   │   │ title,head,0…│
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!          query ──▶ embed ──▶ rank ──▶ assemble ──▶ prompt ──▶ complete
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cqa index                         # embed the corpus, write the store
//! cqa search "curling gold medal"   # ranked passages with scores
//! cqa prompt "Who won curling?"     # the prompt, without completion
//! cqa ask "Who won curling?"        # full answer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Corpus table loader |
//! | [`embedding`] | OpenAI / Ollama embedding clients |
//! | [`completion`] | OpenAI / Ollama completion clients |
//! | [`http`] | Status mapping, retry and backoff |
//! | [`rate_limit`] | Fixed-interval gate for indexing |
//! | [`progress`] | Index progress reporting |
//! | [`tokens`] | Token counter selection |
//! | [`session`] | Loaded corpus, store and query settings |
//! | [`index_cmd`] | `cqa index` |
//! | [`query`] | `cqa search`, `cqa prompt`, `cqa ask` |

pub mod completion;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod http;
pub mod index_cmd;
pub mod progress;
pub mod query;
pub mod rate_limit;
pub mod session;
pub mod tokens;
