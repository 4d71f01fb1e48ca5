//! # Context QA CLI (`cqa`)
//!
//! ## Usage
//!
//! ```bash
//! cqa --config ./config/cqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cqa index` | Embed every corpus passage and write the embedding store |
//! | `cqa search "<query>"` | Rank passages against a query |
//! | `cqa prompt "<query>"` | Render the prompt without calling the completion provider |
//! | `cqa ask "<query>"` | Answer a question from the corpus |
//! | `cqa completions <shell>` | Print a shell completion script |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).
//! Answers, prompts and search results go to stdout.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use context_qa::progress::ProgressMode;
use context_qa::{config, index_cmd, query};

/// Context QA: answer questions from a pre-indexed passage corpus.
///
/// All commands except `completions` read a TOML configuration file.
/// See `config/cqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cqa",
    about = "Retrieval-augmented question answering over a pre-indexed passage corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed corpus passages and write the embedding store.
    ///
    /// Calls the embedding provider once per passage, paced by
    /// `[indexing] min_interval_ms`. The store file is only written when
    /// every passage was embedded.
    Index {
        /// Only embed the first N passages.
        #[arg(long)]
        limit: Option<usize>,

        /// Show passage counts without calling the provider.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a terminal, otherwise `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Rank stored passages against a query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Print the prompt that `ask` would submit.
    Prompt {
        /// The question.
        query: String,
    },

    /// Answer a question from the corpus.
    Ask {
        /// The question.
        query: String,

        /// Log the rendered prompt at info level.
        #[arg(long)]
        show_prompt: bool,
    },

    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "cqa", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index {
            limit,
            dry_run,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            index_cmd::run_index(&cfg, limit, dry_run, mode).await?;
        }
        Commands::Search { query, limit } => {
            query::run_search(&cfg, &query, limit).await?;
        }
        Commands::Prompt { query } => {
            query::run_prompt(&cfg, &query).await?;
        }
        Commands::Ask { query, show_prompt } => {
            query::run_ask(&cfg, &query, show_prompt).await?;
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}
