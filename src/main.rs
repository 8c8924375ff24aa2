//! # corpus-rag CLI (`crag`)
//!
//! ```bash
//! crag --config ./config/crag.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crag ingest <file>` | Chunk, embed and index a corpus file |
//! | `crag search "<query>"` | Print the most similar chunks |
//! | `crag ask "<question>"` | Answer a question from the indexed corpus |
//! | `crag session` | Interactive search and question loop |
//! | `crag status` | Show what is indexed |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corpus_rag::config;
use corpus_rag::progress::ProgressMode;
use corpus_rag::{answer, ingest, search, session, status};

/// corpus-rag: retrieval-augmented question answering over a text corpus.
#[derive(Parser)]
#[command(
    name = "crag",
    about = "Chunk, embed and search a text corpus, and answer questions from it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/crag.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Ingestion progress on stderr. Defaults to `human` on a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus file.
    ///
    /// The file is read whole, split into chunks and embedded. Existing
    /// artifacts are replaced only after every chunk has been embedded.
    Ingest {
        /// Path to the corpus text file.
        corpus: PathBuf,
    },

    /// Search the index for chunks similar to a query.
    Search {
        query: String,

        /// Number of results (defaults to `[retrieval].search_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question using the most relevant chunks as context.
    Ask { question: String },

    /// Start an interactive session.
    ///
    /// Plain input searches; input starting with `?` asks a question.
    Session {
        /// Corpus to ingest first when no index exists.
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Show index location, model and size.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "corpus_rag=debug"
    } else {
        "corpus_rag=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = config::load_config(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Ingest { corpus } => {
            ingest::run_ingest(&cfg, &corpus, progress).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Ask { question } => {
            answer::run_ask(&cfg, &question).await?;
        }
        Commands::Session { corpus } => {
            session::run_session(&cfg, corpus.as_deref(), progress).await?;
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
    }

    Ok(())
}
