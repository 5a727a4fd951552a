//! # docchat CLI
//!
//! Chat with your PDFs. Each uploaded PDF becomes a persisted collection of
//! embedded chunks; questions are answered by a language model from the
//! passages most similar to the question, streamed as they arrive.
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat chat [collection]` | Interactive shell (upload, select, ask) |
//! | `docchat ingest <pdf>` | Create a collection from a PDF |
//! | `docchat list` | List collections |
//! | `docchat info <name>` | Show a collection's metadata |
//! | `docchat delete <name>` | Delete a collection |
//! | `docchat ask <collection> "<question>"` | Answer one question and exit |
//!
//! Logging is controlled with `DOCCHAT_LOG` (e.g. `DOCCHAT_LOG=docchat=debug`)
//! and written to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docchat::commands;
use docchat::config;
use docchat::progress::ProgressMode;

/// docchat: retrieval-augmented chat over your PDF documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults. See
/// `config/docchat.example.toml` for every setting.
#[derive(Parser)]
#[command(name = "docchat", version, about = "Chat with your PDF documents")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    /// Ingestion progress on stderr. Defaults to `human` on a terminal,
    /// `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell.
    ///
    /// Optionally selects an existing collection first.
    Chat {
        collection: Option<String>,
    },

    /// Create a collection from a PDF file.
    ///
    /// The collection is named after the file without its extension.
    /// Ingesting a file whose collection already exists does nothing.
    Ingest {
        /// Path to the PDF.
        file: PathBuf,
    },

    /// List collections.
    List,

    /// Show a collection's metadata.
    Info {
        name: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Delete a collection and all of its files.
    Delete {
        name: String,
    },

    /// Answer one question against a collection and exit.
    Ask {
        collection: String,
        question: String,

        /// Print the retrieved passages' pages and scores to stderr.
        #[arg(long)]
        sources: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOCCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_or_default(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Chat { collection } => {
            commands::run_chat(&cfg, collection.as_deref(), progress).await?;
        }
        Commands::Ingest { file } => {
            commands::run_ingest(&cfg, &file, progress).await?;
        }
        Commands::List => {
            commands::run_list(&cfg).await?;
        }
        Commands::Info { name, json } => {
            commands::run_info(&cfg, &name, json).await?;
        }
        Commands::Delete { name } => {
            commands::run_delete(&cfg, &name).await?;
        }
        Commands::Ask {
            collection,
            question,
            sources,
        } => {
            commands::run_ask(&cfg, &collection, &question, sources).await?;
        }
    }

    Ok(())
}
