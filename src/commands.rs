//! One-shot CLI commands.
//!
//! Each `run_*` function backs one `docchat` subcommand. Results go to
//! stdout; progress, warnings and errors go to stderr.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use docchat_core::chat::Assistant;
use docchat_core::history::Session;
use docchat_core::Error;

use crate::collections::{CollectionStore, IngestStatus};
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::llm::create_chat_model;
use crate::progress::ProgressMode;
use crate::shell::Shell;

fn open_store(config: &Config) -> Result<CollectionStore> {
    CollectionStore::open(&config.storage.base_dir).with_context(|| {
        format!(
            "Failed to open collection store at {}",
            config.storage.base_dir.display()
        )
    })
}

/// `docchat ingest <pdf>`
pub async fn run_ingest(config: &Config, path: &Path, progress: ProgressMode) -> Result<()> {
    let store = open_store(config)?;
    let embedder = create_embedder(&config.embedding)?;
    let reporter = progress.reporter();

    let ingested = store
        .ingest_file(path, embedder.as_ref(), reporter.as_ref())
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))?;
    let info = ingested.handle.info().await?;

    match ingested.status {
        IngestStatus::Created => println!(
            "Created collection '{}' ({} chunks)",
            info.name, info.chunks
        ),
        IngestStatus::AlreadyExists => println!(
            "Collection '{}' already exists ({} chunks); nothing to do",
            info.name, info.chunks
        ),
    }
    Ok(())
}

/// `docchat list`
pub async fn run_list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let names = store.list()?;
    if names.is_empty() {
        println!("No collections.");
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

/// `docchat info <name>`
pub async fn run_info(config: &Config, name: &str, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let info = store.info(name).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("name:             {}", info.name);
    println!("source file:      {}", info.source_file);
    println!("chunks:           {}", info.chunks);
    println!("embedding model:  {}", info.embedding_model);
    println!("dimensions:       {}", info.dims);
    println!("created at:       {}", info.created_at);
    Ok(())
}

/// `docchat delete <name>`. A missing collection is reported, not an error.
pub async fn run_delete(config: &Config, name: &str) -> Result<()> {
    let store = open_store(config)?;
    match store.delete(name) {
        Ok(()) => println!("Deleted collection '{}'", name),
        Err(Error::NotFound { .. }) => {
            println!("Collection '{}' not found; nothing deleted", name)
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// `docchat ask <collection> <question>`: stream one answer to stdout.
pub async fn run_ask(
    config: &Config,
    collection: &str,
    question: &str,
    show_sources: bool,
) -> Result<()> {
    let store = open_store(config)?;
    let handle = store.load(collection).await?;
    let embedder = create_embedder(&config.embedding)?;
    let model = create_chat_model(&config.llm)?;
    handle.check_embedder(embedder.as_ref()).await?;

    let mut session = Session::new();
    session.activate(handle.index());
    let assistant =
        Assistant::new(embedder.as_ref(), model.as_ref()).with_persona(&config.chat.persona);

    let mut exchange = assistant.ask(&session, question).await?;
    let mut stdout = std::io::stdout();
    while let Some(fragment) = exchange.next_fragment().await {
        match fragment {
            Ok(text) => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            Err(e) => {
                writeln!(stdout)?;
                return Err(e.into());
            }
        }
    }
    writeln!(stdout)?;

    if show_sources {
        for (i, hit) in exchange.sources().iter().enumerate() {
            eprintln!(
                "[{}] page {} (score {:.2})",
                i + 1,
                hit.chunk.page + 1,
                hit.score
            );
        }
    }
    exchange.finish(&mut session).await?;
    Ok(())
}

/// `docchat chat [collection]`: start the interactive shell.
pub async fn run_chat(config: &Config, collection: Option<&str>, progress: ProgressMode) -> Result<()> {
    let store = open_store(config)?;
    let embedder = create_embedder(&config.embedding)?;
    let model = create_chat_model(&config.llm)?;

    let mut shell = Shell::new(
        &store,
        embedder.as_ref(),
        model.as_ref(),
        &config.chat.persona,
        progress,
    );
    shell.run(collection).await
}
