//! Interactive chat shell.
//!
//! A rustyline REPL bound to one [`Session`]. Lines starting with `/` are
//! commands; anything else is a question for the active collection.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/upload <pdf>` | Ingest a PDF (or reuse its collection) and make it active |
//! | `/select <name>` | Make an existing collection active |
//! | `/list` | List collections, `*` marks the active one |
//! | `/delete [name]` | Delete a collection (default: the active one) |
//! | `/reset` | Clear the active collection's history |
//! | `/history` | Show the active collection's history |
//! | `/sources` | Show the passages retrieved for the last answer |
//! | `/help` | Show this table |
//! | `/quit` | Leave |

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use docchat_core::chat::Assistant;
use docchat_core::embedding::Embedder;
use docchat_core::history::Session;
use docchat_core::models::ScoredChunk;
use docchat_core::stream::ChatModel;
use docchat_core::Error;

use crate::collections::{CollectionStore, IngestStatus};
use crate::progress::ProgressMode;

const COMMANDS: [&str; 9] = [
    "/upload", "/select", "/list", "/delete", "/reset", "/history", "/sources", "/help", "/quit",
];

const HELP: &str = "\
/upload <pdf>     ingest a PDF and make it the active collection
/select <name>    make an existing collection active
/list             list collections (* = active)
/delete [name]    delete a collection (default: the active one)
/reset            clear the active collection's history
/history          show the active collection's history
/sources          show the passages behind the last answer
/help             show this help
/quit             leave
Anything else is a question about the active collection.";

/// A parsed shell line.
#[derive(Debug, PartialEq)]
pub enum ShellCommand {
    Upload(PathBuf),
    Select(String),
    List,
    Delete(Option<String>),
    Reset,
    History,
    Sources,
    Help,
    Quit,
    Ask(String),
    /// A known command used without its required argument.
    MissingArgument(&'static str),
    Unknown(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<ShellCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(ShellCommand::Ask(line.to_string()));
    }

    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };
    let arg = (!arg.is_empty()).then(|| arg.to_string());

    Some(match (cmd, arg) {
        ("/upload", Some(path)) => ShellCommand::Upload(PathBuf::from(unquote(&path))),
        ("/upload", None) => ShellCommand::MissingArgument("/upload <pdf>"),
        ("/select", Some(name)) => ShellCommand::Select(name),
        ("/select", None) => ShellCommand::MissingArgument("/select <name>"),
        ("/list", _) => ShellCommand::List,
        ("/delete", name) => ShellCommand::Delete(name),
        ("/reset", _) => ShellCommand::Reset,
        ("/history", _) => ShellCommand::History,
        ("/sources", _) => ShellCommand::Sources,
        ("/help", _) => ShellCommand::Help,
        ("/quit" | "/exit", _) => ShellCommand::Quit,
        (other, _) => ShellCommand::Unknown(other.to_string()),
    })
}

/// Strip one pair of matching quotes, as left by drag-and-drop in most
/// terminals.
fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

/// Whether the shell keeps reading input.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell<'a> {
    store: &'a CollectionStore,
    embedder: &'a dyn Embedder,
    model: &'a dyn ChatModel,
    persona: String,
    progress: ProgressMode,
    session: Session,
    last_sources: Vec<ScoredChunk>,
}

impl<'a> Shell<'a> {
    pub fn new(
        store: &'a CollectionStore,
        embedder: &'a dyn Embedder,
        model: &'a dyn ChatModel,
        persona: &str,
        progress: ProgressMode,
    ) -> Self {
        Self {
            store,
            embedder,
            model,
            persona: persona.to_string(),
            progress,
            session: Session::new(),
            last_sources: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the REPL until `/quit` or end of input.
    pub async fn run(&mut self, initial: Option<&str>) -> Result<()> {
        let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(CliHelper::new(self.collection_names())));

        let mut stdout = std::io::stdout();
        println!("{}", "=== docchat ===".bright_magenta().bold());
        println!("{}", "Type /help for commands, /quit to exit.".bright_black());
        if let Some(name) = initial {
            self.execute(ShellCommand::Select(name.to_string()), &mut stdout)
                .await?;
        }

        loop {
            let prompt = match self.session.active_name() {
                Some(name) => format!("{}> ", name),
                None => "docchat> ".to_string(),
            };
            match rl.readline(&prompt) {
                Ok(line) => {
                    let Some(command) = parse_command(&line) else {
                        continue;
                    };
                    let _ = rl.add_history_entry(line.trim());
                    if self.execute(command, &mut stdout).await? == Flow::Quit {
                        break;
                    }
                    let names = self.collection_names();
                    if let Some(helper) = rl.helper_mut() {
                        helper.collections = names;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{}", format!("Error: {}", err).red());
                    break;
                }
            }
        }
        println!("{}", "Goodbye!".bright_green());
        Ok(())
    }

    fn collection_names(&self) -> Vec<String> {
        self.store
            .list()
            .map(|names| names.into_iter().collect())
            .unwrap_or_default()
    }

    /// Perform one command, writing user-facing output to `out`.
    ///
    /// Failures of the command itself are reported on `out`; only write
    /// errors are returned.
    pub async fn execute(&mut self, command: ShellCommand, out: &mut dyn Write) -> Result<Flow> {
        match command {
            ShellCommand::Upload(path) => self.upload(path, out).await?,
            ShellCommand::Select(name) => self.select(&name, out).await?,
            ShellCommand::List => self.list(out)?,
            ShellCommand::Delete(name) => self.delete(name, out)?,
            ShellCommand::Reset => match self.session.active_name().map(str::to_string) {
                Some(name) => {
                    self.session.reset(&name);
                    self.last_sources.clear();
                    writeln!(out, "{}", format!("History of '{}' cleared.", name).green())?;
                }
                None => no_active(out)?,
            },
            ShellCommand::History => self.history(out)?,
            ShellCommand::Sources => self.sources(out)?,
            ShellCommand::Help => writeln!(out, "{}", HELP)?,
            ShellCommand::Quit => return Ok(Flow::Quit),
            ShellCommand::Ask(question) => self.ask(&question, out).await?,
            ShellCommand::MissingArgument(usage) => {
                writeln!(out, "{}", format!("Usage: {}", usage).yellow())?
            }
            ShellCommand::Unknown(cmd) => writeln!(
                out,
                "{}",
                format!("Unknown command {}. Type /help.", cmd).yellow()
            )?,
        }
        out.flush()?;
        Ok(Flow::Continue)
    }

    async fn upload(&mut self, path: PathBuf, out: &mut dyn Write) -> Result<()> {
        let reporter = self.progress.reporter();
        let ingested = match self
            .store
            .ingest_file(&path, self.embedder, reporter.as_ref())
            .await
        {
            Ok(ingested) => ingested,
            Err(e) => return report(out, &e),
        };

        let name = ingested.handle.name().to_string();
        match ingested.status {
            IngestStatus::Created => writeln!(
                out,
                "{}",
                format!("Collection '{}' created and selected.", name).green()
            )?,
            IngestStatus::AlreadyExists => writeln!(
                out,
                "{}",
                format!("Collection '{}' already exists; selected it.", name).green()
            )?,
        }
        if let Err(e) = ingested.handle.check_embedder(self.embedder).await {
            return report(out, &e);
        }
        self.session.activate(ingested.handle.index());
        self.last_sources.clear();
        Ok(())
    }

    async fn select(&mut self, name: &str, out: &mut dyn Write) -> Result<()> {
        match self.store.load(name).await {
            Ok(handle) => {
                if let Err(e) = handle.check_embedder(self.embedder).await {
                    return report(out, &e);
                }
                self.session.activate(handle.index());
                self.last_sources.clear();
                writeln!(out, "{}", format!("Collection '{}' selected.", name).green())?;
                Ok(())
            }
            Err(Error::NotFound { .. }) => {
                writeln!(
                    out,
                    "{}",
                    format!("No collection named '{}'. Use /list.", name).yellow()
                )?;
                Ok(())
            }
            Err(e) => report(out, &e),
        }
    }

    fn list(&self, out: &mut dyn Write) -> Result<()> {
        let names = match self.store.list() {
            Ok(names) => names,
            Err(e) => return report(out, &e),
        };
        if names.is_empty() {
            writeln!(out, "{}", "No collections yet. Use /upload <pdf>.".bright_black())?;
            return Ok(());
        }
        let active = self.session.active_name();
        for name in names {
            if Some(name.as_str()) == active {
                writeln!(out, "* {}", name.bright_cyan())?;
            } else {
                writeln!(out, "  {}", name)?;
            }
        }
        Ok(())
    }

    fn delete(&mut self, name: Option<String>, out: &mut dyn Write) -> Result<()> {
        let Some(name) = name.or_else(|| self.session.active_name().map(str::to_string)) else {
            writeln!(out, "{}", "Usage: /delete <name> (no collection is active)".yellow())?;
            return Ok(());
        };

        let was_active = self.session.active_name() == Some(name.as_str());
        // Releases the index handle before its files go away.
        self.session.forget(&name);
        if was_active {
            self.last_sources.clear();
        }

        match self.store.delete(&name) {
            Ok(()) => {
                writeln!(out, "{}", format!("Collection '{}' deleted.", name).green())?;
                if was_active {
                    writeln!(
                        out,
                        "{}",
                        "No collection is active; /select or /upload one.".bright_black()
                    )?;
                }
                Ok(())
            }
            Err(Error::NotFound { .. }) => {
                writeln!(
                    out,
                    "{}",
                    format!("No collection named '{}'; nothing deleted.", name).yellow()
                )?;
                Ok(())
            }
            Err(e) => report(out, &e),
        }
    }

    fn history(&self, out: &mut dyn Write) -> Result<()> {
        let Some(name) = self.session.active_name() else {
            return no_active(out);
        };
        let entries = self.session.get(name);
        if entries.is_empty() {
            writeln!(out, "{}", "No questions asked yet.".bright_black())?;
        }
        for entry in entries {
            writeln!(
                out,
                "{} {}",
                entry.asked_at.format("[%H:%M:%S]").to_string().bright_black(),
                format!("User: {}", entry.question).green()
            )?;
            writeln!(out, "           Assistant: {}", entry.answer)?;
        }
        Ok(())
    }

    fn sources(&self, out: &mut dyn Write) -> Result<()> {
        if self.last_sources.is_empty() {
            writeln!(out, "{}", "No passages were used for the last answer.".bright_black())?;
            return Ok(());
        }
        for (i, hit) in self.last_sources.iter().enumerate() {
            writeln!(
                out,
                "{}",
                format!(
                    "[{}] page {}, chunk {}, score {:.2}",
                    i + 1,
                    hit.chunk.page + 1,
                    hit.chunk.chunk_index,
                    hit.score
                )
                .bright_magenta()
            )?;
            writeln!(out, "{}", hit.chunk.text.trim())?;
        }
        Ok(())
    }

    async fn ask(&mut self, question: &str, out: &mut dyn Write) -> Result<()> {
        let assistant =
            Assistant::new(self.embedder, self.model).with_persona(self.persona.as_str());
        let mut exchange = match assistant.ask(&self.session, question).await {
            Ok(exchange) => exchange,
            Err(Error::NoActiveCollection) => return no_active(out),
            Err(e) => return report(out, &e),
        };
        self.last_sources = exchange.sources().to_vec();

        while let Some(fragment) = exchange.next_fragment().await {
            match fragment {
                Ok(text) => {
                    write!(out, "{}", text.bright_blue())?;
                    out.flush()?;
                }
                Err(e) => {
                    writeln!(out)?;
                    report(out, &e)?;
                    break;
                }
            }
        }
        writeln!(out)?;

        if let Err(e) = exchange.finish(&mut self.session).await {
            tracing::debug!(error = %e, "exchange not recorded");
            writeln!(
                out,
                "{}",
                "(incomplete answer, not added to history)".bright_black()
            )?;
        }
        Ok(())
    }
}

fn report(out: &mut dyn Write, err: &Error) -> Result<()> {
    writeln!(out, "{}", format!("Error: {}", err).red())?;
    Ok(())
}

fn no_active(out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "{}",
        "No active collection. Use /upload <pdf> or /select <name>.".yellow()
    )?;
    Ok(())
}

/// Completion, hints and highlighting for shell commands and collection
/// names.
struct CliHelper {
    collections: Vec<String>,
}

impl CliHelper {
    fn new(collections: Vec<String>) -> Self {
        Self { collections }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        if let Some((cmd, partial)) = line.split_once(' ') {
            if cmd == "/select" || cmd == "/delete" {
                let start = cmd.len() + 1;
                let candidates = self
                    .collections
                    .iter()
                    .filter(|name| name.starts_with(partial))
                    .map(|name| Pair {
                        display: name.clone(),
                        replacement: name.clone(),
                    })
                    .collect();
                return Ok((start, candidates));
            }
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.starts_with('/') && !line.contains(' ') {
            COMMANDS
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}
