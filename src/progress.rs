//! Ingestion progress reporting.
//!
//! Reports observable progress while a PDF is turned into a collection so
//! users see how many chunks are left to embed. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for one ingestion.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestProgressEvent {
    /// Text is being extracted and chunked. Total unknown.
    Extracting { collection: String },
    /// `n` of `total` chunks embedded and stored.
    Embedding {
        collection: String,
        n: u64,
        total: u64,
    },
    /// The collection is complete and visible.
    Done { collection: String, chunks: u64 },
}

impl IngestProgressEvent {
    /// Completed share in `[0.0, 1.0]`, when known.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            IngestProgressEvent::Extracting { .. } => None,
            IngestProgressEvent::Embedding { n, total, .. } => {
                if *total == 0 {
                    Some(1.0)
                } else {
                    Some(*n as f64 / *total as f64)
                }
            }
            IngestProgressEvent::Done { .. } => Some(1.0),
        }
    }
}

/// Reports ingestion progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest policy  embedding  12 / 40 chunks (30%)".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Extracting { collection } => {
                format!("ingest {}  extracting text...\n", collection)
            }
            IngestProgressEvent::Embedding {
                collection,
                n,
                total,
            } => {
                let pct = event.fraction().unwrap_or(0.0) * 100.0;
                format!(
                    "ingest {}  embedding  {} / {} chunks ({:.0}%)\n",
                    collection,
                    format_number(*n),
                    format_number(*total),
                    pct
                )
            }
            IngestProgressEvent::Done { collection, chunks } => {
                format!(
                    "ingest {}  done  {} chunks\n",
                    collection,
                    format_number(*chunks)
                )
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Extracting { collection } => serde_json::json!({
                "event": "progress",
                "collection": collection,
                "phase": "extracting"
            }),
            IngestProgressEvent::Embedding {
                collection,
                n,
                total,
            } => serde_json::json!({
                "event": "progress",
                "collection": collection,
                "phase": "embedding",
                "n": n,
                "total": total,
                "fraction": event.fraction()
            }),
            IngestProgressEvent::Done { collection, chunks } => serde_json::json!({
                "event": "progress",
                "collection": collection,
                "phase": "done",
                "chunks": chunks
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
