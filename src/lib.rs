//! # docchat
//!
//! Chat with your PDF documents.
//!
//! Every uploaded PDF becomes a **collection**: its text is chunked,
//! embedded and stored in a per-collection SQLite index. Questions are
//! answered by a language model from the most similar passages and the
//! conversation so far, streamed fragment by fragment.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────────────────┐
//! │   PDF    │──▶│ extract +    │──▶│ <base_dir>/<name>/     │
//! │  upload  │   │ chunk+embed  │   │   index.sqlite         │
//! └──────────┘   └──────────────┘   └───────────┬────────────┘
//!                                               │ retrieve (k=5, ≥0.5)
//!                                               ▼
//!                ┌──────────┐   ┌────────────────────────────┐
//!                │  shell / │◀──│ prompt (history + context) │
//!                │   CLI    │   │ ──▶ streamed chat model    │
//!                └──────────┘   └────────────────────────────┘
//! ```
//!
//! The storage- and network-free pieces (chunking, retrieval, prompt,
//! streaming, session history) live in `docchat-core`; this crate wires
//! them to SQLite, HTTP providers and the terminal.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`collections`] | Persisted collections: create, load, delete, list |
//! | [`sqlite_index`] | SQLite-backed vector index |
//! | [`db`] | Database connection |
//! | [`migrate`] | Collection schema |
//! | [`extract`] | PDF text extraction |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Streaming chat model providers |
//! | [`progress`] | Ingestion progress reporting |
//! | [`shell`] | Interactive REPL |
//! | [`commands`] | One-shot CLI commands |

pub mod collections;
pub mod commands;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod llm;
pub mod migrate;
pub mod progress;
pub mod shell;
pub mod sqlite_index;
