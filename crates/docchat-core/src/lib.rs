//! # docchat core
//!
//! Storage-agnostic, network-free logic for docchat: data models, the
//! document chunker, capability traits for embedding, vector indexing and
//! chat models, retrieval, prompt assembly, response streams, and the
//! per-session conversation history.
//!
//! This crate contains no sqlx, reqwest, or filesystem I/O. Concrete
//! adapters (SQLite collections, OpenAI/Ollama providers) live in the
//! `docchat` application crate.
//!
//! ## Pipeline
//!
//! ```text
//! pages ──▶ chunk ──▶ Embedder ──▶ VectorIndex
//!                                       │
//! question ──▶ retrieve ◀───────────────┘
//!                 │
//!                 ▼
//!   History ──▶ prompt ──▶ ChatModel ──▶ ResponseStream ──▶ History
//! ```

pub mod chat;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod history;
pub mod index;
pub mod models;
pub mod prompt;
pub mod retrieve;
pub mod stream;

pub use error::{Error, Result};
