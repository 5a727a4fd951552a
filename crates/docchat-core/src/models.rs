//! Core data models used throughout docchat.
//!
//! These types represent the chunks, retrieval hits and conversation
//! turns that flow through the ingestion and query pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A contiguous span of a document's text, prepared for embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Random UUID assigned when the chunk is produced.
    pub id: String,
    /// Position in the document, contiguous from 0.
    pub chunk_index: i64,
    /// 0-based page on which the chunk starts.
    pub page: i64,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// A chunk returned by a similarity query, with its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity between the query and the chunk, in `[-1, 1]`.
    pub score: f32,
}

/// One question/answer turn in a collection's conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }
}
