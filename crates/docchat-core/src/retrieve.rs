//! Similarity retrieval over the active collection.
//!
//! Embeds the question with the collection's [`Embedder`] and asks the
//! [`VectorIndex`] for the closest chunks. Both limits are fixed:
//! at most [`RETRIEVAL_K`] chunks, each scoring at least
//! [`SIMILARITY_THRESHOLD`]. An empty result is a normal outcome.

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::models::ScoredChunk;

/// Maximum number of chunks returned per question.
pub const RETRIEVAL_K: usize = 5;

/// Minimum cosine similarity for a chunk to be returned.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// Retrieve the chunks most similar to `question`, most similar first.
///
/// A blank question retrieves nothing and does not call the embedder.
pub async fn retrieve(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    question: &str,
) -> Result<Vec<ScoredChunk>> {
    if question.trim().is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = embedder.embed_one(question).await.map_err(|e| match e {
        Error::Provider { message, .. } => Error::Provider {
            operation: format!("embedding question for '{}'", index.name()),
            message,
        },
        other => other,
    })?;

    let hits = index
        .query(&query_vec, RETRIEVAL_K, SIMILARITY_THRESHOLD)
        .await?;
    tracing::debug!(
        collection = index.name(),
        hits = hits.len(),
        "retrieved context"
    );
    Ok(hits)
}
