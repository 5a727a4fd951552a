//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the only view the retrieval pipeline has of
//! a collection's stored chunks, enabling pluggable backends (the SQLite
//! collections of the app crate, the in-memory index used in tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, ScoredChunk};

/// Abstract storage of chunks and their embedding vectors.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorIndex::add) | Store one chunk with its vector |
/// | [`query`](VectorIndex::query) | Top-k cosine similarity search above a threshold |
/// | [`count`](VectorIndex::count) | Number of stored chunks |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the collection this index belongs to.
    fn name(&self) -> &str;

    /// Store a chunk together with its embedding vector.
    async fn add(&self, chunk: &Chunk, vector: &[f32]) -> Result<()>;

    /// Return at most `k` chunks whose similarity to `vector` is at least
    /// `threshold`, most similar first.
    async fn query(&self, vector: &[f32], k: usize, threshold: f32) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<usize>;
}

/// Apply threshold, ordering and limit to scored candidates.
///
/// Candidates scoring below `threshold` (or NaN) are dropped. The rest are
/// sorted by score descending, ties broken by chunk index ascending, and
/// truncated to `k`.
pub fn rank(
    candidates: impl IntoIterator<Item = ScoredChunk>,
    k: usize,
    threshold: f32,
) -> Vec<ScoredChunk> {
    let mut hits: Vec<ScoredChunk> = candidates
        .into_iter()
        .filter(|c| c.score >= threshold)
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(index: i64, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: format!("c{}", index),
                chunk_index: index,
                page: 0,
                text: format!("chunk {}", index),
                hash: String::new(),
            },
            score,
        }
    }

    #[test]
    fn test_rank_filters_sorts_and_truncates() {
        let hits = rank(
            vec![
                scored(0, 0.2),
                scored(1, 0.9),
                scored(2, 0.5),
                scored(3, f32::NAN),
                scored(4, 0.7),
            ],
            2,
            0.5,
        );
        let order: Vec<i64> = hits.iter().map(|h| h.chunk.chunk_index).collect();
        assert_eq!(order, vec![1, 4]);
    }

    #[test]
    fn test_rank_threshold_is_inclusive_and_ties_use_index() {
        let hits = rank(vec![scored(5, 0.5), scored(2, 0.5)], 5, 0.5);
        let order: Vec<i64> = hits.iter().map(|h| h.chunk.chunk_index).collect();
        assert_eq!(order, vec![2, 5]);
    }
}
