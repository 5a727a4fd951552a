//! In-memory [`VectorIndex`] for tests and ephemeral collections.
//!
//! Stores chunks and vectors in a `Vec` behind `std::sync::RwLock`.
//! Queries are brute-force cosine similarity over every stored vector.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{Chunk, ScoredChunk};

use super::{rank, VectorIndex};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    name: String,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn poisoned(&self, operation: &str) -> Error {
        Error::storage(&self.name, operation, "index lock poisoned")
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, chunk: &Chunk, vector: &[f32]) -> Result<()> {
        let mut chunks = self.chunks.write().map_err(|_| self.poisoned("add"))?;
        chunks.retain(|sc| sc.chunk.id != chunk.id);
        chunks.push(StoredChunk {
            chunk: chunk.clone(),
            vector: vector.to_vec(),
        });
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize, threshold: f32) -> Result<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().map_err(|_| self.poisoned("query"))?;
        let candidates = chunks.iter().map(|sc| ScoredChunk {
            chunk: sc.chunk.clone(),
            score: cosine_similarity(vector, &sc.vector),
        });
        Ok(rank(candidates, k, threshold))
    }

    async fn count(&self) -> Result<usize> {
        let chunks = self.chunks.read().map_err(|_| self.poisoned("count"))?;
        Ok(chunks.len())
    }
}
