//! SQLite-backed [`VectorIndex`] for one persisted collection.
//!
//! Vectors live next to the chunk text in the `chunks` table as
//! little-endian f32 BLOBs. Queries score every row with cosine similarity;
//! a collection holds a single document, so a linear scan is enough.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use docchat_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docchat_core::index::{rank, VectorIndex};
use docchat_core::models::{Chunk, ScoredChunk};
use docchat_core::{Error, Result};

pub struct SqliteIndex {
    name: String,
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(name: impl Into<String>, pool: SqlitePool) -> Self {
        Self {
            name: name.into(),
            pool,
        }
    }

    /// Insert or replace metadata entries.
    pub async fn write_meta(&self, entries: &[(&str, String)]) -> Result<()> {
        for (key, value) in entries {
            sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::storage(&self.name, "writing metadata", e))?;
        }
        Ok(())
    }

    pub async fn read_meta(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT key, value FROM meta")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage(&self.name, "reading metadata", e))?;
        rows.iter()
            .map(|row| -> sqlx::Result<(String, String)> {
                Ok((row.try_get("key")?, row.try_get("value")?))
            })
            .collect::<sqlx::Result<HashMap<_, _>>>()
            .map_err(|e| Error::storage(&self.name, "reading metadata", e))
    }

    /// Close the connection pool, flushing the WAL into the main file.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, chunk: &Chunk, vector: &[f32]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, chunk_index, page, text, hash, embedding)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(chunk.chunk_index)
        .bind(chunk.page)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(vec_to_blob(vector))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(&self.name, format!("storing chunk {}", chunk.chunk_index), e))?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize, threshold: f32) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            "SELECT id, chunk_index, page, text, hash, embedding FROM chunks ORDER BY chunk_index",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage(&self.name, "similarity search", e))?;

        let candidates = rows
            .iter()
            .map(|row| -> sqlx::Result<ScoredChunk> {
                let blob: Vec<u8> = row.try_get("embedding")?;
                Ok(ScoredChunk {
                    score: cosine_similarity(vector, &blob_to_vec(&blob)),
                    chunk: Chunk {
                        id: row.try_get("id")?,
                        chunk_index: row.try_get("chunk_index")?,
                        page: row.try_get("page")?,
                        text: row.try_get("text")?,
                        hash: row.try_get("hash")?,
                    },
                })
            })
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(|e| Error::storage(&self.name, "similarity search", e))?;

        Ok(rank(candidates, k, threshold))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::storage(&self.name, "counting chunks", e))?;
        Ok(count as usize)
    }
}
