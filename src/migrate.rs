//! Schema of a collection's `index.sqlite`.

use sqlx::SqlitePool;

/// Stored under the `schema_version` meta key; collections written with a
/// different version refuse to load.
pub const SCHEMA_VERSION: i64 = 1;

pub async fn create_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            chunk_index INTEGER NOT NULL UNIQUE,
            page INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?)")
        .bind(SCHEMA_VERSION.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Check that `pool` holds a collection this build can read.
///
/// Returns a human-readable reason on mismatch.
pub async fn verify_schema(pool: &SqlitePool) -> Result<(), String> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('meta', 'chunks')",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| e.to_string())?;

    for required in ["meta", "chunks"] {
        if !tables.iter().any(|t| t == required) {
            return Err(format!("missing table '{}'", required));
        }
    }

    let version: Option<String> =
        sqlx::query_scalar("SELECT value FROM meta WHERE key = 'schema_version'")
            .fetch_optional(pool)
            .await
            .map_err(|e| e.to_string())?;

    match version.as_deref().map(str::parse::<i64>) {
        Some(Ok(v)) if v == SCHEMA_VERSION => Ok(()),
        Some(Ok(v)) => Err(format!(
            "schema version {} is not supported (expected {})",
            v, SCHEMA_VERSION
        )),
        Some(Err(_)) => Err("schema version is not a number".to_string()),
        None => Err("schema version missing".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_then_verify() {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("index.sqlite")).await.unwrap();
        create_schema(&pool).await.unwrap();
        // Idempotent.
        create_schema(&pool).await.unwrap();
        assert!(verify_schema(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_rejects_empty_database() {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("index.sqlite")).await.unwrap();
        let reason = verify_schema(&pool).await.unwrap_err();
        assert!(reason.contains("missing table"));
    }

    #[tokio::test]
    async fn test_verify_rejects_other_version() {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("index.sqlite")).await.unwrap();
        create_schema(&pool).await.unwrap();
        sqlx::query("UPDATE meta SET value = '99' WHERE key = 'schema_version'")
            .execute(&pool)
            .await
            .unwrap();
        let reason = verify_schema(&pool).await.unwrap_err();
        assert!(reason.contains("99"));
    }
}
