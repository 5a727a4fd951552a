//! SQLite connections for collection files.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// File name of the index inside a collection directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Open (creating if needed) the SQLite file at `db_path`.
pub async fn connect(db_path: &Path) -> sqlx::Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    open(db_path, true).await
}

/// Open an SQLite file that must already exist.
pub async fn connect_existing(db_path: &Path) -> sqlx::Result<SqlitePool> {
    open(db_path, false).await
}

async fn open(db_path: &Path, create: bool) -> sqlx::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}
