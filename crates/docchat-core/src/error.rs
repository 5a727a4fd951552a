//! Error taxonomy shared by every docchat component.
//!
//! Provider and storage failures carry the collection name and the
//! operation that failed so they can be shown to the user as-is.

use thiserror::Error;

/// Convenience alias used throughout the core crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A collection with this name already exists on disk.
    ///
    /// Ingestion treats this as a successful no-op and reuses the
    /// existing collection.
    #[error("collection '{name}' already exists")]
    AlreadyExists { name: String },

    /// The persisted collection exists but could not be opened.
    #[error("failed to load collection '{name}': {reason}")]
    LoadError { name: String, reason: String },

    #[error("collection '{name}' not found")]
    NotFound { name: String },

    /// Embedding or language-model API failure (network, auth, HTTP status).
    #[error("{operation} failed: {message}")]
    Provider { operation: String, message: String },

    /// The model stream failed after some output was already produced.
    #[error("response stream interrupted: {message}")]
    StreamInterrupted { message: String },

    #[error("invalid collection name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("document '{name}' contains no extractable text")]
    EmptyDocument { name: String },

    #[error("failed to extract text from '{name}': {message}")]
    Extraction { name: String, message: String },

    #[error("no active collection; upload or select one first")]
    NoActiveCollection,

    /// Failure inside a persisted index (query or write).
    #[error("storage error in collection '{name}' during {operation}: {message}")]
    Storage {
        name: String,
        operation: String,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Provider`] from any displayable error.
    pub fn provider(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Provider {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Build a [`Error::Storage`] from any displayable error.
    pub fn storage(
        name: impl Into<String>,
        operation: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        Error::Storage {
            name: name.into(),
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Build a [`Error::LoadError`] from any displayable error.
    pub fn load(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::LoadError {
            name: name.into(),
            reason: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
