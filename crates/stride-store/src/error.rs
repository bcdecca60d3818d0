//! Error types for stride-store.

use std::path::PathBuf;

use stride_core::StoreError;

/// Result type for stride-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stride-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The capability probe found no usable storage location.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Collection was never opened.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Collection exists at a newer schema version.
    #[error("Collection '{name}' is at version {stored}, requested {requested}")]
    VersionConflict {
        name: String,
        stored: u32,
        requested: u32,
    },

    /// No connection: the store was never opened or has been closed.
    #[error("Store is not open")]
    NotOpen,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Blocking task failed or the connection lock was poisoned.
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::Unavailable(reason) => StoreError::Unavailable(reason),
            Error::CreateDirectory { path, source } => {
                StoreError::Unavailable(format!("cannot create {}: {}", path.display(), source))
            }
            Error::UnknownCollection(name) => StoreError::UnknownCollection(name),
            Error::VersionConflict {
                name,
                stored,
                requested,
            } => StoreError::VersionConflict {
                name,
                stored,
                requested,
            },
            Error::NotOpen => StoreError::Closed,
            Error::Database(e) => StoreError::Transaction(e.to_string()),
            other => StoreError::Backend(Box::new(other)),
        }
    }
}
