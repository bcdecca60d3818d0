//! Error types for stride-core.
//!
//! Errors fall into three groups that callers must be able to tell apart:
//!
//! | Error | Meaning | Recovery |
//! |-------|---------|----------|
//! | [`Error::DuplicateDay`] | The calendar day already has a record | Pick another day or ignore; nothing was written |
//! | [`Error::InvalidInput`] | Negative steps, bad timestamp or date | Fix the input; rejected before any I/O |
//! | [`Error::StorageUnavailable`] | No persistence facility on this host | Continue in volatile mode |
//! | [`Error::Persistence`] | The durable commit of a write failed | Retry the write; memory was not changed |
//! | [`Error::Storage`] | Any other store failure (load, open, close) | Report; retry later |

use chrono::NaiveDate;
use stride_types::ValidationError;

/// Result type for stride-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for [`PersistentStore`](crate::PersistentStore) implementations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the step log engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A record already exists for this calendar day.
    #[error("Steps already recorded for {date}")]
    DuplicateDay { date: NaiveDate },

    /// Input rejected by validation.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The host provides no persistence facility.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A write passed validation but its durable commit failed.
    #[error("Failed to persist steps for {date}: {source}")]
    Persistence {
        date: NaiveDate,
        #[source]
        source: StoreError,
    },

    /// Any other store failure.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl Error {
    /// Whether the error is a rejected duplicate day.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateDay { .. })
    }

    /// Whether the error originated in the storage layer.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_) | Error::Persistence { .. } | Error::Storage(_)
        )
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => Error::StorageUnavailable(reason),
            other => Error::Storage(other),
        }
    }
}

/// Errors reported by a [`PersistentStore`](crate::PersistentStore) backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The backing facility does not exist or cannot be used.
    #[error("persistence facility unavailable: {0}")]
    Unavailable(String),

    /// The named collection was never opened.
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    /// The collection exists at a newer schema version than requested.
    #[error("collection '{name}' is at version {stored}, cannot open at older version {requested}")]
    VersionConflict {
        name: String,
        stored: u32,
        requested: u32,
    },

    /// The store was closed.
    #[error("store is closed")]
    Closed,

    /// A batch write was aborted; none of its records are visible.
    #[error("transaction aborted: {0}")]
    Transaction(String),

    /// A persisted record could not be decoded.
    #[error("corrupt record '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Backend specific failure.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_store_error_maps_to_storage_unavailable() {
        let err: Error = StoreError::Unavailable("no data dir".to_string()).into();
        assert!(matches!(err, Error::StorageUnavailable(ref r) if r == "no data dir"));
        assert!(err.is_storage());
        assert!(!err.is_duplicate());
    }

    #[test]
    fn test_other_store_errors_map_to_storage() {
        let err: Error = StoreError::Closed.into();
        assert!(matches!(err, Error::Storage(StoreError::Closed)));
    }

    #[test]
    fn test_duplicate_display() {
        let err = Error::DuplicateDay {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(err.to_string(), "Steps already recorded for 2024-01-01");
        assert!(err.is_duplicate());
        assert!(!err.is_storage());
    }

    #[test]
    fn test_persistence_keeps_source() {
        use std::error::Error as _;

        let err = Error::Persistence {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            source: StoreError::Transaction("disk full".to_string()),
        };
        assert!(err.to_string().contains("2024-01-01"));
        assert!(err.source().unwrap().to_string().contains("disk full"));
    }

    #[test]
    fn test_validation_converts() {
        let err: Error = ValidationError::NegativeSteps(-1).into();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
