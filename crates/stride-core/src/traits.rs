//! Storage abstraction behind the step repository.
//!
//! [`PersistentStore`] models an embedded key-value facility holding named
//! collections of JSON documents. Implementations include the SQLite backend
//! in `stride-store` and the in-memory [`MemoryStore`](crate::MemoryStore).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;

/// A keyed record in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Natural key; writing a document with an existing key replaces it.
    pub key: String,
    /// Record payload.
    pub value: Value,
}

impl Document {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Durable storage for named collections of documents.
///
/// Lifecycle is explicit: construct the backend, call [`open`](Self::open)
/// for each collection, then [`close`](Self::close) on shutdown.
///
/// # Example
///
/// ```ignore
/// use stride_core::{Document, PersistentStore};
///
/// async fn seed<S: PersistentStore>(store: &S) -> stride_core::StoreResult<()> {
///     store.open("steps", 1).await?;
///     store
///         .write_many("steps", vec![Document::new("2024-01-01", serde_json::json!({"steps": 1}))])
///         .await
/// }
/// ```
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Ensure the collection `name` exists at `schema_version`, creating it on first use.
    ///
    /// Opening an existing collection at the same version is a no-op; a newer
    /// version upgrades it. Fails with
    /// [`StoreError::Unavailable`](crate::StoreError::Unavailable) when the
    /// host has no persistence facility.
    async fn open(&self, name: &str, schema_version: u32) -> StoreResult<()>;

    /// Every document in the collection, in no particular order.
    async fn list_all(&self, name: &str) -> StoreResult<Vec<Document>>;

    /// Upsert all documents as one atomic unit: either every document becomes
    /// visible to later [`list_all`](Self::list_all) calls or none does.
    async fn write_many(&self, name: &str, documents: Vec<Document>) -> StoreResult<()>;

    /// Release the backing resources. Later calls fail with
    /// [`StoreError::Closed`](crate::StoreError::Closed).
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;
}

#[async_trait]
impl<S: PersistentStore + ?Sized> PersistentStore for Arc<S> {
    async fn open(&self, name: &str, schema_version: u32) -> StoreResult<()> {
        (**self).open(name, schema_version).await
    }

    async fn list_all(&self, name: &str) -> StoreResult<Vec<Document>> {
        (**self).list_all(name).await
    }

    async fn write_many(&self, name: &str, documents: Vec<Document>) -> StoreResult<()> {
        (**self).write_many(name, documents).await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }

    fn backend(&self) -> &'static str {
        (**self).backend()
    }
}
