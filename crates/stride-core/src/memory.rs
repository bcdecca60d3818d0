//! In-memory store implementation.
//!
//! [`MemoryStore`] implements [`PersistentStore`] over a map held in process
//! memory. Nothing survives a restart, so it serves as the volatile backend
//! and as a test double for the repository.
//!
//! # Features
//!
//! - **Failure injection**: make the store unavailable, or fail the next N writes
//! - **Latency simulation**: delay writes to exercise concurrent callers
//! - **Inspection**: count writes and stored documents

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::{Document, PersistentStore};

#[derive(Debug, Default)]
struct Collection {
    version: u32,
    documents: HashMap<String, Value>,
}

/// Volatile [`PersistentStore`] backed by a `HashMap`.
///
/// # Example
///
/// ```
/// use stride_core::{Document, MemoryStore, PersistentStore};
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryStore::new();
///     store.open("steps", 1).await.unwrap();
///     store
///         .write_many("steps", vec![Document::new("2024-01-01", serde_json::json!(1))])
///         .await
///         .unwrap();
///     assert_eq!(store.list_all("steps").await.unwrap().len(), 1);
/// }
/// ```
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    unavailable: AtomicBool,
    closed: AtomicBool,
    /// Writes left to fail before succeeding again.
    remaining_write_failures: AtomicU32,
    /// Simulated write latency in milliseconds (0 = no delay).
    write_latency_ms: AtomicU64,
    write_count: AtomicU32,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("unavailable", &self.unavailable.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty, available store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            remaining_write_failures: AtomicU32::new(0),
            write_latency_ms: AtomicU64::new(0),
            write_count: AtomicU32::new(0),
        }
    }

    /// Create a store that reports the persistence facility as missing.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.set_unavailable(true);
        store
    }

    // --- Test control methods ---

    /// Toggle the missing-facility simulation.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Fail the next `count` calls to `write_many`.
    pub fn fail_next_writes(&self, count: u32) {
        self.remaining_write_failures.store(count, Ordering::Relaxed);
    }

    /// Delay every write by `latency`.
    pub fn set_write_latency(&self, latency: Duration) {
        self.write_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of successful `write_many` calls.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Number of documents in a collection (0 if it does not exist).
    pub async fn document_count(&self, name: &str) -> usize {
        self.collections
            .read()
            .await
            .get(name)
            .map_or(0, |c| c.documents.len())
    }

    /// Schema version of a collection, if it exists.
    pub async fn version(&self, name: &str) -> Option<u32> {
        self.collections.read().await.get(name).map(|c| c.version)
    }

    /// Insert a raw document, bypassing failure injection.
    pub async fn insert_raw(&self, name: &str, key: &str, value: Value) {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .documents
            .insert(key.to_string(), value);
    }

    fn check_usable(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(
                "in-memory store configured as unavailable".to_string(),
            ));
        }
        if self.closed.load(Ordering::Relaxed) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn open(&self, name: &str, schema_version: u32) -> StoreResult<()> {
        self.check_usable()?;
        let mut collections = self.collections.write().await;
        let collection = collections.entry(name.to_string()).or_default();
        if collection.version > schema_version {
            return Err(StoreError::VersionConflict {
                name: name.to_string(),
                stored: collection.version,
                requested: schema_version,
            });
        }
        collection.version = schema_version;
        Ok(())
    }

    async fn list_all(&self, name: &str) -> StoreResult<Vec<Document>> {
        self.check_usable()?;
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))?;
        Ok(collection
            .documents
            .iter()
            .map(|(key, value)| Document::new(key.clone(), value.clone()))
            .collect())
    }

    async fn write_many(&self, name: &str, documents: Vec<Document>) -> StoreResult<()> {
        self.check_usable()?;

        let latency = self.write_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_write_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_write_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(StoreError::Transaction(
                "simulated write failure".to_string(),
            ));
        }

        // The whole batch is applied under one lock, so readers never see half of it.
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))?;
        for doc in documents {
            collection.documents.insert(doc.key, doc.value);
        }
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let store = MemoryStore::new();
        store.open("steps", 1).await.unwrap();
        store
            .write_many("steps", vec![Document::new("a", json!(1))])
            .await
            .unwrap();
        store.open("steps", 1).await.unwrap();
        assert_eq!(store.document_count("steps").await, 1);
    }

    #[tokio::test]
    async fn test_open_upgrades_and_rejects_downgrade() {
        let store = MemoryStore::new();
        store.open("steps", 1).await.unwrap();
        store.open("steps", 2).await.unwrap();
        assert_eq!(store.version("steps").await, Some(2));

        let err = store.open("steps", 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                stored: 2,
                requested: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_write_many_upserts_by_key() {
        let store = MemoryStore::new();
        store.open("steps", 1).await.unwrap();
        store
            .write_many(
                "steps",
                vec![Document::new("a", json!(1)), Document::new("b", json!(2))],
            )
            .await
            .unwrap();
        store
            .write_many("steps", vec![Document::new("a", json!(10))])
            .await
            .unwrap();

        let mut docs = store.list_all("steps").await.unwrap();
        docs.sort_by(|x, y| x.key.cmp(&y.key));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].value, json!(10));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.list_all("missing").await,
            Err(StoreError::UnknownCollection(_))
        ));
        assert!(matches!(
            store.write_many("missing", vec![]).await,
            Err(StoreError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryStore::unavailable();
        assert!(matches!(
            store.open("steps", 1).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failure_writes_nothing() {
        let store = MemoryStore::new();
        store.open("steps", 1).await.unwrap();
        store.fail_next_writes(1);

        let batch = vec![Document::new("a", json!(1)), Document::new("b", json!(2))];
        assert!(matches!(
            store.write_many("steps", batch.clone()).await,
            Err(StoreError::Transaction(_))
        ));
        assert_eq!(store.document_count("steps").await, 0);

        store.write_many("steps", batch).await.unwrap();
        assert_eq!(store.document_count("steps").await, 2);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_calls() {
        let store = MemoryStore::new();
        store.open("steps", 1).await.unwrap();
        store.close().await.unwrap();
        assert!(matches!(
            store.list_all("steps").await,
            Err(StoreError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_usable_through_arc_dyn() {
        let store: std::sync::Arc<dyn PersistentStore> = std::sync::Arc::new(MemoryStore::new());
        store.open("steps", 1).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.list_all("steps").await.unwrap().is_empty());
    }
}
