//! Main store implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use stride_core::{Document, PersistentStore, StoreResult};

use crate::error::{Error, Result};
use crate::probe;
use crate::schema;

/// Where the database lives.
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Summary of one collection, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub version: u32,
    pub documents: u64,
    /// Unix timestamp of the last write.
    pub updated_at: i64,
}

/// SQLite-backed [`PersistentStore`].
///
/// The connection is made lazily on the first [`open`](PersistentStore::open)
/// call, after probing the database location. All SQLite work runs on the
/// blocking thread pool. Once closed the store stays closed.
pub struct SqliteStore {
    location: Location,
    conn: Arc<Mutex<Option<Connection>>>,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .field("connected", &self.is_connected())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SqliteStore {
    /// Store backed by a database file at `path`. Nothing is touched until
    /// the first collection is opened.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            conn: Arc::new(Mutex::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store at the default database location.
    pub fn at_default_path() -> Self {
        Self::new(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = connect_in_memory()?;
        Ok(Self {
            location: Location::Memory,
            conn: Arc::new(Mutex::new(Some(conn))),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Database file path, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Whether [`close`](PersistentStore::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Every collection with its version and document count.
    pub async fn collections(&self) -> Result<Vec<CollectionInfo>> {
        self.run(|conn| list_collections(conn)).await
    }

    /// Run `op` against the open connection on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Task("connection lock poisoned".to_string()))?;
            let conn = guard.as_mut().ok_or(Error::NotOpen)?;
            op(conn)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }

    async fn open_collection(&self, name: String, version: u32) -> Result<()> {
        let location = self.location.clone();
        let conn = Arc::clone(&self.conn);
        let closed = Arc::clone(&self.closed);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Task("connection lock poisoned".to_string()))?;
            if closed.load(Ordering::Acquire) {
                return Err(Error::NotOpen);
            }
            if guard.is_none() {
                *guard = Some(match &location {
                    Location::File(path) => connect(path)?,
                    Location::Memory => connect_in_memory()?,
                });
            }
            let conn = guard.as_mut().ok_or(Error::NotOpen)?;
            ensure_collection(conn, &name, version)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn open(&self, name: &str, schema_version: u32) -> StoreResult<()> {
        Ok(self
            .open_collection(name.to_string(), schema_version)
            .await?)
    }

    async fn list_all(&self, name: &str) -> StoreResult<Vec<Document>> {
        let name = name.to_string();
        Ok(self.run(move |conn| list_documents(conn, &name)).await?)
    }

    async fn write_many(&self, name: &str, documents: Vec<Document>) -> StoreResult<()> {
        let name = name.to_string();
        self.run(move |conn| write_documents(conn, &name, &documents))
            .await?;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        let conn = Arc::clone(&self.conn);
        let flag = Arc::clone(&self.closed);
        let closed = tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Task("connection lock poisoned".to_string()))?;
            flag.store(true, Ordering::Release);
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, e)| Error::Database(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?;
        closed?;
        debug!("Closed SQLite store");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// Probe `path`, then open it with the pragmas and schema applied.
fn connect(path: &Path) -> Result<Connection> {
    let report = probe::probe(path);
    if let Some(problem) = report.problem {
        return Err(Error::Unavailable(problem));
    }

    info!("Opening database at {}", path.display());
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    schema::initialize(&conn)?;
    Ok(conn)
}

fn connect_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    schema::initialize(&conn)?;
    Ok(conn)
}

fn collection_version(conn: &Connection, name: &str) -> Result<Option<u32>> {
    Ok(conn
        .query_row(
            "SELECT version FROM collections WHERE name = ?",
            [name],
            |row| row.get(0),
        )
        .optional()?)
}

/// Create or upgrade a collection.
fn ensure_collection(conn: &mut Connection, name: &str, version: u32) -> Result<()> {
    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;

    match collection_version(&tx, name)? {
        None => {
            tx.execute(
                "INSERT INTO collections (name, version, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![name, version, now],
            )?;
            info!("Created collection '{}' at version {}", name, version);
        }
        Some(stored) if stored > version => {
            return Err(Error::VersionConflict {
                name: name.to_string(),
                stored,
                requested: version,
            });
        }
        Some(stored) if stored < version => {
            tx.execute(
                "UPDATE collections SET version = ?2, updated_at = ?3 WHERE name = ?1",
                rusqlite::params![name, version, now],
            )?;
            info!(
                "Upgraded collection '{}' from version {} to {}",
                name, stored, version
            );
        }
        Some(_) => debug!("Collection '{}' already at version {}", name, version),
    }

    tx.commit()?;
    Ok(())
}

fn list_documents(conn: &mut Connection, name: &str) -> Result<Vec<Document>> {
    if collection_version(conn, name)?.is_none() {
        return Err(Error::UnknownCollection(name.to_string()));
    }

    let mut stmt = conn.prepare("SELECT key, value FROM documents WHERE collection = ?")?;
    let rows = stmt
        .query_map([name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let documents = rows
        .into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Document '{}' in '{}' is not valid JSON: {}", key, name, e);
                Value::String(raw)
            });
            Document { key, value }
        })
        .collect();

    Ok(documents)
}

/// Upsert every document in one transaction.
fn write_documents(conn: &mut Connection, name: &str, documents: &[Document]) -> Result<usize> {
    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;

    if collection_version(&tx, name)?.is_none() {
        return Err(Error::UnknownCollection(name.to_string()));
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO documents (collection, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )?;
        for doc in documents {
            let value = serde_json::to_string(&doc.value)?;
            stmt.execute(rusqlite::params![name, &doc.key, value, now])?;
        }
    }

    tx.execute(
        "UPDATE collections SET updated_at = ?2 WHERE name = ?1",
        rusqlite::params![name, now],
    )?;
    tx.commit()?;

    debug!("Wrote {} documents to '{}'", documents.len(), name);
    Ok(documents.len())
}

fn list_collections(conn: &mut Connection) -> Result<Vec<CollectionInfo>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, c.version, COUNT(d.key), c.updated_at
         FROM collections c
         LEFT JOIN documents d ON d.collection = c.name
         GROUP BY c.name
         ORDER BY c.name",
    )?;

    let collections = stmt
        .query_map([], |row| {
            Ok(CollectionInfo {
                name: row.get(0)?,
                version: row.get(1)?,
                documents: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(collections)
}
