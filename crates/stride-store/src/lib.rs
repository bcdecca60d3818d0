//! SQLite persistence for the stride step log.
//!
//! This crate provides the durable [`PersistentStore`](stride_core::PersistentStore)
//! backend: named collections of JSON documents kept in a single SQLite file.
//!
//! # Features
//!
//! - Lazy connection after a capability probe of the database location
//! - Atomic multi-document upserts
//! - Per-collection schema versions with upgrade on open
//! - Blocking SQLite work kept off the async executor
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stride_core::{RepositoryOptions, StepRepository};
//! use stride_store::SqliteStore;
//!
//! # #[tokio::main]
//! # async fn main() -> stride_core::Result<()> {
//! let store = Arc::new(SqliteStore::at_default_path());
//! let repo = StepRepository::open(store, RepositoryOptions::default()).await?;
//! repo.save_step(1_704_067_200, 8000).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod probe;
mod schema;
mod store;

pub use error::{Error, Result};
pub use probe::{StorageProbe, probe};
pub use schema::DB_SCHEMA_VERSION;
pub use store::{CollectionInfo, SqliteStore};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/stride/steps.db`
/// - macOS: `~/Library/Application Support/stride/steps.db`
/// - Windows: `C:\Users\<user>\AppData\Local\stride\steps.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("stride")
        .join("steps.db")
}
