//! Step log engine for stride.
//!
//! This crate holds the daily step log, its calendar aggregation and the
//! repository that keeps the in-memory log consistent with durable storage.
//!
//! # Features
//!
//! - One record per calendar day, enforced by [`StepLog`]
//! - Day, week and year totals via [`RangeAggregator`]
//! - Explicit time zone policy ([`Zone`]): process-local, UTC or a fixed offset
//! - Pluggable storage through the async [`PersistentStore`] trait
//! - Volatile fallback when no persistence facility is available
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use stride_core::{MemoryStore, RepositoryOptions, StepRepository, Zone};
//!
//! # #[tokio::main]
//! # async fn main() -> stride_core::Result<()> {
//! let repo = StepRepository::open(
//!     Arc::new(MemoryStore::new()),
//!     RepositoryOptions::new().zone(Zone::Utc),
//! )
//! .await?;
//!
//! let jan_1 = 1_704_067_200;
//! for day in 0..7 {
//!     repo.save_step(jan_1 + day * 86_400, 1000).await?;
//! }
//! assert_eq!(repo.steps_for_week(jan_1).await?, 7000);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod calendar;
pub mod error;
pub mod log;
pub mod memory;
pub mod repository;
pub mod traits;

pub use aggregate::{RangeAggregator, StepSummary};
pub use calendar::{DAYS_PER_WEEK, MILLIS_PER_DAY, Period, TimeWindow, Zone};
pub use error::{Error, Result, StoreError, StoreResult};
pub use log::StepLog;
pub use memory::MemoryStore;
pub use repository::{
    DEFAULT_COLLECTION, Durability, RepositoryOptions, SCHEMA_VERSION, StepRepository,
    WriteOutcome, WriteState,
};
pub use traits::{Document, PersistentStore};

// Re-export the shared data types
pub use stride_types;
pub use stride_types::{StepRecord, StoredStep, ValidationError};
