//! Step repository: the consistency boundary between the in-memory log and
//! the durable store.
//!
//! Every write follows the same path:
//!
//! ```text
//! Requested ──► ValidatedInMemory ──► Persisting ──► Committed
//!     │                                   │
//!     └──► RejectedDuplicate              └──► PersistFailed
//! ```
//!
//! Validation happens on a staged copy of the log, so readers never observe a
//! record whose commit has not been confirmed. When a commit fails the staged
//! copy is dropped, which leaves the cache at the last persisted snapshot, and
//! the cache is marked stale so the next read re-syncs from the store.
//!
//! When the store reports that no persistence facility exists, the repository
//! runs in [`Durability::Volatile`] mode: writes and queries keep working for
//! the session, and nothing is persisted.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use serde::Serialize;
use stride_types::{StepRecord, StoredStep};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::aggregate::{RangeAggregator, StepSummary};
use crate::calendar::{Period, TimeWindow, Zone};
use crate::error::{Error, Result, StoreError};
use crate::log::StepLog;
use crate::traits::{Document, PersistentStore};

/// Default collection name for step records.
pub const DEFAULT_COLLECTION: &str = "steps";

/// Schema version of the step collection.
pub const SCHEMA_VERSION: u32 = 1;

/// Options for [`StepRepository`].
#[derive(Debug, Clone)]
pub struct RepositoryOptions {
    /// Collection holding step records.
    pub collection: String,
    /// Schema version requested when opening the collection.
    pub schema_version: u32,
    /// Time zone used for calendar days.
    pub zone: Zone,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            schema_version: SCHEMA_VERSION,
            zone: Zone::Local,
        }
    }
}

impl RepositoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }
}

/// Whether writes reach durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Writes are committed to the store.
    Durable,
    /// No store; data lives for the session only.
    Volatile,
}

impl fmt::Display for Durability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Durability::Durable => write!(f, "durable"),
            Durability::Volatile => write!(f, "volatile"),
        }
    }
}

/// Stages of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Requested,
    ValidatedInMemory,
    Persisting,
    Committed,
    PersistFailed,
    RejectedDuplicate,
}

impl fmt::Display for WriteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteState::Requested => "requested",
            WriteState::ValidatedInMemory => "validated",
            WriteState::Persisting => "persisting",
            WriteState::Committed => "committed",
            WriteState::PersistFailed => "persist-failed",
            WriteState::RejectedDuplicate => "rejected-duplicate",
        };
        write!(f, "{name}")
    }
}

/// Result of a successful [`StepRepository::save_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was durably committed.
    Committed { date: NaiveDate, record: StepRecord },
    /// The record is held in memory only (volatile mode).
    Volatile { date: NaiveDate, record: StepRecord },
}

impl WriteOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            WriteOutcome::Committed { date, .. } | WriteOutcome::Volatile { date, .. } => *date,
        }
    }

    pub fn record(&self) -> StepRecord {
        match self {
            WriteOutcome::Committed { record, .. } | WriteOutcome::Volatile { record, .. } => {
                *record
            }
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, WriteOutcome::Committed { .. })
    }
}

/// Owns the session's [`StepLog`] and keeps it consistent with a [`PersistentStore`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use stride_core::{MemoryStore, RepositoryOptions, StepRepository, Zone};
///
/// #[tokio::main]
/// async fn main() -> stride_core::Result<()> {
///     let store = Arc::new(MemoryStore::new());
///     let repo = StepRepository::open(store, RepositoryOptions::new().zone(Zone::Utc)).await?;
///
///     repo.save_step(1_704_067_200, 8000).await?; // 2024-01-01
///     assert_eq!(repo.steps_for_day(1_704_067_200).await?, 8000);
///     assert!(repo.save_step(1_704_100_000, 1).await.unwrap_err().is_duplicate());
///     Ok(())
/// }
/// ```
pub struct StepRepository {
    store: Option<Arc<dyn PersistentStore>>,
    options: RepositoryOptions,
    log: RwLock<StepLog>,
    /// Serializes validate-and-persist sequences.
    write_gate: Mutex<()>,
    stale: AtomicBool,
}

impl fmt::Debug for StepRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRepository")
            .field("backend", &self.store.as_ref().map(|s| s.backend()))
            .field("collection", &self.options.collection)
            .field("zone", &self.options.zone)
            .field("stale", &self.stale.load(Ordering::Relaxed))
            .finish()
    }
}

impl StepRepository {
    /// Open the collection on `store` and load its records.
    ///
    /// If the store reports [`StoreError::Unavailable`] the repository starts
    /// in volatile mode instead of failing. Any other store error is returned.
    pub async fn open(store: Arc<dyn PersistentStore>, options: RepositoryOptions) -> Result<Self> {
        match store
            .open(&options.collection, options.schema_version)
            .await
        {
            Ok(()) => {}
            Err(StoreError::Unavailable(reason)) => {
                warn!(
                    "Persistent storage unavailable ({}); continuing without durability",
                    reason
                );
                return Ok(Self::volatile(options));
            }
            Err(e) => return Err(Error::Storage(e)),
        }

        let log = load_log(store.as_ref(), &options).await?;
        info!(
            "Opened '{}' on {} backend with {} records",
            options.collection,
            store.backend(),
            log.len()
        );

        Ok(Self {
            store: Some(store),
            options,
            log: RwLock::new(log),
            write_gate: Mutex::new(()),
            stale: AtomicBool::new(false),
        })
    }

    /// A repository with no backing store.
    pub fn volatile(options: RepositoryOptions) -> Self {
        let log = StepLog::new(options.zone);
        Self {
            store: None,
            options,
            log: RwLock::new(log),
            write_gate: Mutex::new(()),
            stale: AtomicBool::new(false),
        }
    }

    pub fn durability(&self) -> Durability {
        if self.store.is_some() {
            Durability::Durable
        } else {
            Durability::Volatile
        }
    }

    pub fn zone(&self) -> Zone {
        self.options.zone
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// Record `steps` for the calendar day containing `timestamp`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for negative steps or a bad timestamp (no I/O attempted)
    /// - [`Error::DuplicateDay`] if the day already has a record (nothing persisted)
    /// - [`Error::Persistence`] if the durable commit failed; the record is not kept
    pub async fn save_step(&self, timestamp: i64, steps: i64) -> Result<WriteOutcome> {
        let record = StepRecord::new(timestamp, steps)?;
        trace_state(None, WriteState::Requested);

        let _gate = self.write_gate.lock().await;
        self.ensure_fresh().await?;

        let mut staged = self.log.read().await.clone();
        let date = match staged.add_step(record) {
            Ok(date) => date,
            Err(e) => {
                if let Error::DuplicateDay { date } = &e {
                    trace_state(Some(*date), WriteState::RejectedDuplicate);
                }
                return Err(e);
            }
        };
        trace_state(Some(date), WriteState::ValidatedInMemory);

        let Some(store) = &self.store else {
            *self.log.write().await = staged;
            debug!("Stored {} steps for {} in memory only", record.steps(), date);
            return Ok(WriteOutcome::Volatile { date, record });
        };

        trace_state(Some(date), WriteState::Persisting);
        let document = to_document(date, &record)?;
        match store
            .write_many(&self.options.collection, vec![document])
            .await
        {
            Ok(()) => {
                *self.log.write().await = staged;
                trace_state(Some(date), WriteState::Committed);
                Ok(WriteOutcome::Committed { date, record })
            }
            Err(source) => {
                trace_state(Some(date), WriteState::PersistFailed);
                warn!("Failed to persist steps for {}: {}", date, source);
                self.stale.store(true, Ordering::SeqCst);
                Err(Error::Persistence { date, source })
            }
        }
    }

    /// Record `steps` for a calendar date.
    pub async fn save_day(&self, date: NaiveDate, steps: i64) -> Result<WriteOutcome> {
        let timestamp = self.options.zone.midnight_timestamp(date)?;
        self.save_step(timestamp, steps).await
    }

    /// Re-read the log from the store, replacing the cache.
    ///
    /// A no-op in volatile mode.
    pub async fn refresh(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let log = load_log(store.as_ref(), &self.options).await?;
        *self.log.write().await = log;
        self.stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// A consistent copy of the current log.
    pub async fn snapshot(&self) -> Result<StepLog> {
        self.ensure_fresh().await?;
        Ok(self.log.read().await.clone())
    }

    /// Total steps with `start <= timestamp <= end` (seconds).
    pub async fn steps_between(&self, start: i64, end: i64) -> Result<u64> {
        self.ensure_fresh().await?;
        let log = self.log.read().await;
        Ok(RangeAggregator::new(&log).sum_between(start, end))
    }

    /// Total steps on the calendar day containing `timestamp`.
    pub async fn steps_for_day(&self, timestamp: i64) -> Result<u64> {
        self.steps_for(Period::Day, timestamp).await
    }

    /// Total steps over the seven days starting at the day of `timestamp`.
    pub async fn steps_for_week(&self, timestamp: i64) -> Result<u64> {
        self.steps_for(Period::Week, timestamp).await
    }

    /// Total steps over the calendar year containing `timestamp`.
    pub async fn steps_for_year(&self, timestamp: i64) -> Result<u64> {
        self.steps_for(Period::Year, timestamp).await
    }

    /// Total steps for `period` around `timestamp`.
    pub async fn steps_for(&self, period: Period, timestamp: i64) -> Result<u64> {
        let window = self.options.zone.window(period, timestamp)?;
        self.ensure_fresh().await?;
        let log = self.log.read().await;
        Ok(RangeAggregator::new(&log).sum_in(window))
    }

    /// Records with `start <= timestamp <= end`, oldest first.
    pub async fn records_between(&self, start: i64, end: i64) -> Result<Vec<StepRecord>> {
        self.ensure_fresh().await?;
        let log = self.log.read().await;
        Ok(RangeAggregator::new(&log).records_in(TimeWindow::from_seconds(start, end)))
    }

    /// Summary for `period` around `timestamp`, counting days that reach `goal`.
    pub async fn summary(
        &self,
        period: Period,
        timestamp: i64,
        goal: Option<u32>,
    ) -> Result<StepSummary> {
        let window = self.options.zone.window(period, timestamp)?;
        self.ensure_fresh().await?;
        let log = self.log.read().await;
        Ok(RangeAggregator::new(&log).summarize(window, goal))
    }

    /// Close the backing store.
    pub async fn close(self) -> Result<()> {
        if let Some(store) = self.store {
            let _gate = self.write_gate.lock().await;
            store.close().await?;
            info!("Closed '{}'", self.options.collection);
        }
        Ok(())
    }

    async fn ensure_fresh(&self) -> Result<()> {
        if self.stale.load(Ordering::SeqCst) {
            debug!("Re-syncing '{}' after a failed write", self.options.collection);
            self.refresh().await?;
        }
        Ok(())
    }
}

fn trace_state(date: Option<NaiveDate>, state: WriteState) {
    match date {
        Some(date) => debug!("write {}: {}", date, state),
        None => debug!("write: {}", state),
    }
}

fn to_document(date: NaiveDate, record: &StepRecord) -> Result<Document> {
    let stored = StoredStep::new(date, record.steps());
    let value = serde_json::to_value(&stored).map_err(StoreError::from)?;
    Ok(Document::new(stored.date, value))
}

/// Rebuild a log from every document in the collection.
///
/// Documents that cannot be decoded, or that collide on a calendar day, are
/// skipped with a warning.
async fn load_log(store: &dyn PersistentStore, options: &RepositoryOptions) -> Result<StepLog> {
    let documents = store.list_all(&options.collection).await?;
    let mut log = StepLog::new(options.zone);
    let mut skipped = 0usize;

    for document in documents {
        match decode_document(&document, options.zone) {
            Ok(record) => {
                if let Err(e) = log.add_step(record) {
                    warn!("Skipping stored record '{}': {}", document.key, e);
                    skipped += 1;
                }
            }
            Err(e) => {
                warn!("Skipping stored record '{}': {}", document.key, e);
                skipped += 1;
            }
        }
    }

    debug!(
        "Loaded {} records from '{}' ({} skipped)",
        log.len(),
        options.collection,
        skipped
    );
    Ok(log)
}

fn decode_document(document: &Document, zone: Zone) -> std::result::Result<StepRecord, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        key: document.key.clone(),
        reason,
    };
    let stored: StoredStep =
        serde_json::from_value(document.value.clone()).map_err(|e| corrupt(e.to_string()))?;
    let date = stored.day().map_err(|e| corrupt(e.to_string()))?;
    let timestamp = zone
        .midnight_timestamp(date)
        .map_err(|e| corrupt(e.to_string()))?;
    StepRecord::new(timestamp, i64::from(stored.steps)).map_err(|e| corrupt(e.to_string()))
}
