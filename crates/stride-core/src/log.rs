//! In-memory step log with one record per calendar day.

use std::collections::HashMap;

use chrono::NaiveDate;
use stride_types::StepRecord;

use crate::calendar::Zone;
use crate::error::{Error, Result};

/// Append-only collection of [`StepRecord`]s, at most one per calendar day.
///
/// Records keep insertion order; nothing here sorts by time. The calendar day
/// of a record is its civil date in the log's [`Zone`].
///
/// # Example
///
/// ```
/// use stride_core::{StepLog, Zone};
/// use stride_types::StepRecord;
///
/// let mut log = StepLog::new(Zone::Utc);
/// log.add_step(StepRecord::new(1_704_103_200, 8000)?)?;
///
/// // Same calendar day, later in the evening
/// let again = StepRecord::new(1_704_150_000, 500)?;
/// assert!(log.add_step(again).unwrap_err().is_duplicate());
/// assert_eq!(log.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    zone: Zone,
    records: Vec<StepRecord>,
    days: HashMap<NaiveDate, usize>,
}

impl StepLog {
    /// Create an empty log bucketing days in `zone`.
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            records: Vec::new(),
            days: HashMap::new(),
        }
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateDay`] if the record's calendar day is already taken.
    /// The log is left untouched on error.
    pub fn add_step(&mut self, record: StepRecord) -> Result<NaiveDate> {
        let date = self.zone.date_of(record.timestamp())?;
        if self.days.contains_key(&date) {
            return Err(Error::DuplicateDay { date });
        }
        self.days.insert(date, self.records.len());
        self.records.push(record);
        Ok(date)
    }

    /// Whether a record exists for `date`.
    pub fn contains_day(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    /// Record for `date`, if any.
    pub fn get_day(&self, date: NaiveDate) -> Option<&StepRecord> {
        self.days.get(&date).map(|&idx| &self.records[idx])
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Iterate `(calendar day, record)` pairs in insertion order.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, &StepRecord)> + '_ {
        let mut by_index: Vec<(usize, NaiveDate)> =
            self.days.iter().map(|(date, idx)| (*idx, *date)).collect();
        by_index.sort_unstable_by_key(|(idx, _)| *idx);
        by_index
            .into_iter()
            .map(move |(idx, date)| (date, &self.records[idx]))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }
}
