//! Core types for daily step data.

use core::fmt;

use chrono::{DateTime, NaiveDate};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Format of the calendar-day key used by the persisted representation.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date key.
///
/// # Examples
///
/// ```
/// use stride_types::parse_date_key;
///
/// let date = parse_date_key("2024-02-29").unwrap();
/// assert_eq!(date.to_string(), "2024-02-29");
/// assert!(parse_date_key("2023-02-29").is_err());
/// ```
pub fn parse_date_key(key: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(key.to_string()))
}

/// Format a calendar date as its `YYYY-MM-DD` key.
#[must_use]
pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// One day's step count.
///
/// `timestamp` is a moment within the recorded day (seconds since the Unix
/// epoch), not necessarily midnight. Records are immutable once built; the
/// only way to obtain one is through [`StepRecord::new`], which validates
/// the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepRecord {
    timestamp: i64,
    steps: u32,
}

impl StepRecord {
    /// Build a record from raw input.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NegativeSteps`] if `steps < 0`
    /// - [`ValidationError::StepsOutOfRange`] if `steps` exceeds `u32::MAX`
    /// - [`ValidationError::TimestampOutOfRange`] if `timestamp` has no calendar date
    ///
    /// # Examples
    ///
    /// ```
    /// use stride_types::{StepRecord, ValidationError};
    ///
    /// let record = StepRecord::new(1_704_067_200, 8000).unwrap();
    /// assert_eq!(record.steps(), 8000);
    ///
    /// assert_eq!(
    ///     StepRecord::new(1_704_067_200, -1),
    ///     Err(ValidationError::NegativeSteps(-1))
    /// );
    /// ```
    pub fn new(timestamp: i64, steps: i64) -> ValidationResult<Self> {
        if steps < 0 {
            return Err(ValidationError::NegativeSteps(steps));
        }
        let steps = u32::try_from(steps).map_err(|_| ValidationError::StepsOutOfRange {
            value: steps,
            max: u32::MAX,
        })?;
        if DateTime::from_timestamp(timestamp, 0).is_none() {
            return Err(ValidationError::TimestampOutOfRange(timestamp));
        }
        Ok(Self { timestamp, steps })
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Milliseconds since the Unix epoch, for comparison against window bounds.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.saturating_mul(1000)
    }

    /// Recorded step count.
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} steps @ {}", self.steps, self.timestamp)
    }
}

/// Persisted representation of a step record.
///
/// `date` is the natural key of the collection; a store holds at most one
/// `StoredStep` per date.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredStep {
    /// Calendar day identifier in `YYYY-MM-DD` form.
    pub date: String,
    /// Step count for that day.
    pub steps: u32,
}

impl StoredStep {
    /// Build the persisted form for a calendar date.
    pub fn new(date: NaiveDate, steps: u32) -> Self {
        Self {
            date: format_date_key(date),
            steps,
        }
    }

    /// Parse the date key.
    pub fn day(&self) -> ValidationResult<NaiveDate> {
        parse_date_key(&self.date)
    }
}
