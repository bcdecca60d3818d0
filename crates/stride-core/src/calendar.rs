//! Calendar bucketing: time zone policy and query windows.
//!
//! All day, week and year boundaries are computed from local midnights in a
//! configurable [`Zone`]. Windows are inclusive on both ends and carry
//! millisecond precision, so a day ends at `23:59:59.999`.
//!
//! | Period | Start | End |
//! |--------|-------|-----|
//! | [`Period::Day`] | local midnight of the reference day | next local midnight − 1 ms |
//! | [`Period::Week`] | local midnight of the reference day | local midnight 7 days later − 1 ms |
//! | [`Period::Year`] | Jan 1 00:00 of the reference year | next Jan 1 00:00 − 1 ms |
//!
//! The week is seven calendar days anchored on whatever day the caller picks;
//! it is not aligned to a weekday. Across a DST change it is 1 h shorter or
//! longer than `7 × 24 h`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use stride_types::{StepRecord, ValidationError, ValidationResult};

/// Milliseconds in a nominal 24 hour day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Days covered by a week window.
pub const DAYS_PER_WEEK: u64 = 7;

/// Time zone used to decide where calendar days begin.
///
/// # Examples
///
/// ```
/// use stride_core::Zone;
///
/// let zone: Zone = "+02:00".parse().unwrap();
/// assert_eq!(zone.to_string(), "+02:00");
/// assert_eq!("utc".parse::<Zone>().unwrap(), Zone::Utc);
/// assert_eq!("local".parse::<Zone>().unwrap(), Zone::Local);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The process-local time zone, including its DST rules.
    #[default]
    Local,
    /// Coordinated Universal Time.
    Utc,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl Zone {
    /// Civil date of `timestamp` (seconds) in this zone.
    pub fn date_of(&self, timestamp: i64) -> ValidationResult<NaiveDate> {
        match self {
            Zone::Local => date_in(&Local, timestamp),
            Zone::Utc => date_in(&Utc, timestamp),
            Zone::Fixed(offset) => date_in(offset, timestamp),
        }
    }

    /// First instant of `date` in this zone, in milliseconds.
    ///
    /// Returns `None` when the date is outside the representable range.
    pub fn midnight_millis(&self, date: NaiveDate) -> Option<i64> {
        match self {
            Zone::Local => first_instant(&Local, date),
            Zone::Utc => first_instant(&Utc, date),
            Zone::Fixed(offset) => first_instant(offset, date),
        }
    }

    /// First instant of `date` in this zone, in whole seconds.
    pub fn midnight_timestamp(&self, date: NaiveDate) -> ValidationResult<i64> {
        self.midnight_millis(date)
            .map(|ms| ms.div_euclid(1000))
            .ok_or_else(|| ValidationError::InvalidDate(date.to_string()))
    }

    /// Window for `period` containing the reference `timestamp`.
    pub fn window(&self, period: Period, timestamp: i64) -> ValidationResult<TimeWindow> {
        match self {
            Zone::Local => window_in(&Local, period, timestamp),
            Zone::Utc => window_in(&Utc, period, timestamp),
            Zone::Fixed(offset) => window_in(offset, period, timestamp),
        }
    }

    /// The calendar day containing `timestamp`.
    pub fn day_window(&self, timestamp: i64) -> ValidationResult<TimeWindow> {
        self.window(Period::Day, timestamp)
    }

    /// Seven calendar days starting at the local midnight of `timestamp`.
    pub fn week_window(&self, timestamp: i64) -> ValidationResult<TimeWindow> {
        self.window(Period::Week, timestamp)
    }

    /// The calendar year containing `timestamp`.
    pub fn year_window(&self, timestamp: i64) -> ValidationResult<TimeWindow> {
        self.window(Period::Year, timestamp)
    }
}

fn date_in<Tz: TimeZone>(tz: &Tz, timestamp: i64) -> ValidationResult<NaiveDate> {
    let instant = DateTime::from_timestamp(timestamp, 0)
        .ok_or(ValidationError::TimestampOutOfRange(timestamp))?;
    Ok(instant.with_timezone(tz).date_naive())
}

/// Every window runs from the first instant of its first day to 1 ms before
/// the first instant of the day after its last, so days that are 23 or 25
/// hours long keep their boundaries on local midnight.
fn window_in<Tz: TimeZone>(
    tz: &Tz,
    period: Period,
    timestamp: i64,
) -> ValidationResult<TimeWindow> {
    let out_of_range = || ValidationError::TimestampOutOfRange(timestamp);
    let date = date_in(tz, timestamp)?;
    let (first, next) = match period {
        Period::Day => (Some(date), date.succ_opt()),
        Period::Week => (Some(date), date.checked_add_days(Days::new(DAYS_PER_WEEK))),
        Period::Year => (
            NaiveDate::from_ymd_opt(date.year(), 1, 1),
            NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
        ),
    };
    let start = first
        .and_then(|d| first_instant(tz, d))
        .ok_or_else(out_of_range)?;
    let next = next
        .and_then(|d| first_instant(tz, d))
        .ok_or_else(out_of_range)?;
    Ok(TimeWindow::from_millis(start, next - 1))
}

/// Resolve the first valid wall-clock instant of `date`.
///
/// Where a DST transition happens at midnight, 00:00 does not exist and the
/// day starts at the first wall time after the gap.
fn first_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<i64> {
    let mut wall = date.and_hms_opt(0, 0, 0)?;
    for _ in 0..48 {
        if let Some(instant) = tz.from_local_datetime(&wall).earliest() {
            return Some(instant.timestamp_millis());
        }
        wall += Duration::minutes(30);
    }
    None
}

impl FromStr for Zone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" => return Ok(Zone::Local),
            "utc" | "z" => return Ok(Zone::Utc),
            _ => {}
        }
        parse_offset(trimmed)
            .map(Zone::Fixed)
            .ok_or_else(|| ValidationError::InvalidTimeZone(s.to_string()))
    }
}

/// Parse `+HH:MM`, `-HH:MM` or `+HHMM`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => write!(f, "local"),
            Zone::Utc => write!(f, "utc"),
            Zone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Calendar period for aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Day,
    Week,
    Year,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => write!(f, "day"),
            Period::Week => write!(f, "week"),
            Period::Year => write!(f, "year"),
        }
    }
}

/// Inclusive time range with millisecond bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start_ms: i64,
    end_ms: i64,
}

impl TimeWindow {
    /// Window from millisecond bounds, both inclusive.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Window from second bounds, both inclusive.
    pub fn from_seconds(start: i64, end: i64) -> Self {
        Self::from_millis(start.saturating_mul(1000), end.saturating_mul(1000))
    }

    pub fn start_millis(&self) -> i64 {
        self.start_ms
    }

    pub fn end_millis(&self) -> i64 {
        self.end_ms
    }

    /// Start of the window in whole seconds.
    pub fn start_seconds(&self) -> i64 {
        self.start_ms.div_euclid(1000)
    }

    /// Last whole second inside the window.
    pub fn end_seconds(&self) -> i64 {
        self.end_ms.div_euclid(1000)
    }

    /// True when `end < start`; such a window matches nothing.
    pub fn is_empty(&self) -> bool {
        self.end_ms < self.start_ms
    }

    /// Whether an instant in milliseconds falls inside the window.
    pub fn contains_millis(&self, ms: i64) -> bool {
        ms >= self.start_ms && ms <= self.end_ms
    }

    /// Whether a record's timestamp falls inside the window.
    pub fn contains(&self, record: &StepRecord) -> bool {
        self.contains_millis(record.timestamp_millis())
    }
}
