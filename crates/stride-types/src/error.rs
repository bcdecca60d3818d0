//! Error types for input validation in stride-types.

use thiserror::Error;

/// Errors raised when constructing step data from untrusted input.
///
/// These are always detected synchronously, before any storage is touched.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// Step counts cannot be negative.
    #[error("Step count cannot be negative: {0}")]
    NegativeSteps(i64),

    /// Step count does not fit the stored integer width.
    #[error("Step count {value} exceeds the maximum of {max}")]
    StepsOutOfRange { value: i64, max: u32 },

    /// Timestamp cannot be represented as a calendar date.
    #[error("Timestamp {0} is outside the supported calendar range")]
    TimestampOutOfRange(i64),

    /// Date key is not a valid `YYYY-MM-DD` calendar date.
    #[error("Invalid date key '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Time zone setting is not `local`, `utc` or a `±HH:MM` offset.
    #[error("Invalid time zone '{0}', expected 'local', 'utc' or an offset like +02:00")]
    InvalidTimeZone(String),
}

/// Result type alias using stride-types' ValidationError type.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
