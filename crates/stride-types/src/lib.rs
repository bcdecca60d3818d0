//! Platform-agnostic types for the stride daily step log.
//!
//! This crate provides the data types shared by the aggregation engine
//! (stride-core), the SQLite backend (stride-store) and the CLI.
//!
//! # Features
//!
//! - Validated [`StepRecord`] construction
//! - The persisted `{ date, steps }` shape ([`StoredStep`])
//! - `YYYY-MM-DD` date key parsing and formatting
//!
//! # Example
//!
//! ```
//! use stride_types::{StepRecord, StoredStep, parse_date_key};
//!
//! let record = StepRecord::new(1_704_103_200, 8000)?;
//! let stored = StoredStep::new(parse_date_key("2024-01-01")?, record.steps());
//! assert_eq!(stored.date, "2024-01-01");
//! # Ok::<(), stride_types::ValidationError>(())
//! ```

pub mod error;
pub mod types;

pub use error::{ValidationError, ValidationResult};
pub use types::{DATE_KEY_FORMAT, StepRecord, StoredStep, format_date_key, parse_date_key};
