//! Command implementations for the CLI.

mod add;
mod config;
mod doctor;
mod list;
mod summary;
mod totals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use chrono::{NaiveDate, Utc};
use stride_core::stride_types::parse_date_key;
use stride_core::{StepRepository, Zone};
use stride_store::SqliteStore;
use tracing::debug;

use crate::cli::{OutputArgs, RangeArgs, WhenArgs};
use crate::config::Config;
use crate::format::FormatOptions;

pub use add::cmd_add;
pub use config::cmd_config;
pub use doctor::cmd_doctor;
pub use list::cmd_list;
pub use summary::cmd_summary;
pub use totals::{cmd_range, cmd_total};

/// Settings shared by every command, resolved from flags and config.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub zone: Zone,
    pub db_path: PathBuf,
    pub memory: bool,
    pub no_color: bool,
    pub quiet: bool,
}

impl Context {
    /// Rendering options for a command's `--format` flag.
    pub fn format(&self, output: &OutputArgs) -> FormatOptions {
        FormatOptions {
            format: output.format.unwrap_or_else(|| self.config.output_format()),
            no_color: self.no_color,
            zone: self.zone,
        }
    }

    /// Open the step repository, volatile when `--memory` was given.
    pub async fn open_repository(&self) -> Result<StepRepository> {
        let options = self.config.repository_options(self.zone);
        if self.memory {
            debug!("Using an in-memory step log");
            return Ok(StepRepository::volatile(options));
        }

        let store = SqliteStore::new(&self.db_path);
        StepRepository::open(Arc::new(store), options)
            .await
            .with_context(|| format!("Failed to open step log at {}", self.db_path.display()))
    }

    /// Timestamp a command refers to; today when neither flag is given.
    pub fn timestamp(&self, when: &WhenArgs) -> Result<i64> {
        if let Some(at) = when.at {
            return Ok(at);
        }
        match &when.date {
            Some(date) => self.midnight(parse_date(date)?),
            None => Ok(Utc::now().timestamp()),
        }
    }

    /// Inclusive `(start, end)` seconds for a date range; open ends are unbounded.
    pub fn range(&self, range: &RangeArgs) -> Result<(i64, i64)> {
        let from = range.from.as_deref().map(parse_date).transpose()?;
        let to = range.to.as_deref().map(parse_date).transpose()?;
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            bail!("--from {} is after --to {}", from, to);
        }

        let start = match from {
            Some(date) => self.midnight(date)?,
            None => i64::MIN,
        };
        let end = match to {
            Some(date) => self
                .zone
                .day_window(self.midnight(date)?)?
                .end_seconds(),
            None => i64::MAX,
        };
        Ok((start, end))
    }

    fn midnight(&self, date: NaiveDate) -> Result<i64> {
        Ok(self.zone.midnight_timestamp(date)?)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    parse_date_key(s).with_context(|| format!("Expected a date like 2024-01-31, got '{}'", s))
}
