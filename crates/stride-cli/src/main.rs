//! Command-line step log.
//!
//! Records one step count per calendar day and reports day, week and year
//! totals. Data lives in a SQLite file under the platform data directory;
//! when that location cannot be used the session continues in memory.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `add` | Record the step count for a day |
//! | `day` | Total for one calendar day |
//! | `week` | Total for seven days starting at a day |
//! | `year` | Total for a calendar year |
//! | `range` | Total between two dates |
//! | `list` | List recorded days |
//! | `summary` | Totals, averages and goal progress |
//! | `doctor` | Storage diagnostics |
//! | `config` | Manage CLI configuration |
//!
//! # Configuration
//!
//! `~/.config/stride/config.toml` (or platform equivalent):
//!
//! ```toml
//! timezone = "local"
//! daily_goal = 10000
//! format = "text"
//!
//! [storage]
//! path = "/home/me/steps.db"
//! collection = "steps"
//! schema_version = 1
//! ```
//!
//! # Environment Variables
//!
//! - `STRIDE_CONFIG`: config file path
//! - `STRIDE_DB`: database file path
//! - `STRIDE_TZ`: time zone for day boundaries
//! - `NO_COLOR`: disable colored output when set

mod cli;
mod commands;
mod config;
mod format;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    let config = Config::load_or_default(&config_path);
    if let Err(e) = config.validate() {
        tracing::warn!("{}", e);
    }

    let zone = match &cli.timezone {
        Some(tz) => tz
            .parse::<stride_core::Zone>()
            .with_context(|| format!("Invalid --timezone '{}'", tz))?,
        None => config.zone(),
    };

    let ctx = Context {
        db_path: config.db_path(cli.db.as_deref()),
        no_color: cli.no_color || config.no_color || std::env::var_os("NO_COLOR").is_some(),
        memory: cli.memory,
        quiet: cli.quiet,
        zone,
        config_path,
        config,
    };

    match &cli.command {
        Commands::Add {
            steps,
            when,
            output,
        } => commands::cmd_add(&ctx, *steps, when, output).await,
        Commands::Day { when, output } => {
            commands::cmd_total(&ctx, stride_core::Period::Day, when, output).await
        }
        Commands::Week { when, output } => {
            commands::cmd_total(&ctx, stride_core::Period::Week, when, output).await
        }
        Commands::Year { when, output } => {
            commands::cmd_total(&ctx, stride_core::Period::Year, when, output).await
        }
        Commands::Range { range, output } => commands::cmd_range(&ctx, range, output).await,
        Commands::List { range, output } => commands::cmd_list(&ctx, range, output).await,
        Commands::Summary {
            period,
            when,
            goal,
            output,
        } => commands::cmd_summary(&ctx, (*period).into(), when, *goal, output).await,
        Commands::Doctor { output } => commands::cmd_doctor(&ctx, output).await,
        Commands::Config { action } => commands::cmd_config(&ctx, action),
    }
}
