//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stride_core::Period;

#[derive(Parser)]
#[command(name = "stride")]
#[command(author, version, about = "Daily step log with calendar totals", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "STRIDE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(long, global = true, env = "STRIDE_DB", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Keep records in memory only for this invocation
    #[arg(long, global = true, conflicts_with = "db")]
    pub memory: bool,

    /// Time zone for day boundaries: local, utc, or an offset like +02:00
    #[arg(long, global = true, env = "STRIDE_TZ", value_name = "ZONE")]
    pub timezone: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record the step count for a day
    Add {
        /// Number of steps
        #[arg(allow_negative_numbers = true)]
        steps: i64,

        #[command(flatten)]
        when: WhenArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Total steps for one calendar day
    Day {
        #[command(flatten)]
        when: WhenArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Total steps for the seven days starting at a day
    Week {
        #[command(flatten)]
        when: WhenArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Total steps for the calendar year containing a day
    Year {
        #[command(flatten)]
        when: WhenArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Total steps between two dates (inclusive)
    Range {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List recorded days
    List {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Totals, averages and goal progress for a period
    Summary {
        /// Period to summarize
        #[arg(value_enum, default_value = "week")]
        period: PeriodArg,

        #[command(flatten)]
        when: WhenArgs,

        /// Daily goal (overrides config)
        #[arg(short, long)]
        goal: Option<u32>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Check that step data can be stored durably
    Doctor {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Which day a command refers to.
#[derive(Debug, Clone, Default, Args)]
pub struct WhenArgs {
    /// Calendar date (YYYY-MM-DD); defaults to today
    #[arg(short, long, value_name = "DATE")]
    pub date: Option<String>,

    /// Unix timestamp in seconds instead of a date
    #[arg(long, value_name = "SECONDS", conflicts_with = "date", allow_negative_numbers = true)]
    pub at: Option<i64>,
}

/// Inclusive date range; open ends are unbounded.
#[derive(Debug, Clone, Default, Args)]
pub struct RangeArgs {
    /// First date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Last date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Output format (defaults to config, then text)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Day,
    Week,
    Year,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Day => Period::Day,
            PeriodArg::Week => Period::Week,
            PeriodArg::Year => Period::Year,
        }
    }
}
