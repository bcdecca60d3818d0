//! Doctor command implementation.
//!
//! Checks the configuration, the time zone and the database location to
//! explain why step data would or would not be saved durably.

use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use serde::Serialize;
use stride_core::PersistentStore;
use stride_core::stride_types::format_date_key;
use stride_store::{CollectionInfo, SqliteStore, StorageProbe};

use crate::cli::{OutputArgs, OutputFormat};

use super::Context;

/// Check result with status and message.
#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    passed: bool,
    warning: bool,
    message: String,
}

impl Check {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            warning: false,
            message: message.into(),
        }
    }

    fn warn(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            warning: true,
            message: message.into(),
        }
    }

    fn fail(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            warning: false,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    checks: Vec<Check>,
    probe: Option<StorageProbe>,
    collections: Vec<CollectionInfo>,
}

pub async fn cmd_doctor(ctx: &Context, output: &OutputArgs) -> Result<()> {
    let mut report = Report {
        checks: Vec::new(),
        probe: None,
        collections: Vec::new(),
    };

    report.checks.push(check_config(ctx));
    report.checks.push(check_zone(ctx));

    if ctx.memory {
        report
            .checks
            .push(Check::warn("Storage", "--memory given; nothing will be saved"));
    } else {
        let path = ctx.db_path.clone();
        let probe = tokio::task::spawn_blocking(move || stride_store::probe(&path)).await?;
        report.checks.push(check_probe(&probe));

        if probe.is_available() {
            let (check, collections) = check_collection(ctx).await;
            report.checks.push(check);
            report.collections = collections;
        }
        report.probe = Some(probe);
    }

    match ctx.format(output).format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, ctx.no_color),
    }
    Ok(())
}

fn check_config(ctx: &Context) -> Check {
    if !ctx.config_path.exists() {
        return Check::pass(
            "Config",
            format!("{} not found; using defaults", ctx.config_path.display()),
        );
    }
    match crate::config::Config::load_from(&ctx.config_path).and_then(|c| c.validate()) {
        Ok(()) => Check::pass("Config", format!("{}", ctx.config_path.display())),
        Err(e) => Check::warn("Config", e.to_string()),
    }
}

fn check_zone(ctx: &Context) -> Check {
    let now = Utc::now().timestamp();
    match ctx.zone.date_of(now) {
        Ok(today) => Check::pass(
            "Time zone",
            format!("{} (today is {})", ctx.zone, format_date_key(today)),
        ),
        Err(e) => Check::fail("Time zone", e.to_string()),
    }
}

fn check_probe(probe: &StorageProbe) -> Check {
    match &probe.problem {
        None => Check::pass(
            "Storage",
            format!(
                "{} (journal {}, SQLite {})",
                probe.path.display(),
                probe.journal_mode.as_deref().unwrap_or("unknown"),
                probe.sqlite_version
            ),
        ),
        Some(problem) => Check::fail(
            "Storage",
            format!("{}; steps will only be kept for the session", problem),
        ),
    }
}

async fn check_collection(ctx: &Context) -> (Check, Vec<CollectionInfo>) {
    let storage = &ctx.config.storage;
    let store = SqliteStore::new(&ctx.db_path);

    let result = async {
        store.open(&storage.collection, storage.schema_version).await?;
        let collections = store.collections().await?;
        store.close().await?;
        anyhow::Ok(collections)
    }
    .await;

    match result {
        Ok(collections) => {
            let documents = collections
                .iter()
                .find(|c| c.name == storage.collection)
                .map(|c| c.documents)
                .unwrap_or(0);
            let check = Check::pass(
                "Collection",
                format!(
                    "'{}' v{} with {} days recorded",
                    storage.collection, storage.schema_version, documents
                ),
            );
            (check, collections)
        }
        Err(e) => (Check::fail("Collection", e.to_string()), Vec::new()),
    }
}

fn print_report(report: &Report, no_color: bool) {
    let title = "Stride Doctor - Storage Diagnostics";
    if no_color {
        println!("{}", title);
    } else {
        println!("{}", title.cyan().bold());
    }
    println!();

    let total = report.checks.len();
    for (i, check) in report.checks.iter().enumerate() {
        let counter = format!("[{}/{}]", i + 1, total);
        let (icon, message) = if check.passed && !check.warning {
            if no_color {
                ("[OK]".to_string(), check.message.clone())
            } else {
                (format!("{}", "[OK]".green()), check.message.clone())
            }
        } else if check.warning {
            if no_color {
                ("[!!]".to_string(), check.message.clone())
            } else {
                (
                    format!("{}", "[!!]".yellow()),
                    format!("{}", check.message.yellow()),
                )
            }
        } else if no_color {
            ("[FAIL]".to_string(), check.message.clone())
        } else {
            (
                format!("{}", "[FAIL]".red()),
                format!("{}", check.message.red()),
            )
        };
        let counter = if no_color {
            counter
        } else {
            format!("{}", counter.dimmed())
        };
        println!("{} {} ... {} {}", counter, check.name, icon, message);
    }

    println!();
    println!("{}", "─".repeat(50));

    let passed = report
        .checks
        .iter()
        .filter(|c| c.passed && !c.warning)
        .count();
    let warnings = report.checks.iter().filter(|c| c.warning).count();
    let failed = report.checks.iter().filter(|c| !c.passed).count();

    if no_color {
        println!(
            "Summary: {} passed, {} warnings, {} failed",
            passed, warnings, failed
        );
    } else {
        println!(
            "Summary: {} passed, {} warnings, {} failed",
            format!("{}", passed).green(),
            format!("{}", warnings).yellow(),
            format!("{}", failed).red()
        );
    }

    if failed > 0 {
        println!();
        println!("Step data cannot be saved durably. Check that the database directory");
        println!("exists and is writable, or point --db / [storage] path elsewhere.");
    }
}
