//! Output formatting for totals, record lists and summaries.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use stride_core::stride_types::format_date_key;
use stride_core::{Durability, StepRecord, StepSummary, TimeWindow, WriteOutcome, Zone};

use crate::cli::OutputFormat;

/// Shared rendering options.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub format: OutputFormat,
    pub no_color: bool,
    pub zone: Zone,
}

impl FormatOptions {
    /// Calendar date of `timestamp`; `*` for an unbounded range end.
    fn date(&self, timestamp: i64) -> String {
        self.zone
            .date_of(timestamp)
            .map(format_date_key)
            .unwrap_or_else(|_| "*".to_string())
    }
}

/// `1234567` -> `1,234,567`
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn steps(n: u64, no_color: bool) -> String {
    let text = group_digits(n);
    if no_color {
        text
    } else {
        format!("{}", text.bold())
    }
}

#[derive(Serialize)]
struct JsonWrite {
    date: String,
    timestamp: i64,
    steps: u32,
    durability: Durability,
}

/// Confirmation for a stored record.
pub fn format_outcome(outcome: &WriteOutcome, opts: FormatOptions) -> Result<String> {
    let durability = if outcome.is_durable() {
        Durability::Durable
    } else {
        Durability::Volatile
    };
    match opts.format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonWrite {
            date: format_date_key(outcome.date()),
            timestamp: outcome.record().timestamp(),
            steps: outcome.record().steps(),
            durability,
        })?),
        OutputFormat::Text => {
            let mut line = format!(
                "Recorded {} steps for {}",
                steps(u64::from(outcome.record().steps()), opts.no_color),
                format_date_key(outcome.date())
            );
            if !outcome.is_durable() {
                let note = " (kept in memory only, not saved)";
                if opts.no_color {
                    line.push_str(note);
                } else {
                    line.push_str(&format!("{}", note.yellow()));
                }
            }
            Ok(line)
        }
    }
}

#[derive(Serialize)]
struct JsonTotal<'a> {
    period: &'a str,
    from: String,
    to: String,
    total: u64,
}

/// A single total over a window.
pub fn format_total(
    label: &str,
    window: TimeWindow,
    total: u64,
    opts: FormatOptions,
) -> Result<String> {
    let from = opts.date(window.start_seconds());
    let to = opts.date(window.end_seconds());
    match opts.format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonTotal {
            period: label,
            from,
            to,
            total,
        })?),
        OutputFormat::Text => {
            let span = if from == to {
                from
            } else {
                format!("{} .. {}", from, to)
            };
            Ok(format!("{}: {} steps", span, steps(total, opts.no_color)))
        }
    }
}

#[derive(Serialize)]
struct JsonRecord {
    date: String,
    timestamp: i64,
    steps: u32,
}

/// One line per record, oldest first.
pub fn format_records(records: &[StepRecord], opts: FormatOptions) -> Result<String> {
    match opts.format {
        OutputFormat::Json => {
            let rows: Vec<_> = records
                .iter()
                .map(|r| JsonRecord {
                    date: opts.date(r.timestamp()),
                    timestamp: r.timestamp(),
                    steps: r.steps(),
                })
                .collect();
            Ok(serde_json::to_string_pretty(&rows)?)
        }
        OutputFormat::Text => {
            if records.is_empty() {
                return Ok("No records".to_string());
            }
            let width = records
                .iter()
                .map(|r| group_digits(u64::from(r.steps())).len())
                .max()
                .unwrap_or(0);
            let lines: Vec<String> = records
                .iter()
                .map(|r| {
                    let count = format!("{:>width$}", group_digits(u64::from(r.steps())));
                    let count = if opts.no_color {
                        count
                    } else {
                        format!("{}", count.bold())
                    };
                    format!("{}  {}", opts.date(r.timestamp()), count)
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    period: &'a str,
    from: String,
    to: String,
    #[serde(flatten)]
    summary: &'a StepSummary,
    average: Option<f64>,
}

/// Summary block for a period.
pub fn format_summary(label: &str, summary: &StepSummary, opts: FormatOptions) -> Result<String> {
    let from = opts.date(summary.window_start);
    let to = opts.date(summary.window_end);
    match opts.format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonSummary {
            period: label,
            from,
            to,
            summary,
            average: summary.average(),
        })?),
        OutputFormat::Text => {
            let title = format!("Summary for {} {} .. {}", label, from, to);
            let mut lines = vec![if opts.no_color {
                title
            } else {
                format!("{}", title.cyan().bold())
            }];
            lines.push(format!(
                "  Total:         {}",
                steps(summary.total, opts.no_color)
            ));
            lines.push(format!("  Days recorded: {}", summary.days_recorded));
            if let Some(avg) = summary.average() {
                lines.push(format!(
                    "  Daily average: {}",
                    group_digits(avg.round() as u64)
                ));
            }
            if let Some(best) = &summary.best {
                lines.push(format!(
                    "  Best day:      {} ({})",
                    opts.date(best.timestamp()),
                    group_digits(u64::from(best.steps()))
                ));
            }
            if let Some(goal) = summary.goal {
                let met = format!("{}/{}", summary.days_goal_met, summary.days_recorded);
                let met = match (opts.no_color, summary.days_goal_met == summary.days_recorded) {
                    (true, _) => met,
                    (false, true) => format!("{}", met.green()),
                    (false, false) => format!("{}", met.yellow()),
                };
                lines.push(format!(
                    "  Goal {}:  {} days",
                    group_digits(u64::from(goal)),
                    met
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text() -> FormatOptions {
        FormatOptions {
            format: OutputFormat::Text,
            no_color: true,
            zone: Zone::Utc,
        }
    }

    fn json() -> FormatOptions {
        FormatOptions {
            format: OutputFormat::Json,
            ..text()
        }
    }

    const JAN_1: i64 = 1_704_067_200;

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1_234_567), "1,234,567");
    }

    fn outcome(durable: bool) -> WriteOutcome {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let record = StepRecord::new(JAN_1, 8000).unwrap();
        if durable {
            WriteOutcome::Committed { date, record }
        } else {
            WriteOutcome::Volatile { date, record }
        }
    }

    #[test]
    fn test_outcome_text_committed() {
        let out = format_outcome(&outcome(true), text()).unwrap();
        assert_eq!(out, "Recorded 8,000 steps for 2024-01-01");
    }

    #[test]
    fn test_outcome_text_volatile_says_memory_only() {
        let out = format_outcome(&outcome(false), text()).unwrap();
        assert_eq!(
            out,
            "Recorded 8,000 steps for 2024-01-01 (kept in memory only, not saved)"
        );
    }

    #[test]
    fn test_outcome_json_reports_durability() {
        let out = format_outcome(&outcome(false), json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["durability"], "volatile");
        assert_eq!(value["steps"], 8000);
    }

    #[test]
    fn test_total_text_for_single_day() {
        let window = Zone::Utc.day_window(JAN_1).unwrap();
        let out = format_total("day", window, 8000, text()).unwrap();
        assert_eq!(out, "2024-01-01: 8,000 steps");
    }

    #[test]
    fn test_total_text_for_week() {
        let window = Zone::Utc.week_window(JAN_1).unwrap();
        let out = format_total("week", window, 7000, text()).unwrap();
        assert_eq!(out, "2024-01-01 .. 2024-01-07: 7,000 steps");
    }

    #[test]
    fn test_total_json() {
        let window = Zone::Utc.year_window(JAN_1).unwrap();
        let out = format_total("year", window, 42, json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["period"], "year");
        assert_eq!(value["from"], "2024-01-01");
        assert_eq!(value["to"], "2024-12-31");
        assert_eq!(value["total"], 42);
    }

    #[test]
    fn test_unbounded_range_text() {
        let window = TimeWindow::from_seconds(i64::MIN, i64::MAX);
        let out = format_total("range", window, 12, text()).unwrap();
        assert_eq!(out, "* .. *: 12 steps");
    }

    #[test]
    fn test_records_text_aligns_counts() {
        let records = vec![
            StepRecord::new(JAN_1, 500).unwrap(),
            StepRecord::new(JAN_1 + 86_400, 12000).unwrap(),
        ];
        let out = format_records(&records, text()).unwrap();
        assert_eq!(out, "2024-01-01     500\n2024-01-02  12,000");
        assert_eq!(format_records(&[], text()).unwrap(), "No records");
    }

    #[test]
    fn test_summary_json_includes_average() {
        let summary = StepSummary {
            window_start: JAN_1,
            window_end: JAN_1 + 7 * 86_400 - 1,
            total: 3000,
            days_recorded: 2,
            goal: Some(2000),
            days_goal_met: 1,
            best: Some(StepRecord::new(JAN_1, 2000).unwrap()),
        };
        let out = format_summary("week", &summary, json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total"], 3000);
        assert_eq!(value["average"], 1500.0);
        assert_eq!(value["days_goal_met"], 1);
        assert_eq!(value["to"], "2024-01-07");
    }

    #[test]
    fn test_summary_text_without_records() {
        let summary = StepSummary {
            window_start: JAN_1,
            window_end: JAN_1 + 86_399,
            ..StepSummary::default()
        };
        let out = format_summary("day", &summary, text()).unwrap();
        assert!(out.contains("Total:         0"));
        assert!(!out.contains("Daily average"));
        assert!(!out.contains("Best day"));
    }
}
