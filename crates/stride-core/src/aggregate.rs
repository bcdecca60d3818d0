//! Range sums over calendar windows.
//!
//! [`RangeAggregator`] is a read-only view over a set of records. Every
//! query is a pure function of the records and the reference timestamp; the
//! records may be in any order.

use serde::Serialize;
use stride_types::{StepRecord, ValidationResult};

use crate::calendar::{Period, TimeWindow, Zone};
use crate::log::StepLog;

/// Computes step totals over day, week, year and arbitrary windows.
///
/// # Example
///
/// ```
/// use stride_core::{RangeAggregator, StepLog, Zone};
/// use stride_types::StepRecord;
///
/// let mut log = StepLog::new(Zone::Utc);
/// log.add_step(StepRecord::new(1_704_067_200, 8000)?)?; // 2024-01-01
///
/// let agg = RangeAggregator::new(&log);
/// assert_eq!(agg.sum_for_day(1_704_067_200)?, 8000);
/// assert_eq!(agg.sum_for_day(1_704_153_600)?, 0); // 2024-01-02
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RangeAggregator<'a> {
    records: &'a [StepRecord],
    zone: Zone,
}

impl<'a> RangeAggregator<'a> {
    /// Aggregate over a log, using its zone.
    pub fn new(log: &'a StepLog) -> Self {
        Self::from_records(log.records(), log.zone())
    }

    /// Aggregate over an arbitrary slice of records.
    pub fn from_records(records: &'a [StepRecord], zone: Zone) -> Self {
        Self { records, zone }
    }

    /// Total steps on the calendar day containing `day_timestamp`.
    pub fn sum_for_day(&self, day_timestamp: i64) -> ValidationResult<u64> {
        Ok(self.sum_in(self.zone.day_window(day_timestamp)?))
    }

    /// Total steps over the seven days starting at the day of `week_start_timestamp`.
    pub fn sum_for_week(&self, week_start_timestamp: i64) -> ValidationResult<u64> {
        Ok(self.sum_in(self.zone.week_window(week_start_timestamp)?))
    }

    /// Total steps over the calendar year containing `year_timestamp`.
    pub fn sum_for_year(&self, year_timestamp: i64) -> ValidationResult<u64> {
        Ok(self.sum_in(self.zone.year_window(year_timestamp)?))
    }

    /// Total steps for `period` around `timestamp`.
    pub fn sum_for(&self, period: Period, timestamp: i64) -> ValidationResult<u64> {
        Ok(self.sum_in(self.zone.window(period, timestamp)?))
    }

    /// Total steps with `start <= timestamp <= end` (seconds).
    pub fn sum_between(&self, start: i64, end: i64) -> u64 {
        self.sum_in(TimeWindow::from_seconds(start, end))
    }

    /// Total steps inside `window`.
    pub fn sum_in(&self, window: TimeWindow) -> u64 {
        self.matching(window).map(|r| u64::from(r.steps())).sum()
    }

    /// Records inside `window`, oldest first.
    pub fn records_in(&self, window: TimeWindow) -> Vec<StepRecord> {
        let mut records: Vec<StepRecord> = self.matching(window).copied().collect();
        records.sort_by_key(StepRecord::timestamp);
        records
    }

    /// Summary statistics for `window`.
    ///
    /// `goal` is the daily step target; days at or above it count as met.
    pub fn summarize(&self, window: TimeWindow, goal: Option<u32>) -> StepSummary {
        let mut summary = StepSummary {
            window_start: window.start_seconds(),
            window_end: window.end_seconds(),
            goal,
            ..StepSummary::default()
        };

        for record in self.matching(window) {
            summary.total += u64::from(record.steps());
            summary.days_recorded += 1;
            if goal.is_some_and(|g| record.steps() >= g) {
                summary.days_goal_met += 1;
            }
            if summary.best.is_none_or(|best| record.steps() > best.steps()) {
                summary.best = Some(*record);
            }
        }

        summary
    }

    fn matching(&self, window: TimeWindow) -> impl Iterator<Item = &'a StepRecord> + 'a {
        let records: &'a [StepRecord] = self.records;
        records.iter().filter(move |r| window.contains(r))
    }
}

/// Aggregate statistics for a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    /// First second of the window.
    pub window_start: i64,
    /// Last second of the window.
    pub window_end: i64,
    /// Sum of all steps in the window.
    pub total: u64,
    /// Number of days that have a record.
    pub days_recorded: u32,
    /// Daily goal used for `days_goal_met`.
    pub goal: Option<u32>,
    /// Days whose count reached the goal (0 without a goal).
    pub days_goal_met: u32,
    /// Day with the most steps.
    pub best: Option<StepRecord>,
}

impl StepSummary {
    /// Mean steps per recorded day.
    pub fn average(&self) -> Option<f64> {
        (self.days_recorded > 0).then(|| self.total as f64 / f64::from(self.days_recorded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    const DAY: i64 = 86_400;

    fn midnight(zone: Zone, y: i32, m: u32, d: u32) -> i64 {
        zone.midnight_timestamp(NaiveDate::from_ymd_opt(y, m, d).unwrap())
            .unwrap()
    }

    fn record(ts: i64, steps: i64) -> StepRecord {
        StepRecord::new(ts, steps).unwrap()
    }

    fn log_of(zone: Zone, entries: &[(i64, i64)]) -> StepLog {
        let mut log = StepLog::new(zone);
        for &(ts, steps) in entries {
            log.add_step(record(ts, steps)).unwrap();
        }
        log
    }

    #[test]
    fn test_single_day_scenario() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let log = log_of(zone, &[(jan1, 8000)]);
        let agg = RangeAggregator::new(&log);

        assert_eq!(agg.sum_for_day(jan1).unwrap(), 8000);
        assert_eq!(agg.sum_for_day(jan1 + 12 * 3600).unwrap(), 8000);
        assert_eq!(agg.sum_for_day(midnight(zone, 2024, 1, 2)).unwrap(), 0);
    }

    #[test]
    fn test_week_scenario() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let entries: Vec<(i64, i64)> = (0..7).map(|d| (jan1 + d * DAY + 3600, 1000)).collect();
        let log = log_of(zone, &entries);
        let agg = RangeAggregator::new(&log);

        assert_eq!(agg.sum_for_week(jan1).unwrap(), 7000);
        // Anchored one day later the window loses Jan 1
        assert_eq!(agg.sum_for_week(jan1 + DAY).unwrap(), 6000);
    }

    #[test]
    fn test_week_excludes_eighth_day() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let log = log_of(zone, &[(jan1, 1), (jan1 + 7 * DAY, 1000)]);
        assert_eq!(RangeAggregator::new(&log).sum_for_week(jan1).unwrap(), 1);
    }

    #[test]
    fn test_last_second_of_day_boundary() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let last_second = jan1 + DAY - 1;
        let log = log_of(zone, &[(last_second, 500)]);
        let agg = RangeAggregator::new(&log);

        assert_eq!(agg.sum_for_day(jan1).unwrap(), 500);
        assert_eq!(agg.sum_for_day(jan1 + DAY).unwrap(), 0);
    }

    #[test]
    fn test_boundary_record_in_exactly_one_day() {
        let zone: Zone = "+02:00".parse().unwrap();
        let day2 = midnight(zone, 2024, 3, 2);
        let log = log_of(zone, &[(day2, 42)]);
        let agg = RangeAggregator::new(&log);

        assert_eq!(agg.sum_for_day(day2 - 1).unwrap(), 0);
        assert_eq!(agg.sum_for_day(day2).unwrap(), 42);
    }

    #[test]
    fn test_leap_day_in_its_year_only() {
        let zone = Zone::Utc;
        let leap_day = midnight(zone, 2024, 2, 29) + 9 * 3600;
        let log = log_of(
            zone,
            &[
                (leap_day, 12_000),
                (midnight(zone, 2023, 12, 31) + DAY - 1, 1),
                (midnight(zone, 2025, 1, 1), 2),
            ],
        );
        let agg = RangeAggregator::new(&log);

        assert_eq!(agg.sum_for_year(leap_day).unwrap(), 12_000);
        assert_eq!(agg.sum_for_year(midnight(zone, 2023, 6, 1)).unwrap(), 1);
        assert_eq!(agg.sum_for_year(midnight(zone, 2025, 6, 1)).unwrap(), 2);
    }

    #[test]
    fn test_year_includes_december_31_last_second() {
        let zone = Zone::Utc;
        let dec31_end = midnight(zone, 2024, 12, 31) + DAY - 1;
        let log = log_of(zone, &[(dec31_end, 7)]);
        let agg = RangeAggregator::new(&log);
        assert_eq!(agg.sum_for_year(midnight(zone, 2024, 1, 1)).unwrap(), 7);
        assert_eq!(agg.sum_for_year(midnight(zone, 2025, 1, 1)).unwrap(), 0);
    }

    #[test]
    fn test_sum_for_dispatches_by_period() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let log = log_of(zone, &[(jan1, 10), (jan1 + 3 * DAY, 20), (jan1 + 40 * DAY, 30)]);
        let agg = RangeAggregator::new(&log);

        assert_eq!(agg.sum_for(Period::Day, jan1).unwrap(), 10);
        assert_eq!(agg.sum_for(Period::Week, jan1).unwrap(), 30);
        assert_eq!(agg.sum_for(Period::Year, jan1).unwrap(), 60);
    }

    #[test]
    fn test_sum_between_inclusive_seconds() {
        let zone = Zone::Utc;
        let log = log_of(zone, &[(1000, 1), (1000 + DAY, 2), (1000 + 2 * DAY, 4)]);
        let agg = RangeAggregator::new(&log);

        assert_eq!(agg.sum_between(1000, 1000 + DAY), 3);
        assert_eq!(agg.sum_between(1001, 1000 + 2 * DAY), 6);
        assert_eq!(agg.sum_between(1000 + 2 * DAY, 1000), 0);
    }

    #[test]
    fn test_empty_log_sums_to_zero() {
        let log = StepLog::new(Zone::Utc);
        let agg = RangeAggregator::new(&log);
        assert_eq!(agg.sum_for_day(0).unwrap(), 0);
        assert_eq!(agg.sum_for_week(0).unwrap(), 0);
        assert_eq!(agg.sum_for_year(0).unwrap(), 0);
    }

    #[test]
    fn test_invalid_reference_timestamp_rejected() {
        let log = StepLog::new(Zone::Utc);
        assert!(RangeAggregator::new(&log).sum_for_day(i64::MAX).is_err());
    }

    #[test]
    fn test_sum_does_not_overflow_u32() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let log = log_of(
            zone,
            &[(jan1, i64::from(u32::MAX)), (jan1 + DAY, i64::from(u32::MAX))],
        );
        assert_eq!(
            RangeAggregator::new(&log).sum_for_year(jan1).unwrap(),
            2 * u64::from(u32::MAX)
        );
    }

    #[test]
    fn test_records_in_sorted_by_time() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let log = log_of(zone, &[(jan1 + 2 * DAY, 3), (jan1, 1), (jan1 + DAY, 2)]);
        let agg = RangeAggregator::new(&log);

        let steps: Vec<u32> = agg
            .records_in(zone.week_window(jan1).unwrap())
            .iter()
            .map(StepRecord::steps)
            .collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[test]
    fn test_summarize_with_goal() {
        let zone = Zone::Utc;
        let jan1 = midnight(zone, 2024, 1, 1);
        let log = log_of(
            zone,
            &[(jan1, 12_000), (jan1 + DAY, 4_000), (jan1 + 2 * DAY, 10_000)],
        );
        let agg = RangeAggregator::new(&log);
        let summary = agg.summarize(zone.week_window(jan1).unwrap(), Some(10_000));

        assert_eq!(summary.total, 26_000);
        assert_eq!(summary.days_recorded, 3);
        assert_eq!(summary.days_goal_met, 2);
        assert_eq!(summary.best.unwrap().steps(), 12_000);
        assert!((summary.average().unwrap() - 26_000.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty_window() {
        let log = StepLog::new(Zone::Utc);
        let summary = RangeAggregator::new(&log).summarize(TimeWindow::from_seconds(0, 10), None);
        assert_eq!(summary.total, 0);
        assert!(summary.best.is_none());
        assert!(summary.average().is_none());
    }

    proptest! {
        #[test]
        fn prop_queries_are_pure(
            days in proptest::collection::btree_map(0i64..400, 0i64..50_000, 0..40),
            probe in 0i64..400,
        ) {
            let zone = Zone::Utc;
            let base = midnight(zone, 2024, 1, 1);
            let entries: Vec<(i64, i64)> = days.iter().map(|(d, s)| (base + d * DAY, *s)).collect();
            let log = log_of(zone, &entries);
            let agg = RangeAggregator::new(&log);
            let reference = base + probe * DAY;

            let first = (
                agg.sum_for_day(reference).unwrap(),
                agg.sum_for_week(reference).unwrap(),
                agg.sum_for_year(reference).unwrap(),
            );
            let _ = agg.sum_for_year(base);
            let second = (
                agg.sum_for_day(reference).unwrap(),
                agg.sum_for_week(reference).unwrap(),
                agg.sum_for_year(reference).unwrap(),
            );
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_order_does_not_matter(
            days in proptest::collection::btree_map(0i64..60, 0i64..50_000, 0..30),
        ) {
            let zone = Zone::Utc;
            let base = midnight(zone, 2024, 1, 1);
            let entries: Vec<(i64, i64)> = days.iter().map(|(d, s)| (base + d * DAY, *s)).collect();
            let mut reversed = entries.clone();
            reversed.reverse();

            let forward = log_of(zone, &entries);
            let backward = log_of(zone, &reversed);
            for week in 0..9 {
                let reference = base + week * 7 * DAY;
                prop_assert_eq!(
                    RangeAggregator::new(&forward).sum_for_week(reference).unwrap(),
                    RangeAggregator::new(&backward).sum_for_week(reference).unwrap()
                );
            }
        }

        #[test]
        fn prop_days_partition_the_year(
            days in proptest::collection::btree_map(0i64..366, 0i64..50_000, 0..50),
        ) {
            let zone = Zone::Utc;
            let base = midnight(zone, 2024, 1, 1);
            let entries: Vec<(i64, i64)> = days
                .iter()
                .map(|(d, s)| (base + d * DAY + 100, *s))
                .collect();
            let log = log_of(zone, &entries);
            let agg = RangeAggregator::new(&log);

            let by_day: u64 = (0..366).map(|d| agg.sum_for_day(base + d * DAY).unwrap()).sum();
            prop_assert_eq!(by_day, agg.sum_for_year(base).unwrap());
        }
    }
}
