//! Aggregates over the run history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics;
use crate::record::RunRecord;

/// Window used when the caller does not pick one.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Totals over a set of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub runs: usize,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    /// `m:ss` per km over the totals
    pub pace: String,
    pub estimated_calories: u32,
    /// Longest single run, in meters.
    pub longest_run_meters: f64,
}

impl HistoryStats {
    pub fn average_speed(&self) -> f64 {
        metrics::average_speed(self.distance_meters, self.duration_seconds)
    }
}

/// Summarize runs that started at or after `since` (all runs when `None`).
pub fn summarize(records: &[RunRecord], since: Option<DateTime<Utc>>) -> HistoryStats {
    let mut stats = HistoryStats::default();
    for record in records
        .iter()
        .filter(|r| since.map_or(true, |cutoff| r.start_time >= cutoff))
    {
        stats.runs += 1;
        stats.distance_meters += record.distance_meters;
        stats.duration_seconds += record.duration_seconds;
        stats.estimated_calories += record.estimated_calories;
        stats.longest_run_meters = stats.longest_run_meters.max(record.distance_meters);
    }
    stats.pace = metrics::format_pace(stats.distance_meters, stats.duration_seconds);
    stats
}

/// Summarize the last `days` days, counted back from `now`.
pub fn last_days(records: &[RunRecord], days: i64, now: DateTime<Utc>) -> HistoryStats {
    summarize(records, Some(now - Duration::days(days)))
}
