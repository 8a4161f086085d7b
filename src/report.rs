use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::stats::{LatencySummary, summarize};
use crate::types::{RecordedRun, RunSummary};

fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.3}", r),
        None => "-".to_string(),
    }
}

fn format_run_id(run_id: Option<i64>) -> String {
    match run_id {
        Some(id) => id.to_string(),
        None => "-".to_string(),
    }
}

fn p50(durations: &[i64]) -> String {
    summarize(durations)
        .map(|s| format!("{}ms", s.p50_ms))
        .unwrap_or_else(|| "-".to_string())
}

fn header(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |s| s.dimmed())
        .to_string()
}

/// Table of freshly measured runs, one line per engine invocation.
pub fn format_results(runs: &[RecordedRun]) -> String {
    let mut out = String::new();
    out.push_str(&header("Timing runs:"));
    out.push_str("\n\n");

    out.push_str(&format!(
        "  {:>6}  {:>5}  {:>10}  {:>10}  {:>6}  {:>8}  {:>8}\n",
        "run", "batch", "sequential", "concurrent", "ratio", "seq p50", "conc p50"
    ));
    for run in runs {
        let r = &run.result;
        out.push_str(&format!(
            "  {:>6}  {:>5}  {:>10}  {:>10}  {:>6}  {:>8}  {:>8}\n",
            format_run_id(run.run_id),
            r.batch_size,
            format!("{}ms", r.sequential_total_ms),
            format!("{}ms", r.concurrent_total_ms),
            format_ratio(r.ratio()),
            p50(&r.sequential_durations_ms),
            p50(&r.concurrent_durations_ms),
        ));
    }

    if runs.is_empty() {
        out.push_str("  (no runs)\n");
    }
    out
}

#[derive(Serialize)]
struct JsonRun<'a> {
    run_id: Option<i64>,
    batch_size: usize,
    trials: usize,
    sequential_total_ms: i64,
    concurrent_total_ms: i64,
    ratio: Option<f64>,
    sequential: Option<LatencySummary>,
    concurrent: Option<LatencySummary>,
    sequential_durations_ms: &'a [i64],
    concurrent_durations_ms: &'a [i64],
}

pub fn format_results_json(runs: &[RecordedRun]) -> String {
    let json_runs: Vec<JsonRun<'_>> = runs
        .iter()
        .map(|run| {
            let r = &run.result;
            JsonRun {
                run_id: run.run_id,
                batch_size: r.batch_size,
                trials: r.trials(),
                sequential_total_ms: r.sequential_total_ms,
                concurrent_total_ms: r.concurrent_total_ms,
                ratio: r.ratio(),
                sequential: summarize(&r.sequential_durations_ms),
                concurrent: summarize(&r.concurrent_durations_ms),
                sequential_durations_ms: &r.sequential_durations_ms,
                concurrent_durations_ms: &r.concurrent_durations_ms,
            }
        })
        .collect();

    serde_json::to_string_pretty(&json_runs).unwrap_or_else(|_| "[]".to_string())
}

/// Table of stored run summaries.
pub fn format_history(runs: &[RunSummary], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&header("Recorded runs:"));
    out.push_str("\n\n");

    if runs.is_empty() {
        out.push_str("  (no runs recorded yet)\n");
        return out;
    }

    out.push_str(&format!(
        "  {:>6}  {:>5}  {:>10}  {:>10}  {:>6}  {}\n",
        "run", "batch", "sequential", "concurrent", "ratio", "recorded"
    ));
    for run in runs {
        out.push_str(&format!(
            "  {:>6}  {:>5}  {:>10}  {:>10}  {:>6}  {}\n",
            run.run_id,
            run.batch_size,
            format!("{}ms", run.sequential_total_ms),
            format!("{}ms", run.concurrent_total_ms),
            format_ratio(run.ratio),
            format_age(now - run.recorded_at),
        ));
    }
    out
}

pub fn format_history_json(runs: &[RunSummary]) -> String {
    serde_json::to_string_pretty(runs).unwrap_or_else(|_| "[]".to_string())
}

/// Compact age like "3m ago" or "2d ago".
pub fn format_age(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    if secs < 60 {
        "<1m ago".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimingResult;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn recorded(run_id: Option<i64>, batch_size: usize) -> RecordedRun {
        RecordedRun {
            run_id,
            result: TimingResult {
                batch_size,
                concurrent_durations_ms: vec![50, 50, 50, 50],
                concurrent_total_ms: 100,
                sequential_durations_ms: vec![50, 50, 50, 50],
                sequential_total_ms: 200,
            },
        }
    }

    fn summary(run_id: i64, minutes_ago: i64) -> RunSummary {
        RunSummary {
            run_id,
            recorded_at: fixed_now() - chrono::Duration::minutes(minutes_ago),
            batch_size: 4,
            sequential_total_ms: 200,
            concurrent_total_ms: 100,
            ratio: Some(0.5),
        }
    }

    #[test]
    fn results_table_has_header_and_row() {
        let out = format_results(&[recorded(Some(7), 3)]);
        assert!(out.starts_with("Timing runs:"));
        let row = out.lines().last().unwrap();
        assert!(row.contains("200ms"), "{row}");
        assert!(row.contains("100ms"), "{row}");
        assert!(row.contains("0.500"), "{row}");
        assert!(row.contains(" 7 "), "{row}");
    }

    #[test]
    fn unrecorded_run_shows_dash_for_id() {
        let out = format_results(&[recorded(None, 2)]);
        let row = out.lines().last().unwrap();
        assert!(row.trim_start().starts_with('-'), "{row}");
    }

    #[test]
    fn empty_results_say_so() {
        assert!(format_results(&[]).contains("(no runs)"));
    }

    #[test]
    fn results_json_schema() {
        let json = format_results_json(&[recorded(Some(1), 2)]);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let run = &value[0];
        assert_eq!(run["run_id"], 1);
        assert_eq!(run["batch_size"], 2);
        assert_eq!(run["trials"], 4);
        assert_eq!(run["ratio"], 0.5);
        assert_eq!(run["sequential"]["p50_ms"], 50);
        assert_eq!(run["concurrent_durations_ms"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn history_table_shows_relative_age() {
        let out = format_history(&[summary(2, 5), summary(1, 180)], fixed_now());
        assert!(out.contains("5m ago"));
        assert!(out.contains("3h ago"));
    }

    #[test]
    fn empty_history_message() {
        assert!(format_history(&[], fixed_now()).contains("no runs recorded yet"));
    }

    #[test]
    fn history_json_contains_ids() {
        let json = format_history_json(&[summary(9, 1)]);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["run_id"], 9);
        assert_eq!(value[0]["ratio"], 0.5);
    }

    #[test]
    fn age_buckets() {
        assert_eq!(format_age(chrono::Duration::seconds(10)), "<1m ago");
        assert_eq!(format_age(chrono::Duration::minutes(59)), "59m ago");
        assert_eq!(format_age(chrono::Duration::hours(5)), "5h ago");
        assert_eq!(format_age(chrono::Duration::days(3)), "3d ago");
        assert_eq!(format_age(chrono::Duration::seconds(-5)), "<1m ago");
    }
}
