//! Offline summary statistics over a historical collector log.
//!
//! Unlike the live tailer this reads a whole file at once and reports success
//! rate and duration statistics, optionally restricted to the trailing N hours
//! of the log.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier;
use crate::error::{ExporterError, Result};

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap());

/// Marker logged once per collection attempt, successful or not.
const RUN_ATTEMPT_MARKER: &str = "acquiring collector node lock";

#[derive(Debug)]
pub struct LogSummary {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub covered_hours: i64,
    pub run_attempts: usize,
    pub successful_runs: usize,
    pub success_rate: f64,
    pub mean_duration: f64,
    pub median_duration: f64,
    pub runs_under_15s: usize,
}

fn line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let raw = TIMESTAMP_RE.find(line)?.as_str();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()
}

/// Summarize a log, optionally only its trailing `hours`.
///
/// The time span is always reported for the whole log; the `hours` window only
/// restricts which lines feed the run statistics. Lines without a parseable
/// timestamp are ignored by the window filter, matching how sparse syslog
/// captures behave.
pub fn summarize(lines: &[&str], hours: Option<i64>) -> Result<LogSummary> {
    let timestamps: Vec<NaiveDateTime> = lines.iter().filter_map(|l| line_timestamp(l)).collect();
    let (start, end) = match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ExporterError::Analysis(
                "no timestamped entries found in log".to_string(),
            ))
        }
    };
    let covered_hours = (end - start).num_seconds() / 3600;

    let window: Vec<&str> = match hours {
        Some(hours) => {
            let cutoff = end - chrono::Duration::hours(hours);
            lines
                .iter()
                .copied()
                .filter(|line| line_timestamp(line).is_some_and(|ts| ts >= cutoff))
                .collect()
        }
        None => lines.to_vec(),
    };

    let run_attempts = window
        .iter()
        .filter(|line| line.contains(RUN_ATTEMPT_MARKER))
        .count();
    let mut durations: Vec<f64> = window
        .iter()
        .filter_map(|line| classifier::cycle_duration(line))
        .collect();
    let successful_runs = durations.len();

    let success_rate = if run_attempts > 0 {
        successful_runs as f64 / run_attempts as f64 * 100.0
    } else {
        0.0
    };
    let mean_duration = if successful_runs > 0 {
        durations.iter().sum::<f64>() / successful_runs as f64
    } else {
        0.0
    };
    durations.sort_by(|a, b| a.total_cmp(b));
    let median_duration = match successful_runs {
        0 => 0.0,
        n if n % 2 == 1 => durations[n / 2],
        n => (durations[n / 2 - 1] + durations[n / 2]) / 2.0,
    };
    let runs_under_15s = durations.iter().filter(|d| **d < 15.0).count();

    Ok(LogSummary {
        start,
        end,
        covered_hours,
        run_attempts,
        successful_runs,
        success_rate,
        mean_duration,
        median_duration,
        runs_under_15s,
    })
}

/// Read a log file, summarize it, and print the report.
pub fn run(path: &Path, hours: Option<i64>) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Err(ExporterError::Analysis(format!(
            "log file is empty: {}",
            path.display()
        )));
    }

    let summary = summarize(&lines, hours)?;

    match hours {
        Some(hours) => println!("Processing the last {} hours of the log file.", hours),
        None => println!("Processing the entire log file."),
    }
    println!("Log start time: {}", summary.start);
    println!("Log end time: {}", summary.end);
    println!("Total hours in the log: {}", summary.covered_hours);
    println!("Total run attempts: {}", summary.run_attempts);
    println!("Total successful collection runs: {}", summary.successful_runs);
    println!("Success rate: {:.2}%", summary.success_rate);
    println!("Mean collection duration: {:.2} seconds", summary.mean_duration);
    println!(
        "Median collection duration: {:.2} seconds",
        summary.median_duration
    );
    println!("Number of runs under 15 seconds: {}", summary.runs_under_15s);
    Ok(())
}
