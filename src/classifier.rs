//! Log line classification.
//!
//! Collector nodes write free-text log lines; this module maps each line to at
//! most one typed [`MetricEvent`]. Categories are checked in a fixed order and
//! the first match wins. Lines matching no pattern produce no event.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Feed label recorded when a failure line carries no parseable feed name.
pub const UNKNOWN_FEED: &str = "unknown";

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"completed after:\s*'([\d.]+)' seconds").unwrap());
static AGGREGATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"sending message '([^']+)'").unwrap());
static PUSH_OK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"websocket response:\s*OK\s*\(([^)]+)\)").unwrap());
static PUSH_ERROR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"websocket response:\s*ERROR:\s*\(.*?\)\s*\(([^)]+)\)").unwrap());
static PUSH_TIMEOUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"timeout for feed '([^']+)'").unwrap());

/// A single typed observation derived from one log line.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    CycleCompleted { duration: f64 },
    SigningOccurred,
    FeedAggregated { feed: String },
    FeedPushSucceeded { feed: String },
    FeedPushFailed { feed: String, cause: PushFailureCause },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFailureCause {
    Timeout,
    ErrorResponse,
    Unknown,
}

/// Extract a collection cycle duration from a line, if present and well formed.
///
/// A line that matches the pattern but carries a malformed numeric literal is
/// logged and yields `None`, so callers fall through to the other categories.
pub fn cycle_duration(line: &str) -> Option<f64> {
    let caps = DURATION_RE.captures(line)?;
    match caps[1].parse::<f64>() {
        Ok(duration) => Some(duration),
        Err(err) => {
            debug!("ignoring malformed cycle duration '{}': {}", &caps[1], err);
            None
        }
    }
}

/// Classify one raw log line into at most one metric event.
pub fn classify(line: &str) -> Option<MetricEvent> {
    // 1) Cycle duration
    if let Some(duration) = cycle_duration(line) {
        return Some(MetricEvent::CycleCompleted { duration });
    }

    // 2) Signings
    if line.contains("signing with addr:") {
        return Some(MetricEvent::SigningOccurred);
    }

    // 3) Aggregation implied by the outgoing websocket message
    if line.contains("sending message") {
        if let Some(caps) = AGGREGATION_RE.captures(line) {
            return Some(MetricEvent::FeedAggregated {
                feed: caps[1].to_string(),
            });
        }
    }

    // 4) Feed push outcomes: OK and ERROR are mutually exclusive responses
    if line.contains("websocket response: OK") {
        if let Some(caps) = PUSH_OK_RE.captures(line) {
            return Some(MetricEvent::FeedPushSucceeded {
                feed: caps[1].to_string(),
            });
        }
    } else if line.contains("websocket response: ERROR:") {
        let feed = PUSH_ERROR_RE
            .captures(line)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| UNKNOWN_FEED.to_string());
        return Some(MetricEvent::FeedPushFailed {
            feed,
            cause: PushFailureCause::ErrorResponse,
        });
    } else if line.contains("wait_for resp timeout for feed") {
        let feed = PUSH_TIMEOUT_RE
            .captures(line)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| UNKNOWN_FEED.to_string());
        return Some(MetricEvent::FeedPushFailed {
            feed,
            cause: PushFailureCause::Timeout,
        });
    }

    None
}
