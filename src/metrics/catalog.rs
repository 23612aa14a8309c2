//! Static catalog of every metric the exporter emits.
//!
//! The catalog is the single place where metric names, help strings, and label
//! schemas are declared. It is validated and registered once at startup so a
//! misdeclared label is a configuration error, not a runtime surprise.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use tracing::info;

use crate::error::{ExporterError, Result};

pub const CYCLE_DURATION_SECONDS: &str = "oracle_cycle_duration_seconds";
pub const LAST_CYCLE_DURATION_SECONDS: &str = "oracle_last_cycle_duration_seconds";
pub const SIGNINGS_TOTAL: &str = "oracle_signings_total";
pub const FEED_AGGREGATION_SUCCESS_TOTAL: &str = "oracle_feed_aggregation_success_total";
pub const FEED_PUSH_SUCCESS_TOTAL: &str = "oracle_feed_push_success_total";
pub const FEED_PUSH_FAILURE_TOTAL: &str = "oracle_feed_push_failure_total";
pub const FEED_PUSH_FAILURE_TIMEOUT_TOTAL: &str = "oracle_feed_push_failure_timeout_total";
pub const FEED_PUSH_FAILURE_ERROR_TOTAL: &str = "oracle_feed_push_failure_error_total";
pub const NODE_ACTIVE: &str = "oracle_node_active";
pub const VALIDATOR_INFO: &str = "oracle_validator_info";
pub const VALIDATOR_STAKED: &str = "oracle_validator_staked";
pub const EXTERNAL_COLLECTION_TOTAL: &str = "oracle_external_collection_total";

pub const LABEL_LICENSE: &str = "license";
pub const LABEL_FEED: &str = "feed";
pub const LABEL_STAKE_KEY: &str = "stake_key";
pub const LABEL_ALIAS: &str = "alias";

/// Label names any metric in this exporter may use.
const ALLOWED_LABELS: &[&str] = &[LABEL_LICENSE, LABEL_FEED, LABEL_STAKE_KEY, LABEL_ALIAS];

/// Bucket boundaries for the cycle duration histogram, in seconds.
pub const CYCLE_DURATION_BUCKETS: &[f64] = &[10.0, 30.0, 60.0, 90.0, 120.0, 240.0, 480.0];

#[derive(Debug, Clone, Copy)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// Declaration of a single metric.
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub kind: MetricKind,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

/// All metrics this exporter emits.
pub fn catalog() -> Vec<MetricDoc> {
    vec![
        MetricDoc {
            name: CYCLE_DURATION_SECONDS,
            kind: MetricKind::Histogram,
            help: "Collector cycle duration in seconds",
            labels: &[LABEL_LICENSE],
        },
        MetricDoc {
            name: LAST_CYCLE_DURATION_SECONDS,
            kind: MetricKind::Gauge,
            help: "Duration in seconds of the most recent completed cycle",
            labels: &[LABEL_LICENSE],
        },
        MetricDoc {
            name: SIGNINGS_TOTAL,
            kind: MetricKind::Counter,
            help: "Number of signing operations performed during collection runs",
            labels: &[LABEL_LICENSE],
        },
        MetricDoc {
            name: FEED_AGGREGATION_SUCCESS_TOTAL,
            kind: MetricKind::Counter,
            help: "Number of feeds successfully aggregated",
            labels: &[LABEL_LICENSE, LABEL_FEED],
        },
        MetricDoc {
            name: FEED_PUSH_SUCCESS_TOTAL,
            kind: MetricKind::Counter,
            help: "Number of aggregated feeds accepted by the network",
            labels: &[LABEL_LICENSE, LABEL_FEED],
        },
        MetricDoc {
            name: FEED_PUSH_FAILURE_TOTAL,
            kind: MetricKind::Counter,
            help: "Number of aggregated feeds that failed to send to the network",
            labels: &[LABEL_LICENSE, LABEL_FEED],
        },
        MetricDoc {
            name: FEED_PUSH_FAILURE_TIMEOUT_TOTAL,
            kind: MetricKind::Counter,
            help: "Number of feed push failures due to websocket timeouts",
            labels: &[LABEL_LICENSE, LABEL_FEED],
        },
        MetricDoc {
            name: FEED_PUSH_FAILURE_ERROR_TOTAL,
            kind: MetricKind::Counter,
            help: "Number of feed push failures due to error responses",
            labels: &[LABEL_LICENSE, LABEL_FEED],
        },
        MetricDoc {
            name: NODE_ACTIVE,
            kind: MetricKind::Gauge,
            help: "1 if the node signed within the last 10 minutes, else 0",
            labels: &[LABEL_LICENSE],
        },
        MetricDoc {
            name: VALIDATOR_INFO,
            kind: MetricKind::Gauge,
            help: "Static info about this validator",
            labels: &[LABEL_LICENSE, LABEL_STAKE_KEY, LABEL_ALIAS],
        },
        MetricDoc {
            name: VALIDATOR_STAKED,
            kind: MetricKind::Gauge,
            help: "Staked amount for this validator",
            labels: &[LABEL_LICENSE, LABEL_STAKE_KEY, LABEL_ALIAS],
        },
        MetricDoc {
            name: EXTERNAL_COLLECTION_TOTAL,
            kind: MetricKind::Counter,
            help: "Externally reported collection count, tracked monotonically",
            labels: &[LABEL_LICENSE, LABEL_STAKE_KEY],
        },
    ]
}

/// Validate every declared label against the allowed schema.
///
/// Counters and histograms must carry the `license` label; an unrecognized
/// label name anywhere is a startup configuration error.
pub fn validate_catalog() -> Result<()> {
    for doc in catalog() {
        for label in doc.labels {
            if !ALLOWED_LABELS.contains(label) {
                return Err(ExporterError::Config(format!(
                    "metric '{}' declares unrecognized label '{}'",
                    doc.name, label
                )));
            }
        }
        if matches!(doc.kind, MetricKind::Counter | MetricKind::Histogram)
            && !doc.labels.contains(&LABEL_LICENSE)
        {
            return Err(ExporterError::Config(format!(
                "metric '{}' must carry the '{}' label",
                doc.name, LABEL_LICENSE
            )));
        }
    }
    Ok(())
}

/// Register help text for every metric with the installed recorder.
pub fn register_all() {
    let docs = catalog();
    for doc in &docs {
        match doc.kind {
            MetricKind::Counter => describe_counter!(doc.name, doc.help),
            MetricKind::Gauge => describe_gauge!(doc.name, doc.help),
            MetricKind::Histogram => describe_histogram!(doc.name, doc.help),
        }
    }
    info!("registered {} metrics", docs.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_passes_validation() {
        validate_catalog().expect("catalog should validate");
    }

    #[test]
    fn counters_and_histograms_carry_license() {
        for doc in catalog() {
            if matches!(doc.kind, MetricKind::Counter | MetricKind::Histogram) {
                assert!(
                    doc.labels.contains(&LABEL_LICENSE),
                    "{} is missing the license label",
                    doc.name
                );
            }
        }
    }

    #[test]
    fn metric_names_share_the_prefix() {
        for doc in catalog() {
            assert!(doc.name.starts_with("oracle_"), "bad name: {}", doc.name);
        }
    }
}
