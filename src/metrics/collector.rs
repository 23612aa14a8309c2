//! Translation of classifier events and reconciler results into sink updates.

use crate::classifier::{MetricEvent, PushFailureCause};
use crate::metrics::catalog;
use crate::metrics::registry::MetricSink;

fn license_labels(license: &str) -> [(&'static str, String); 1] {
    [(catalog::LABEL_LICENSE, license.to_string())]
}

fn feed_labels(license: &str, feed: &str) -> [(&'static str, String); 2] {
    [
        (catalog::LABEL_LICENSE, license.to_string()),
        (catalog::LABEL_FEED, feed.to_string()),
    ]
}

/// Metrics derived from a single license's collector log.
pub struct CollectorMetrics;

impl CollectorMetrics {
    pub fn record_event(sink: &dyn MetricSink, license: &str, event: &MetricEvent) {
        match event {
            MetricEvent::CycleCompleted { duration } => {
                let labels = license_labels(license);
                sink.observe_histogram(catalog::CYCLE_DURATION_SECONDS, &labels, *duration);
                sink.set_gauge(catalog::LAST_CYCLE_DURATION_SECONDS, &labels, *duration);
            }
            MetricEvent::SigningOccurred => {
                sink.increment_counter(catalog::SIGNINGS_TOTAL, &license_labels(license), 1);
            }
            MetricEvent::FeedAggregated { feed } => {
                sink.increment_counter(
                    catalog::FEED_AGGREGATION_SUCCESS_TOTAL,
                    &feed_labels(license, feed),
                    1,
                );
            }
            MetricEvent::FeedPushSucceeded { feed } => {
                sink.increment_counter(
                    catalog::FEED_PUSH_SUCCESS_TOTAL,
                    &feed_labels(license, feed),
                    1,
                );
            }
            MetricEvent::FeedPushFailed { feed, cause } => {
                let labels = feed_labels(license, feed);
                sink.increment_counter(catalog::FEED_PUSH_FAILURE_TOTAL, &labels, 1);
                match cause {
                    PushFailureCause::Timeout => {
                        sink.increment_counter(catalog::FEED_PUSH_FAILURE_TIMEOUT_TOTAL, &labels, 1)
                    }
                    PushFailureCause::ErrorResponse => {
                        sink.increment_counter(catalog::FEED_PUSH_FAILURE_ERROR_TOTAL, &labels, 1)
                    }
                    PushFailureCause::Unknown => {}
                }
            }
        }
    }

    pub fn set_node_active(sink: &dyn MetricSink, license: &str, active: bool) {
        let value = if active { 1.0 } else { 0.0 };
        sink.set_gauge(catalog::NODE_ACTIVE, &license_labels(license), value);
    }
}

/// Metrics derived from the external validator listing and participation counts.
pub struct ValidatorMetrics;

impl ValidatorMetrics {
    pub fn set_validator(
        sink: &dyn MetricSink,
        license: &str,
        stake_key: &str,
        alias: &str,
        staked: f64,
    ) {
        let labels = [
            (catalog::LABEL_LICENSE, license.to_string()),
            (catalog::LABEL_STAKE_KEY, stake_key.to_string()),
            (catalog::LABEL_ALIAS, alias.to_string()),
        ];
        sink.set_gauge(catalog::VALIDATOR_INFO, &labels, 1.0);
        sink.set_gauge(catalog::VALIDATOR_STAKED, &labels, staked);
    }

    pub fn record_collections(sink: &dyn MetricSink, license: &str, stake_key: &str, delta: u64) {
        let labels = [
            (catalog::LABEL_LICENSE, license.to_string()),
            (catalog::LABEL_STAKE_KEY, stake_key.to_string()),
        ];
        sink.increment_counter(catalog::EXTERNAL_COLLECTION_TOTAL, &labels, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::registry::InMemoryRegistry;

    #[test]
    fn cycle_completion_feeds_histogram_and_gauge() {
        let registry = InMemoryRegistry::new();
        CollectorMetrics::record_event(
            &registry,
            "001",
            &MetricEvent::CycleCompleted { duration: 42.5 },
        );
        assert_eq!(
            registry.observations(catalog::CYCLE_DURATION_SECONDS, &[("license", "001")]),
            vec![42.5]
        );
        assert_eq!(
            registry.gauge(catalog::LAST_CYCLE_DURATION_SECONDS, &[("license", "001")]),
            Some(42.5)
        );
    }

    #[test]
    fn error_failure_hits_generic_and_specific_counters() {
        let registry = InMemoryRegistry::new();
        CollectorMetrics::record_event(
            &registry,
            "001",
            &MetricEvent::FeedPushFailed {
                feed: "BTC-USD".to_string(),
                cause: PushFailureCause::ErrorResponse,
            },
        );
        let labels = [("license", "001"), ("feed", "BTC-USD")];
        assert_eq!(registry.counter(catalog::FEED_PUSH_FAILURE_TOTAL, &labels), 1);
        assert_eq!(
            registry.counter(catalog::FEED_PUSH_FAILURE_ERROR_TOTAL, &labels),
            1
        );
        assert_eq!(
            registry.counter(catalog::FEED_PUSH_FAILURE_TIMEOUT_TOTAL, &labels),
            0
        );
        assert_eq!(registry.counter(catalog::FEED_PUSH_SUCCESS_TOTAL, &labels), 0);
    }

    #[test]
    fn timeout_failure_hits_generic_and_timeout_counters() {
        let registry = InMemoryRegistry::new();
        CollectorMetrics::record_event(
            &registry,
            "001",
            &MetricEvent::FeedPushFailed {
                feed: "ETH-USD".to_string(),
                cause: PushFailureCause::Timeout,
            },
        );
        let labels = [("license", "001"), ("feed", "ETH-USD")];
        assert_eq!(registry.counter(catalog::FEED_PUSH_FAILURE_TOTAL, &labels), 1);
        assert_eq!(
            registry.counter(catalog::FEED_PUSH_FAILURE_TIMEOUT_TOTAL, &labels),
            1
        );
    }

    #[test]
    fn node_active_gauge_tracks_both_states() {
        let registry = InMemoryRegistry::new();
        CollectorMetrics::set_node_active(&registry, "001", true);
        assert_eq!(
            registry.gauge(catalog::NODE_ACTIVE, &[("license", "001")]),
            Some(1.0)
        );
        CollectorMetrics::set_node_active(&registry, "001", false);
        assert_eq!(
            registry.gauge(catalog::NODE_ACTIVE, &[("license", "001")]),
            Some(0.0)
        );
    }
}
