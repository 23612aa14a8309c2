//! Injectable metric registry.
//!
//! Tasks record metrics through the [`MetricSink`] trait instead of a global,
//! so the process root owns a single instance and tests can substitute an
//! in-memory registry. All operations are safe under concurrent invocation.

use std::collections::HashMap;
use std::sync::Mutex;

use metrics::Label;

/// Thread-safe counter/gauge/histogram operations keyed by name and label set.
pub trait MetricSink: Send + Sync {
    fn increment_counter(&self, name: &'static str, labels: &[(&'static str, String)], by: u64);
    fn set_gauge(&self, name: &'static str, labels: &[(&'static str, String)], value: f64);
    fn observe_histogram(&self, name: &'static str, labels: &[(&'static str, String)], value: f64);
}

/// Production sink forwarding to the installed Prometheus recorder.
pub struct PrometheusSink;

fn to_labels(labels: &[(&'static str, String)]) -> Vec<Label> {
    labels
        .iter()
        .map(|(key, value)| Label::new(*key, value.clone()))
        .collect()
}

impl MetricSink for PrometheusSink {
    fn increment_counter(&self, name: &'static str, labels: &[(&'static str, String)], by: u64) {
        ::metrics::counter!(name, to_labels(labels)).increment(by);
    }

    fn set_gauge(&self, name: &'static str, labels: &[(&'static str, String)], value: f64) {
        ::metrics::gauge!(name, to_labels(labels)).set(value);
    }

    fn observe_histogram(&self, name: &'static str, labels: &[(&'static str, String)], value: f64) {
        ::metrics::histogram!(name, to_labels(labels)).record(value);
    }
}

type SeriesKey = (String, Vec<(String, String)>);

/// In-memory registry used by tests to assert on recorded values.
#[derive(Default)]
pub struct InMemoryRegistry {
    counters: Mutex<HashMap<SeriesKey, u64>>,
    gauges: Mutex<HashMap<SeriesKey, f64>>,
    histograms: Mutex<HashMap<SeriesKey, Vec<f64>>>,
}

// Label order is not part of a series identity; keys are sorted by label name.
fn series_key(name: &str, labels: &[(&str, &str)]) -> SeriesKey {
    let mut labels: Vec<(String, String)> = labels
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    labels.sort();
    (name.to_string(), labels)
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter series, zero if never incremented.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(&series_key(name, labels))
            .copied()
            .unwrap_or(0)
    }

    /// Current value of a gauge series, if ever set.
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.gauges
            .lock()
            .unwrap()
            .get(&series_key(name, labels))
            .copied()
    }

    /// All observations recorded against a histogram series, in order.
    pub fn observations(&self, name: &str, labels: &[(&str, &str)]) -> Vec<f64> {
        self.histograms
            .lock()
            .unwrap()
            .get(&series_key(name, labels))
            .cloned()
            .unwrap_or_default()
    }

    /// True if nothing has been recorded at all.
    pub fn is_empty(&self) -> bool {
        self.counters.lock().unwrap().is_empty()
            && self.gauges.lock().unwrap().is_empty()
            && self.histograms.lock().unwrap().is_empty()
    }
}

impl MetricSink for InMemoryRegistry {
    fn increment_counter(&self, name: &'static str, labels: &[(&'static str, String)], by: u64) {
        let borrowed: Vec<(&str, &str)> = labels.iter().map(|(k, v)| (*k, v.as_str())).collect();
        *self
            .counters
            .lock()
            .unwrap()
            .entry(series_key(name, &borrowed))
            .or_insert(0) += by;
    }

    fn set_gauge(&self, name: &'static str, labels: &[(&'static str, String)], value: f64) {
        let borrowed: Vec<(&str, &str)> = labels.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.gauges
            .lock()
            .unwrap()
            .insert(series_key(name, &borrowed), value);
    }

    fn observe_histogram(&self, name: &'static str, labels: &[(&'static str, String)], value: f64) {
        let borrowed: Vec<(&str, &str)> = labels.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.histograms
            .lock()
            .unwrap()
            .entry(series_key(name, &borrowed))
            .or_default()
            .push(value);
    }
}
