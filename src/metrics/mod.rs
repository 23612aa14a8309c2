//! Metrics infrastructure: catalog, injectable sink, and Prometheus exposition.

pub mod catalog;
pub mod collector;
pub mod registry;

pub use collector::{CollectorMetrics, ValidatorMetrics};
pub use registry::{InMemoryRegistry, MetricSink, PrometheusSink};

use std::net::SocketAddr;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing::info;

use crate::error::{ExporterError, Result};

/// Install the Prometheus recorder and start the scrape listener.
///
/// Validates the metric catalog first, then binds the exposition endpoint on
/// the given port. A bind failure here is fatal; this is the only operation in
/// the exporter allowed to abort startup. Must be called from within the Tokio
/// runtime since the exporter spawns its listener task on it.
pub fn init_metrics(port: u16) -> Result<()> {
    catalog::validate_catalog()?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(catalog::CYCLE_DURATION_SECONDS.to_string()),
            catalog::CYCLE_DURATION_BUCKETS,
        )
        .map_err(|e| ExporterError::Metrics(e.to_string()))?
        .install()
        .map_err(|e| ExporterError::Metrics(e.to_string()))?;

    catalog::register_all();
    info!("Prometheus metrics available at http://{}/metrics", addr);
    Ok(())
}
