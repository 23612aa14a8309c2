//! Reconciliation of externally reported cumulative counts.
//!
//! On a fixed interval the reconciler fetches validator metadata and cumulative
//! participation counts from the network API and converts the latter into a
//! monotonic local counter. The external source may reset or roll back; a
//! regression resets the tracked baseline and emits no delta. Failures are
//! isolated per license so one broken entry never blocks the rest of a cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{ExporterError, Result};
use crate::metrics::{MetricSink, ValidatorMetrics};

/// HTTP timeout for each external fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between reconciliation cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(900);

/// One entry from the validator listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorEntry {
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default)]
    pub staking: String,
    #[serde(default)]
    pub staked: f64,
    #[serde(default)]
    pub alias: String,
}

/// External network API surface, kept behind a trait so cycles are testable.
#[async_trait]
pub trait ValidatorApi: Send + Sync {
    async fn list_validators(&self) -> Result<Vec<ValidatorEntry>>;
    async fn participation_counts(&self) -> Result<HashMap<String, u64>>;
}

pub struct HttpValidatorApi {
    client: reqwest::Client,
    base: String,
}

impl HttpValidatorApi {
    pub fn new(base: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ValidatorApi for HttpValidatorApi {
    async fn list_validators(&self) -> Result<Vec<ValidatorEntry>> {
        let url = format!("{}/itn_aliases_and_staking", self.base);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn participation_counts(&self) -> Result<HashMap<String, u64>> {
        let url = format!("{}/get_participants_counts_total", self.base);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Apply one observation of a cumulative external total.
///
/// Returns the delta to emit and the new baseline. The first observation
/// establishes the baseline with no delta; a regression resets the baseline,
/// also with no delta.
pub fn reconcile_total(previous: Option<u64>, observed: u64) -> (u64, u64) {
    match previous {
        None => (0, observed),
        Some(last) if observed >= last => (observed - last, observed),
        Some(_) => (0, observed),
    }
}

pub struct Reconciler {
    api: Arc<dyn ValidatorApi>,
    licenses: Vec<String>,
    poll_interval: Duration,
    sink: Arc<dyn MetricSink>,
    totals: HashMap<(String, String), u64>,
}

impl Reconciler {
    pub fn new(
        api: Arc<dyn ValidatorApi>,
        licenses: Vec<String>,
        poll_interval: Duration,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        Self {
            api,
            licenses,
            poll_interval,
            sink,
            totals: HashMap::new(),
        }
    }

    /// Reconciliation loop; never returns. If a cycle overruns the interval
    /// the next one simply starts after the sleep, with no catch-up.
    pub async fn run(mut self) {
        loop {
            self.run_cycle().await;
            sleep(self.poll_interval).await;
        }
    }

    /// One pass over all licenses, isolating failures per license.
    pub async fn run_cycle(&mut self) {
        for license in self.licenses.clone() {
            if let Err(err) = self.reconcile_license(&license).await {
                error!(license = %license, "reconciliation failed: {}", err);
            }
        }
    }

    async fn reconcile_license(&mut self, license: &str) -> Result<()> {
        let entry = self.find_validator(license).await?;
        ValidatorMetrics::set_validator(
            self.sink.as_ref(),
            license,
            &entry.staking,
            &entry.alias,
            entry.staked,
        );

        let counts = self.api.participation_counts().await?;
        let observed = counts.get(&entry.staking).copied().unwrap_or(0);

        let key = (license.to_string(), entry.staking.clone());
        let previous = self.totals.get(&key).copied();
        if let Some(last) = previous {
            if observed < last {
                info!(
                    license = %license,
                    "external total dropped from {} to {}, resetting baseline",
                    last,
                    observed
                );
            }
        }
        let (delta, baseline) = reconcile_total(previous, observed);
        self.totals.insert(key, baseline);
        if delta > 0 {
            ValidatorMetrics::record_collections(self.sink.as_ref(), license, &entry.staking, delta);
        }
        debug!(license = %license, observed, delta, "reconciled external total");
        Ok(())
    }

    async fn find_validator(&self, license: &str) -> Result<ValidatorEntry> {
        let needle = format!("Validator License #{}", license);
        let entries = self.api.list_validators().await?;
        entries
            .into_iter()
            .find(|entry| entry.licenses.iter().any(|l| l == &needle))
            .ok_or_else(|| ExporterError::Api {
                message: format!("no validator entry for license {}", license),
            })
    }
}
