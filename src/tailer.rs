//! Per-license log tailing.
//!
//! Each license gets one long-lived task that opens the node's log file, seeks
//! to its end, and polls for newly appended lines. Lines are classified into
//! metric events and the liveness gauge is refreshed on every iteration, idle
//! or not, so it decays without new log activity. Any I/O failure drops the
//! task into a fixed-backoff reopen loop; tasks never terminate and never
//! affect each other.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;
use tracing::{error, info};

use crate::classifier::{classify, MetricEvent};
use crate::liveness;
use crate::metrics::{CollectorMetrics, MetricSink};

/// Timing knobs for the tail loop; defaults match production behavior.
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// Sleep between polls when no new line is available.
    pub poll_interval: Duration,
    /// Fixed backoff before re-attempting to open a missing or failed file.
    pub reopen_backoff: Duration,
    /// Window within which a signing keeps the node marked active.
    pub liveness_window: Duration,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            reopen_backoff: Duration::from_secs(60),
            liveness_window: liveness::ACTIVE_WINDOW,
        }
    }
}

pub struct LogTailer {
    license: String,
    path: PathBuf,
    config: TailerConfig,
    sink: Arc<dyn MetricSink>,
    last_signing: Option<Instant>,
}

impl LogTailer {
    pub fn new(license: String, path: PathBuf, sink: Arc<dyn MetricSink>) -> Self {
        Self::with_config(license, path, sink, TailerConfig::default())
    }

    pub fn with_config(
        license: String,
        path: PathBuf,
        sink: Arc<dyn MetricSink>,
        config: TailerConfig,
    ) -> Self {
        Self {
            license,
            path,
            config,
            sink,
            last_signing: None,
        }
    }

    /// Permanent lifetime of this license's monitoring task; never returns.
    pub async fn run(mut self) {
        loop {
            if let Err(err) = self.follow().await {
                error!(
                    license = %self.license,
                    path = %self.path.display(),
                    "tailing failed: {}. retrying in {:?}",
                    err,
                    self.config.reopen_backoff
                );
            }
            self.refresh_liveness();
            sleep(self.config.reopen_backoff).await;
        }
    }

    /// Open the file, seek to its current end, and poll for appended lines.
    ///
    /// Historical content is intentionally skipped; only lines appended after
    /// the open are observed. Returns only on an I/O error.
    async fn follow(&mut self) -> crate::error::Result<()> {
        let file = File::open(&self.path).await?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::End(0)).await?;
        info!(license = %self.license, "started tailing {}", self.path.display());

        let mut pending = String::new();
        loop {
            let read = reader.read_line(&mut pending).await?;
            if read == 0 {
                sleep(self.config.poll_interval).await;
                self.refresh_liveness();
                continue;
            }
            // A writer may be mid-line; keep accumulating until the newline lands.
            if !pending.ends_with('\n') {
                continue;
            }
            let line = std::mem::take(&mut pending);
            self.handle_line(line.trim_end());
            self.refresh_liveness();
        }
    }

    fn handle_line(&mut self, line: &str) {
        let Some(event) = classify(line) else {
            return;
        };
        if matches!(event, MetricEvent::SigningOccurred) {
            self.last_signing = Some(Instant::now());
        }
        CollectorMetrics::record_event(self.sink.as_ref(), &self.license, &event);
    }

    fn refresh_liveness(&self) {
        let active = liveness::is_active(
            self.last_signing,
            Instant::now(),
            self.config.liveness_window,
        );
        CollectorMetrics::set_node_active(self.sink.as_ref(), &self.license, active);
    }
}
