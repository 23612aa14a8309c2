use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::AsyncWriteExt;

use oracle_exporter::metrics::{InMemoryRegistry, MetricSink};
use oracle_exporter::tailer::{LogTailer, TailerConfig};

fn fast_config() -> TailerConfig {
    TailerConfig {
        poll_interval: Duration::from_millis(20),
        reopen_backoff: Duration::from_millis(50),
        liveness_window: Duration::from_millis(800),
    }
}

fn spawn_tailer(
    license: &str,
    path: &Path,
    registry: &Arc<InMemoryRegistry>,
) -> tokio::task::JoinHandle<()> {
    let sink: Arc<dyn MetricSink> = registry.clone();
    let tailer = LogTailer::with_config(
        license.to_string(),
        path.to_path_buf(),
        sink,
        fast_config(),
    );
    tokio::spawn(tailer.run())
}

async fn append(path: &Path, lines: &[&str]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new().append(true).open(path).await?;
    for line in lines {
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
    }
    file.flush().await?;
    Ok(())
}

#[tokio::test]
async fn appended_lines_are_classified_and_historical_content_skipped() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("collector.log");
    // Content present before the tailer starts must never be replayed.
    tokio::fs::write(&path, "old :: signing with addr: addr_old\n").await?;

    let registry = Arc::new(InMemoryRegistry::new());
    let handle = spawn_tailer("001", &path, &registry);
    tokio::time::sleep(Duration::from_millis(150)).await;

    append(
        &path,
        &[
            "collector :: completed after: '42.5' seconds",
            "collector :: signing with addr: addr_test1xyz",
            "send_to_ws() :: sending message 'ADA-USD'",
            "collector :: websocket response: OK (ADA-USD)",
            "collector :: websocket response: ERROR: (rejected) (BTC-USD)",
            "collector :: websocket wait_for resp timeout for feed 'ETH-USD'",
        ],
    )
    .await?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let license = [("license", "001")];
    assert_eq!(registry.counter("oracle_signings_total", &license), 1);
    assert_eq!(
        registry.observations("oracle_cycle_duration_seconds", &license),
        vec![42.5]
    );
    assert_eq!(
        registry.gauge("oracle_last_cycle_duration_seconds", &license),
        Some(42.5)
    );
    assert_eq!(
        registry.counter(
            "oracle_feed_aggregation_success_total",
            &[("license", "001"), ("feed", "ADA-USD")]
        ),
        1
    );
    assert_eq!(
        registry.counter(
            "oracle_feed_push_success_total",
            &[("license", "001"), ("feed", "ADA-USD")]
        ),
        1
    );
    let btc = [("license", "001"), ("feed", "BTC-USD")];
    assert_eq!(registry.counter("oracle_feed_push_failure_total", &btc), 1);
    assert_eq!(
        registry.counter("oracle_feed_push_failure_error_total", &btc),
        1
    );
    let eth = [("license", "001"), ("feed", "ETH-USD")];
    assert_eq!(registry.counter("oracle_feed_push_failure_total", &eth), 1);
    assert_eq!(
        registry.counter("oracle_feed_push_failure_timeout_total", &eth),
        1
    );
    // The signing just happened, so the node is active.
    assert_eq!(registry.gauge("oracle_node_active", &license), Some(1.0));

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn garbage_lines_leave_counters_untouched() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("collector.log");
    tokio::fs::write(&path, "").await?;

    let registry = Arc::new(InMemoryRegistry::new());
    let handle = spawn_tailer("001", &path, &registry);
    tokio::time::sleep(Duration::from_millis(100)).await;

    append(
        &path,
        &[
            "an unremarkable line",
            "websocket response: MAYBE (ADA-USD)",
            "completed after: 'not-a-number' seconds",
        ],
    )
    .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let license = [("license", "001")];
    assert_eq!(registry.counter("oracle_signings_total", &license), 0);
    assert!(registry
        .observations("oracle_cycle_duration_seconds", &license)
        .is_empty());
    // Idle iterations still refresh liveness; never signed means inactive.
    assert_eq!(registry.gauge("oracle_node_active", &license), Some(0.0));

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn liveness_decays_after_the_window() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("collector.log");
    tokio::fs::write(&path, "").await?;

    let registry = Arc::new(InMemoryRegistry::new());
    let handle = spawn_tailer("001", &path, &registry);
    tokio::time::sleep(Duration::from_millis(100)).await;

    append(&path, &["collector :: signing with addr: addr_test1xyz"]).await?;
    tokio::time::sleep(Duration::from_millis(150)).await;
    let license = [("license", "001")];
    assert_eq!(registry.gauge("oracle_node_active", &license), Some(1.0));

    // Past the 800ms test window the idle loop must drop the gauge to 0.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(registry.gauge("oracle_node_active", &license), Some(0.0));

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn missing_file_retries_and_resumes_from_new_end() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("collector.log");

    let registry = Arc::new(InMemoryRegistry::new());
    let handle = spawn_tailer("001", &path, &registry);
    // Let the tailer fail to open a few times.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(registry.counter("oracle_signings_total", &[("license", "001")]), 0);

    // Create the file atomically with content already in it; the reopened
    // tailer must seek past it rather than replaying it.
    let staged = dir.path().join("collector.log.tmp");
    tokio::fs::write(&staged, "old :: signing with addr: addr_old\n").await?;
    tokio::fs::rename(&staged, &path).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    append(&path, &["collector :: signing with addr: addr_new"]).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(registry.counter("oracle_signings_total", &[("license", "001")]), 1);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn one_broken_license_does_not_affect_another() -> Result<()> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing.log");
    let healthy = dir.path().join("healthy.log");
    tokio::fs::write(&healthy, "").await?;

    let registry = Arc::new(InMemoryRegistry::new());
    let broken = spawn_tailer("001", &missing, &registry);
    let working = spawn_tailer("002", &healthy, &registry);
    tokio::time::sleep(Duration::from_millis(150)).await;

    append(&healthy, &["collector :: signing with addr: addr_test1xyz"]).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(registry.counter("oracle_signings_total", &[("license", "002")]), 1);
    assert_eq!(registry.counter("oracle_signings_total", &[("license", "001")]), 0);
    // The failing tailer still publishes its (inactive) liveness gauge.
    assert_eq!(
        registry.gauge("oracle_node_active", &[("license", "001")]),
        Some(0.0)
    );

    broken.abort();
    working.abort();
    Ok(())
}
