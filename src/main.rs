use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use oracle_exporter::config::{Config, ServeArgs};
use oracle_exporter::metrics::{self, MetricSink, PrometheusSink};
use oracle_exporter::reconciler::{HttpValidatorApi, Reconciler};
use oracle_exporter::tailer::LogTailer;
use oracle_exporter::{analyze, logging};

#[derive(Parser)]
#[command(name = "oracle-exporter")]
#[command(about = "Prometheus exporter for oracle collector node logs")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail collector logs and serve metrics for scraping
    Serve(ServeArgs),
    /// Compute summary statistics over a historical collector log
    Analyze {
        /// Path to the log file to analyze
        #[arg(long)]
        log_file: PathBuf,
        /// Restrict analysis to the trailing N hours of the log
        #[arg(long)]
        hours: Option<i64>,
    },
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    metrics::init_metrics(config.port)?;

    let sink: Arc<dyn MetricSink> = Arc::new(PrometheusSink);

    // One permanent tail task per license; failures stay inside each task.
    for source in &config.sources {
        let tailer = LogTailer::new(source.license.clone(), source.path.clone(), sink.clone());
        tokio::spawn(tailer.run());
    }

    let api = Arc::new(HttpValidatorApi::new(&config.api_base)?);
    let reconciler = Reconciler::new(api, config.licenses(), config.poll_interval, sink);
    tokio::spawn(reconciler.run());

    info!(
        "exporter running: {} license(s), scrape port {}, reconciling every {:?}",
        config.sources.len(),
        config.port,
        config.poll_interval
    );

    // All work happens in the spawned tasks; run until externally terminated.
    std::future::pending::<()>().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => {
            let config = Config::resolve(args)?;
            serve(config).await?;
        }
        Commands::Analyze { log_file, hours } => {
            analyze::run(&log_file, hours)?;
        }
    }
    Ok(())
}
