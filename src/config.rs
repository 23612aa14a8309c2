//! Startup configuration.
//!
//! The exporter is configured from CLI flags, an optional TOML file, or both;
//! flags override file values. The set of monitored licenses is fixed for the
//! process lifetime, and every validation problem is raised here, at startup.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ExporterError, Result};
use crate::reconciler;

pub const DEFAULT_PORT: u16 = 9101;

/// CLI flags for the `serve` subcommand.
#[derive(Debug, Default, clap::Args)]
pub struct ServeArgs {
    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Comma-separated list of licenses (e.g. 001,003)
    #[arg(long)]
    pub licenses: Option<String>,

    /// Comma-separated list of log paths, one per license
    #[arg(long)]
    pub log_paths: Option<String>,

    /// Port for the Prometheus scrape endpoint
    #[arg(long)]
    pub port: Option<u16>,

    /// Base URL of the external validator API
    #[arg(long)]
    pub api_base: Option<String>,

    /// Reconciliation poll interval in seconds
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    api_base: Option<String>,
    poll_interval_secs: Option<u64>,
    #[serde(default)]
    log_paths: BTreeMap<String, PathBuf>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExporterError::Config(format!("failed to read config file '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

/// Association of one license to its log file. Created at startup, never mutated.
#[derive(Debug, Clone)]
pub struct LogSource {
    pub license: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sources: Vec<LogSource>,
    pub port: u16,
    pub api_base: String,
    pub poll_interval: Duration,
}

impl Config {
    pub fn resolve(args: ServeArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let sources = match (&args.licenses, &args.log_paths) {
            (Some(licenses), Some(paths)) => zip_flag_sources(licenses, paths)?,
            (None, None) => file
                .log_paths
                .iter()
                .map(|(license, path)| LogSource {
                    license: license.clone(),
                    path: path.clone(),
                })
                .collect(),
            _ => {
                return Err(ExporterError::Config(
                    "--licenses and --log-paths must be given together".to_string(),
                ))
            }
        };
        if sources.is_empty() {
            return Err(ExporterError::Config("no log sources configured".to_string()));
        }
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.license.as_str()) {
                return Err(ExporterError::Config(format!(
                    "duplicate license '{}'",
                    source.license
                )));
            }
        }

        let api_base = args
            .api_base
            .or(file.api_base)
            .ok_or_else(|| ExporterError::Config("no API base URL configured".to_string()))?;

        Ok(Config {
            sources,
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            api_base,
            poll_interval: args
                .poll_interval
                .or(file.poll_interval_secs)
                .map(Duration::from_secs)
                .unwrap_or(reconciler::DEFAULT_POLL_INTERVAL),
        })
    }

    pub fn licenses(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.license.clone()).collect()
    }
}

fn zip_flag_sources(licenses: &str, paths: &str) -> Result<Vec<LogSource>> {
    let licenses: Vec<&str> = licenses
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let paths: Vec<&str> = paths
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if licenses.len() != paths.len() {
        return Err(ExporterError::Config(format!(
            "{} license(s) but {} log path(s)",
            licenses.len(),
            paths.len()
        )));
    }
    Ok(licenses
        .into_iter()
        .zip(paths)
        .map(|(license, path)| LogSource {
            license: license.to_string(),
            path: PathBuf::from(path),
        })
        .collect())
}
