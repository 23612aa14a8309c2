pub mod analyze;
pub mod classifier;
pub mod config;
pub mod error;
pub mod liveness;
pub mod logging;
pub mod metrics;
pub mod reconciler;
pub mod tailer;
