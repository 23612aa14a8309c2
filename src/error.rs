use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics exporter error: {0}")]
    Metrics(String),

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Log analysis error: {0}")]
    Analysis(String),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
