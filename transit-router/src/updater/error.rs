//! Updater error types.

/// Invalid updater configuration. Fatal at setup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read updater config: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is not valid JSON
    #[error("invalid updater config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Updater `type` is not known
    #[error("unknown updater type: {0}")]
    UnknownType(String),

    /// Data source `sourceType` is not known
    #[error("unknown environmental source type: {0}")]
    UnknownSourceType(String),

    /// A mandatory field is absent
    #[error("missing mandatory '{0}' configuration")]
    MissingField(&'static str),

    /// Header name or value cannot be sent
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure fetching or parsing one data source update.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Local file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Response is not the expected JSON
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response is not readable CSV
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failure of a running updater.
#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    /// The graph writer task has stopped
    #[error("graph writer has shut down")]
    WriterClosed,

    /// The writer dropped a job before running it
    #[error("graph writer dropped the job")]
    JobDropped,

    /// Data source failed
    #[error(transparent)]
    Source(#[from] SourceError),
}
