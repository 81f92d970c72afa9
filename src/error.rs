use reqwest::StatusCode;

/// Failure while fetching or committing a single item. The job counts it
/// as `failed` and moves on to the next item.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status code {0}")]
    Status(StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure outside the per-item recovery path. Aborts the remaining items
/// and marks the summary as failed.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("invalid resource identifier {uri:?}: {source}")]
    InvalidResource {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("item step panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
#[error("preload worker has stopped")]
pub struct WorkerStopped;
