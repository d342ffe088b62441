use thiserror::Error;

/// Failure taxonomy for the synchronization pipeline.
///
/// `Transient` covers anything a caller may reasonably retry (HTTP failures,
/// timeouts, rate limits). The other named variants are terminal for the
/// operation that raised them; the orchestrator records them per stage and
/// moves on rather than aborting the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transient fetch failure: {message}")]
    Transient {
        status: Option<u16>,
        /// Seconds to wait before retrying, parsed from a Retry-After header
        /// on 429 responses when the server supplied one.
        retry_after: Option<u64>,
        message: String,
    },

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("export artifact unavailable at {locator}: {detail}")]
    ExportUnavailable { locator: String, detail: String },

    #[error("data quality: {0}")]
    DataQuality(String),

    #[error("network: {0}")]
    Net(#[from] reqwest::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("db: {0}")]
    Db(#[from] sqlx::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Shorthand for a transient failure with no HTTP status attached
    /// (timeouts, connect errors seen before any response).
    pub fn transient(message: impl Into<String>) -> Self {
        SyncError::Transient {
            status: None,
            retry_after: None,
            message: message.into(),
        }
    }

    /// Whether a caller-side retry policy may apply to this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient { .. } | SyncError::Net(_))
    }

    /// Retry-After hint in seconds, when the remote supplied one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            SyncError::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
