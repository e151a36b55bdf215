use std::time::Duration;

/// ETL-core errors
///
/// Upstream failures carry their retry classification so the orchestrator
/// can apply the retry budget without inspecting provider-specific details.
#[derive(thiserror::Error, Debug)]
pub enum EtlError {
    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        retryable: bool,
        /// Server-requested delay from a 429 Retry-After header
        retry_after: Option<Duration>,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EtlError {
    /// Creates an upstream error with the given retry classification
    pub fn upstream(message: impl Into<String>, retryable: bool) -> Self {
        EtlError::Upstream {
            message: message.into(),
            retryable,
            retry_after: None,
        }
    }

    /// Creates a retryable upstream error for a 429, carrying the
    /// server-requested delay when the header was present
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        EtlError::Upstream {
            message: message.into(),
            retryable: true,
            retry_after,
        }
    }

    /// Whether the orchestrator may retry the failed call
    pub fn is_retryable(&self) -> bool {
        matches!(self, EtlError::Upstream { retryable: true, .. })
    }

    /// Server-requested delay, if the upstream provided one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            EtlError::Upstream { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<sqlx::Error> for EtlError {
    fn from(e: sqlx::Error) -> Self {
        EtlError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(e: serde_json::Error) -> Self {
        EtlError::InvalidRecord(e.to_string())
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(e: reqwest::Error) -> Self {
        // Transport-level trouble is worth retrying; a body we cannot read
        // or decode will not improve on a second attempt.
        let retryable = e.is_timeout() || e.is_connect();
        EtlError::Upstream {
            message: e.to_string(),
            retryable,
            retry_after: None,
        }
    }
}

pub type EtlResult<T> = Result<T, EtlError>;
