use thiserror::Error;

/// Application-wide error types for jobfeed.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page or posting a webhook).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A job source could not be fetched.
    #[error("Fetch failed for source '{site}': {message}")]
    Fetch { site: String, message: String },

    /// The persisted seen-link store could not be parsed.
    #[error("Seen store corrupted: {0}")]
    StoreCorrupted(String),

    /// The seen-link store could not be written.
    #[error("Seen store error: {0}")]
    StoreError(String),

    /// Malformed cron expression, timezone or time of day.
    #[error("Invalid schedule: {0}")]
    ScheduleValidation(String),

    /// The messaging collaborator rejected or failed a send.
    #[error("Delivery failed: {0}")]
    DeliveryError(String),

    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying by the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::Fetch { message, .. } | AppError::HttpError(message) => {
                message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("connect")
                    || message.contains("reset")
            }
            AppError::DeliveryError(msg) => msg.contains("HTTP 429") || msg.contains("HTTP 5"),
            _ => false,
        }
    }

    /// Wrap an error raised while fetching `site`.
    pub fn fetch(site: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        AppError::Fetch {
            site: site.into(),
            message: cause.to_string(),
        }
    }
}
