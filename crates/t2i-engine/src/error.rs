use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Terminal outcome of a failed generation call.
///
/// Every variant carries enough context (URL, status, truncated body) to
/// diagnose the failure without re-running the call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Missing credential, base URL or model; raised before any network call
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-2xx answer from a create, poll or fetch call
    #[error("request failed ({status}) for {url}: {body}")]
    Request {
        status: u16,
        url: String,
        body: String,
    },

    /// The transport could not complete the exchange
    #[error("transport error for {url}: {message}")]
    Transport {
        url: String,
        message: String,
        timed_out: bool,
    },

    /// 2xx answer whose body is not JSON
    #[error("invalid JSON response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Task submission answered without `task_id`/`id`
    #[error("task submission response carried no task id: {snippet}")]
    MissingTaskId { snippet: String },

    /// Terminal success without a usable image reference
    #[error("no image found in provider response: {snippet}")]
    Extraction { snippet: String },

    /// The provider marked the task as failed
    #[error("provider reported failure: {0}")]
    ProviderFailure(String),

    #[error(
        "task {task_id} timed out after {:.1}s (last status: {})",
        .elapsed.as_secs_f64(),
        .last_status.as_deref().unwrap_or("none")
    )]
    Timeout {
        task_id: String,
        elapsed: Duration,
        last_status: Option<String>,
    },

    /// Inline payload is not valid base64
    #[error("inline image decode failed: {0}")]
    Decode(String),

    #[error("task {task_id} cancelled")]
    Cancelled { task_id: String },
}

impl GenerationError {
    /// HTTP status of the failing exchange, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transient failures: transport errors, 5xx and 429
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Request { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Stable machine-readable kind, for callers that log structured fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Request { .. } => "request_error",
            Self::Transport { .. } => "transport_error",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::MissingTaskId { .. } => "missing_task_id",
            Self::Extraction { .. } => "extraction_error",
            Self::ProviderFailure(_) => "provider_failure",
            Self::Timeout { .. } => "timeout",
            Self::Decode(_) => "decode_error",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
