//! Error types for remove.bg API calls and album transfers

use crate::types::ErrorResponse;
use thiserror::Error;

/// Result type alias for client and transfer operations
pub type Result<T> = std::result::Result<T, RemoveBgError>;

/// Error type shared by the API client, the permission gate and the batch orchestrator
#[derive(Error, Debug)]
pub enum RemoveBgError {
    /// HTTP 400: the service rejected the request parameters
    #[error("Invalid parameters: {0}")]
    InvalidParameters(ErrorResponse),

    /// HTTP 402: not enough credits left on the account
    #[error("Insufficient credits: {0}")]
    InsufficientCredits(ErrorResponse),

    /// HTTP 403: missing or invalid API key
    #[error("Authentication failed: {0}")]
    AuthFailure(ErrorResponse),

    /// HTTP 429: rate limit exceeded
    #[error("Rate limit exceeded{}: {errors}", retry_hint(.retry_after))]
    RateLimited {
        /// Seconds until the next request is allowed, from `Retry-After`
        retry_after: Option<u64>,
        /// Error body returned with the 429 response
        errors: ErrorResponse,
    },

    /// No response was received (connection, DNS, TLS, timeout)
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Any status code outside the documented table
    #[error("Unexpected HTTP status {status}: {errors}")]
    UnexpectedStatus { status: u16, errors: ErrorResponse },

    /// Request rejected locally before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A 200 response whose body or headers could not be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Local file system errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a platform collaborator (download, album, permission store)
    #[error("Platform error: {0}")]
    Platform(String),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

impl RemoveBgError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new malformed response error
    pub fn malformed_response<S: Into<String>>(msg: S) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a new platform error
    pub fn platform<S: Into<String>>(msg: S) -> Self {
        Self::Platform(msg.into())
    }

    /// Create a transport error wrapping the underlying cause
    pub fn transport<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// HTTP status that produced this error, if it came from a response
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidParameters(_) => Some(400),
            Self::InsufficientCredits(_) => Some(402),
            Self::AuthFailure(_) => Some(403),
            Self::RateLimited { .. } => Some(429),
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Error body returned by the service, if any
    #[must_use]
    pub fn error_response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::InvalidParameters(errors)
            | Self::InsufficientCredits(errors)
            | Self::AuthFailure(errors)
            | Self::RateLimited { errors, .. }
            | Self::UnexpectedStatus { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Whether a caller may reasonably try the same call again later.
    /// Nothing in this crate retries automatically.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transport { .. })
    }
}
