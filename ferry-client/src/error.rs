//! Error types for the Ferry client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Ferry client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Credentials were rejected (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned another error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request rejected before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse failure classes callers act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Transport, server or payload problem; worth retrying
    Network,
    /// Credentials invalid or expired
    Auth,
    /// The server does not know the requested job
    NotFound,
}

impl ClientError {
    /// Create an error from a non-success status code and response body
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            _ => Self::ApiError { status, message },
        }
    }

    /// Classify this error for retry and escalation decisions
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized(_) => FailureKind::Auth,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::ApiError { status: 401, .. } => FailureKind::Auth,
            Self::ApiError { status: 404, .. } => FailureKind::NotFound,
            _ => FailureKind::Network,
        }
    }

    /// Check if this error means the credentials were rejected
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == FailureKind::Auth
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.kind() == FailureKind::NotFound
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}
