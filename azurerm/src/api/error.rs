use thiserror::Error;

use super::common::ErrorDetail;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {code}: {message}")]
    ApiError {
        status: u16,
        code: String,
        message: String,
        #[source]
        details: Option<Box<ErrorDetail>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Deadline exceeded while waiting for {operation}")]
    DeadlineExceeded { operation: String },

    #[error("Long-running operation ended with status {status}: {code}: {message}")]
    OperationFailed {
        status: String,
        code: String,
        message: String,
    },

    #[error("Invalid endpoint {0:?}")]
    InvalidEndpoint(String),
}

impl ApiError {
    /// The single not-found predicate: the remote object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ApiError { status: 404, .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::ApiError { status: 409, .. })
    }

    /// The operation deadline passed. A single request timing out is not a
    /// deadline.
    pub fn is_deadline(&self) -> bool {
        matches!(self, ApiError::DeadlineExceeded { .. })
    }

    /// ARM error code, e.g. `ResourceGroupNotFound`
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::ApiError { code, .. } | ApiError::OperationFailed { code, .. } => {
                Some(code.as_str())
            }
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::ApiError { message, .. } | ApiError::OperationFailed { message, .. } => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}
