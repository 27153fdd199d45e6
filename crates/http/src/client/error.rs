//! Client error types

use storefront_core::StorageError;
use thiserror::Error;

/// Why the credential refresh call did not produce a new pair
///
/// Cloneable so that every request waiting on the same refresh receives the
/// same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Credential refresh failed{}: {message}", status_suffix(.status))]
pub struct RefreshFailure {
    /// HTTP status of the refresh response, `None` for transport failures
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A refresh was needed but no refresh token is stored
    #[error("No refresh token available")]
    RefreshUnavailable,

    /// The refresh endpoint rejected the refresh token or could not be reached
    #[error(transparent)]
    Refresh(#[from] RefreshFailure),

    /// The task performing the refresh was dropped before it finished
    #[error("Credential refresh was abandoned")]
    RefreshAbandoned,

    /// Reading or writing the credential store failed
    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the session is gone and the user has to log in again
    pub const fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_)
                | Self::RefreshUnavailable
                | Self::Refresh(_)
                | Self::RefreshAbandoned
        )
    }

    /// HTTP status associated with the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::ServerError { status, .. } => Some(*status),
            Self::AuthenticationFailed(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::Refresh(failure) => failure.status,
            _ => None,
        }
    }
}
