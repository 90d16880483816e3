//! Error types for the Towerline client

use thiserror::Error;
use towerline_core::version::VersionError;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, TowerError>;

/// Errors that can occur when talking to a Tower / AWX server
#[derive(Debug, Error)]
pub enum TowerError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an unexpected status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body or error message from the API
        message: String,
    },

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The requested item does not exist on the server
    #[error("{0}")]
    NotFound(String),

    /// The server rejected the supplied credentials
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// The server rejected a launch request
    #[error("Request rejected: {0}")]
    BadRequest(String),

    /// The server rejected the extra variables of a launch request
    #[error("Extra vars rejected: {0}")]
    ExtraVarsRejected(String),

    /// A name lookup matched more than one item
    #[error("{0}")]
    NotUnique(String),

    /// The server reported a malformed version string
    #[error(transparent)]
    Version(#[from] VersionError),
}

impl TowerError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error reports rejected credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_)) || matches!(self, Self::ApiError { status: 401, .. })
    }
}
