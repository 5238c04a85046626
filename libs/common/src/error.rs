//! Custom error types for the common library
//!
//! This module defines the errors raised while talking to the backend API.

use reqwest::StatusCode;
use thiserror::Error;

/// Custom error type for backend API calls
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend could not be reached or the connection broke mid-request
    #[error("Backend transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// The backend answered with a body we could not understand
    #[error("Backend response decode error: {0}")]
    Decode(String),

    /// An uploaded file could not be forwarded
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    /// Configuration error
    #[error("Backend configuration error: {0}")]
    Configuration(String),
}

impl BackendError {
    /// True when the backend refused the bearer token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Rejected { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err)
        }
    }
}

/// Type alias for Result with BackendError
pub type BackendResult<T> = Result<T, BackendError>;
