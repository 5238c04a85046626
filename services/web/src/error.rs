//! Custom error types for the web service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use common::BackendError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{cookies::clear_session, guard::LOGIN_PATH};

/// Shown when the backend cannot be reached
pub const BACKEND_UNAVAILABLE_MESSAGE: &str =
    "Could not connect to the server. Please try again later.";

/// Custom error type for the web service
#[derive(Error, Debug)]
pub enum WebError {
    /// No usable session; the browser is sent back to the login page
    #[error("Unauthorized")]
    Unauthorized,

    /// Credentials were refused
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Form rejected with per-field messages
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field_errors: serde_json::Value,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend rejected or failed the request
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),
}

impl WebError {
    /// Validation error carrying a serializable field-error record
    pub fn validation<E: Serialize>(message: impl Into<String>, field_errors: &E) -> Self {
        WebError::Validation {
            message: message.into(),
            field_errors: serde_json::to_value(field_errors).unwrap_or_default(),
        }
    }
}

impl From<BackendError> for WebError {
    fn from(err: BackendError) -> Self {
        match err {
            err if err.is_unauthorized() => WebError::Unauthorized,
            BackendError::Rejected { status, message } if status.as_u16() == 404 => {
                WebError::NotFound(message)
            }
            err => WebError::Backend(err),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            WebError::Unauthorized => {
                // Stale session: drop both tokens so the guard stops letting it through
                let jar = clear_session(CookieJar::new());
                return (jar, Redirect::to(LOGIN_PATH)).into_response();
            }
            WebError::Authentication(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            WebError::Validation {
                message,
                field_errors,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "fieldErrors": field_errors }),
            ),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            WebError::Backend(BackendError::Rejected { status, message }) => {
                warn!("Backend rejected request ({}): {}", status, message);
                let status = StatusCode::from_u16(status.as_u16())
                    .ok()
                    .filter(|s| s.is_client_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (status, json!({ "error": message }))
            }
            WebError::Backend(err) => {
                error!("Backend request failed: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": BACKEND_UNAVAILABLE_MESSAGE }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for web results
pub type WebResult<T> = Result<T, WebError>;
