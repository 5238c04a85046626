//! Page view models
//!
//! Pages are rendered as JSON view models. A page that shows a message before
//! moving on carries its redirect twice: as a `Refresh` header for the browser
//! and as `redirect`/`redirectAfterMs` fields for scripted clients.

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::guard::LOGIN_PATH;

/// How long a confirmation or failure message stays on screen
pub const REDIRECT_DELAY: Duration = Duration::from_secs(3);

/// Navigation that happens after a message has been shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredRedirect {
    pub target: &'static str,
    pub delay: Duration,
}

impl DeferredRedirect {
    pub fn to_login() -> Self {
        DeferredRedirect {
            target: LOGIN_PATH,
            delay: REDIRECT_DELAY,
        }
    }

    /// `Refresh` header value, e.g. `3; url=/login`
    pub fn refresh_header(&self) -> String {
        format!("{}; url={}", self.delay.as_secs(), self.target)
    }
}

/// Render `body` and navigate to the redirect target once the delay elapsed
pub fn deferred_redirect(status: StatusCode, mut body: Value, redirect: DeferredRedirect) -> Response {
    if let Some(object) = body.as_object_mut() {
        object.insert("redirect".to_string(), json!(redirect.target));
        object.insert(
            "redirectAfterMs".to_string(),
            json!(redirect.delay.as_millis() as u64),
        );
    }

    (
        status,
        [("refresh", redirect.refresh_header())],
        Json(body),
    )
        .into_response()
}
