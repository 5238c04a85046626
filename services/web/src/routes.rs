//! Web service routes

mod auth;
mod pages;
mod todo;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, multipart::Field},
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use common::models::Attachment;

use crate::{
    cookies::bearer_token,
    error::{WebError, WebResult},
    guard::{DASHBOARD_PATH, route_guard},
    state::AppState,
};

/// Uploads are passed through to the backend, so allow photo-sized bodies
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create the router for the web service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(index))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/login/sso", get(auth::start_sso))
        .route("/login/google", get(auth::start_google))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
        .route("/register", post(auth::register))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/verify", get(auth::verify))
        .route("/dashboard", get(pages::dashboard))
        .route("/profile", get(pages::profile).post(pages::update_profile))
        .route("/todo", get(todo::list).post(todo::create))
        .route("/todo/:id", get(todo::detail).post(todo::update))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "todo-web"
    }))
}

pub async fn index() -> Redirect {
    Redirect::to(DASHBOARD_PATH)
}

/// Bearer token for backend calls, or a trip back to the login page
fn bearer(jar: &CookieJar) -> WebResult<String> {
    bearer_token(jar).ok_or(WebError::Unauthorized)
}

async fn read_text(field: Field<'_>) -> WebResult<String> {
    field
        .text()
        .await
        .map_err(|e| WebError::BadRequest(format!("Invalid form field: {}", e)))
}

/// Uploaded file; an empty part means no file was chosen
async fn read_attachment(field: Field<'_>) -> WebResult<Option<Attachment>> {
    let file_name = field
        .file_name()
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| WebError::BadRequest(format!("Invalid upload: {}", e)))?;

    if bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(Attachment {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}
