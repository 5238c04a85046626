//! Dashboard and profile pages

use axum::{
    Json,
    extract::{Multipart, State},
};
use axum_extra::extract::cookie::CookieJar;
use common::models::{User, UserUpdate};
use serde_json::{Value, json};
use tracing::info;

use super::{bearer, read_attachment, read_text};
use crate::{
    error::{WebError, WebResult},
    state::AppState,
    validation::validate_name,
};

pub async fn dashboard(State(state): State<AppState>, jar: CookieJar) -> WebResult<Json<Value>> {
    let token = bearer(&jar)?;

    let user = state.backend.current_user(&token).await?;
    let todos = state.backend.list_todos(&token).await?;

    Ok(Json(json!({ "user": user, "todos": todos })))
}

pub async fn profile(State(state): State<AppState>, jar: CookieJar) -> WebResult<Json<Value>> {
    let token = bearer(&jar)?;
    let user = state.backend.current_user(&token).await?;

    Ok(Json(json!({ "user": user })))
}

/// Profile update: `name` and an optional `image`
pub async fn update_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> WebResult<Json<User>> {
    let token = bearer(&jar)?;

    let mut update = UserUpdate::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => update.name = read_text(field).await?.trim().to_string(),
            "image" => update.image = read_attachment(field).await?,
            _ => {}
        }
    }

    validate_name(&update.name).map_err(WebError::BadRequest)?;

    let user = state.backend.update_user(&token, update).await?;
    info!("Profile updated for user {}", user.id);

    Ok(Json(user))
}
