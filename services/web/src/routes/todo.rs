//! Todo pages

use axum::{
    Form, Json,
    extract::{Multipart, Path, State, rejection::PathRejection},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use common::models::{NewTodo, Todo, TodoUpdate};
use serde::Deserialize;

use super::{bearer, read_attachment, read_text};
use crate::{
    error::{WebError, WebResult},
    state::AppState,
};

const TITLE_REQUIRED_MESSAGE: &str = "Please enter a title";
const TODO_NOT_FOUND_MESSAGE: &str = "Todo not found";

/// Ids are numeric; anything else cannot name a todo
fn todo_id(path: Result<Path<i64>, PathRejection>) -> WebResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| WebError::NotFound(TODO_NOT_FOUND_MESSAGE.to_string()))
}

/// New todo form
#[derive(Deserialize)]
pub struct NewTodoForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub async fn list(State(state): State<AppState>, jar: CookieJar) -> WebResult<Json<Vec<Todo>>> {
    let token = bearer(&jar)?;
    Ok(Json(state.backend.list_todos(&token).await?))
}

pub async fn create(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NewTodoForm>,
) -> WebResult<Redirect> {
    let token = bearer(&jar)?;

    let title = form.title.trim();
    if title.is_empty() {
        return Err(WebError::BadRequest(TITLE_REQUIRED_MESSAGE.to_string()));
    }

    let description = form.description.trim();
    let todo = NewTodo {
        title: title.to_string(),
        description: (!description.is_empty()).then(|| description.to_string()),
    };
    state.backend.create_todo(&token, &todo).await?;

    Ok(Redirect::to("/todo"))
}

pub async fn detail(
    State(state): State<AppState>,
    jar: CookieJar,
    path: Result<Path<i64>, PathRejection>,
) -> WebResult<Json<Todo>> {
    let id = todo_id(path)?;
    let token = bearer(&jar)?;
    Ok(Json(state.backend.get_todo(&token, id).await?))
}

/// Todo update: `title`, `description` and any number of `images`
pub async fn update(
    State(state): State<AppState>,
    jar: CookieJar,
    path: Result<Path<i64>, PathRejection>,
    mut multipart: Multipart,
) -> WebResult<Json<Todo>> {
    let id = todo_id(path)?;
    let token = bearer(&jar)?;

    let mut update = TodoUpdate::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => update.title = read_text(field).await?.trim().to_string(),
            "description" => update.description = read_text(field).await?.trim().to_string(),
            "images" => {
                if let Some(image) = read_attachment(field).await? {
                    update.images.push(image);
                }
            }
            _ => {}
        }
    }

    if update.title.is_empty() {
        return Err(WebError::BadRequest(TITLE_REQUIRED_MESSAGE.to_string()));
    }

    Ok(Json(state.backend.update_todo(&token, id, update).await?))
}
