//! Models exchanged with the backend API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Todo entity as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Local credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful local login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// Registration payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

/// Password reset confirmation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

/// Todo creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Uploaded file passed through to the backend untouched
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Profile update, sent as multipart
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: String,
    pub image: Option<Attachment>,
}

/// Todo update, sent as multipart
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub title: String,
    pub description: String,
    pub images: Vec<Attachment>,
}

/// Application session issued by the backend for a federated identity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Result of synchronizing a federated identity with the backend
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Synced(IdentitySession),
    Failed(String),
}

/// Result of a form submission the backend may reject field by field
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome<E> {
    Accepted,
    Rejected { message: String, field_errors: E },
}

/// Per-field messages for the registration form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterFieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<Vec<String>>,
}

impl RegisterFieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.password_confirmation.is_none()
    }
}

/// Per-field messages for the password reset form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetPasswordFieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<Vec<String>>,
}

impl ResetPasswordFieldErrors {
    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.password_confirmation.is_none()
    }
}
