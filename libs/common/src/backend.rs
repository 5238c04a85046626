//! Client for the todo backend API
//!
//! Every page of the web service is a thin view over this API. The client
//! owns no state besides its HTTP connection pool; authenticated calls take
//! the bearer token explicitly so callers decide which cookie it comes from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Response,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{error, info, warn};

use crate::{
    error::{BackendError, BackendResult},
    models::{
        Attachment, FormOutcome, IdentitySession, LoginRequest, LoginResponse, NewTodo,
        RegisterFieldErrors, RegisterRequest, ResetPasswordFieldErrors, ResetPasswordRequest,
        SyncOutcome, Todo, TodoUpdate, User, UserUpdate,
    },
};

/// Message used when the backend refuses an identity without saying why
pub const DEFAULT_SYNC_FAILURE: &str = "Authentication failed";

/// Backend API configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g., "http://todo-express:3000")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl BackendConfig {
    /// Create a new BackendConfig from environment variables
    ///
    /// # Environment Variables
    /// - `API_BASE_URL`: Backend base URL (default: "http://todo-express:3000")
    /// - `API_TIMEOUT_SECONDS`: Request timeout (default: 10)
    pub fn from_env() -> BackendResult<Self> {
        let base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://todo-express:3000".to_string());

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::Configuration(format!(
                "API_BASE_URL must be an http(s) URL, got {}",
                base_url
            )));
        }

        let timeout_seconds = std::env::var("API_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            base_url,
            timeout_seconds,
        })
    }
}

/// Operations the web service needs from the backend
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Authenticate with local credentials
    async fn login(&self, credentials: &LoginRequest) -> BackendResult<LoginResponse>;

    /// Register a new local account
    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> BackendResult<FormOutcome<RegisterFieldErrors>>;

    /// Ask the backend to email a password reset link
    async fn request_password_reset(&self, email: &str) -> BackendResult<()>;

    /// Set a new password using a reset token
    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> BackendResult<FormOutcome<ResetPasswordFieldErrors>>;

    /// Confirm an account with the token sent by email
    async fn verify_account(&self, token: &str) -> BackendResult<()>;

    /// Create or update the application user behind an identity-provider token
    async fn sync_identity_user(&self, identity_token: &str) -> BackendResult<SyncOutcome>;

    async fn current_user(&self, bearer: &str) -> BackendResult<User>;

    async fn update_user(&self, bearer: &str, update: UserUpdate) -> BackendResult<User>;

    async fn list_todos(&self, bearer: &str) -> BackendResult<Vec<Todo>>;

    async fn get_todo(&self, bearer: &str, id: i64) -> BackendResult<Todo>;

    async fn create_todo(&self, bearer: &str, todo: &NewTodo) -> BackendResult<Todo>;

    async fn update_todo(&self, bearer: &str, id: i64, update: TodoUpdate) -> BackendResult<Todo>;
}

/// Error body shape used by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody<E> {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "fieldErrors")]
    field_errors: Option<E>,
}

impl<E> ErrorBody<E> {
    fn into_message(self, fallback: &str) -> (String, Option<E>) {
        let message = self
            .error
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        (message, self.field_errors)
    }
}

/// reqwest implementation of [`BackendApi`]
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackendError::Configuration(e.to_string()))?;

        info!("Backend client initialized with URL: {}", config.base_url);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn rejection(response: Response, fallback: &str) -> BackendError {
        let status = response.status();
        let (message, _) = response
            .json::<ErrorBody<serde_json::Value>>()
            .await
            .map(|body| body.into_message(fallback))
            .unwrap_or_else(|_| (fallback.to_string(), None));

        BackendError::Rejected { status, message }
    }

    async fn expect_json<T: DeserializeOwned>(
        response: Response,
        fallback: &str,
    ) -> BackendResult<T> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::rejection(response, fallback).await)
        }
    }

    async fn expect_success(response: Response, fallback: &str) -> BackendResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::rejection(response, fallback).await)
        }
    }

    /// Client errors carry per-field messages, server errors do not
    async fn form_outcome<E: DeserializeOwned + Default>(
        response: Response,
        fallback: &str,
    ) -> BackendResult<FormOutcome<E>> {
        let status = response.status();
        if status.is_success() {
            return Ok(FormOutcome::Accepted);
        }
        if !status.is_client_error() {
            return Err(Self::rejection(response, fallback).await);
        }

        let (message, field_errors) = response
            .json::<ErrorBody<E>>()
            .await
            .map(|body| body.into_message(fallback))
            .unwrap_or_else(|_| (fallback.to_string(), None));

        Ok(FormOutcome::Rejected {
            message,
            field_errors: field_errors.unwrap_or_default(),
        })
    }
}

fn attachment_part(attachment: Attachment) -> BackendResult<Part> {
    let mut part = Part::bytes(attachment.bytes);
    if let Some(file_name) = attachment.file_name {
        part = part.file_name(file_name);
    }
    if let Some(content_type) = attachment.content_type {
        part = part
            .mime_str(&content_type)
            .map_err(|_| BackendError::InvalidAttachment(content_type.clone()))?;
    }
    Ok(part)
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn login(&self, credentials: &LoginRequest) -> BackendResult<LoginResponse> {
        info!("Login attempt for user: {}", credentials.email);

        let response = self
            .http
            .post(self.url("/api/user/login"))
            .json(credentials)
            .send()
            .await?;

        Self::expect_json(response, "Login failed").await
    }

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> BackendResult<FormOutcome<RegisterFieldErrors>> {
        info!("Registering user: {}", request.email);

        let response = self
            .http
            .post(self.url("/api/user/register"))
            .json(request)
            .send()
            .await?;

        Self::form_outcome(response, "Registration failed").await
    }

    async fn request_password_reset(&self, email: &str) -> BackendResult<()> {
        info!("Requesting password reset for: {}", email);

        let response = self
            .http
            .post(self.url("/api/user/reset_password"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        Self::expect_success(response, "Password reset request failed").await
    }

    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> BackendResult<FormOutcome<ResetPasswordFieldErrors>> {
        info!("Confirming password reset");

        let response = self
            .http
            .post(self.url("/api/user/reset_password/confirm"))
            .json(request)
            .send()
            .await?;

        Self::form_outcome(response, "Password reset failed").await
    }

    async fn verify_account(&self, token: &str) -> BackendResult<()> {
        info!("Verifying account");

        let response = self
            .http
            .post(self.url("/api/user/verify"))
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;

        Self::expect_success(response, "Account verification failed").await
    }

    async fn sync_identity_user(&self, identity_token: &str) -> BackendResult<SyncOutcome> {
        info!("Synchronizing identity-provider user with backend");

        let response = self
            .http
            .post(self.url("/api/user/keycloak/sync"))
            .bearer_auth(identity_token)
            .send()
            .await
            .map_err(|e| {
                error!("Identity sync request failed: {}", e);
                BackendError::from(e)
            })?;

        if response.status().is_success() {
            let session: IdentitySession = response.json().await?;
            return Ok(SyncOutcome::Synced(session));
        }

        let status = response.status();
        let message = match Self::rejection(response, DEFAULT_SYNC_FAILURE).await {
            BackendError::Rejected { message, .. } => message,
            other => other.to_string(),
        };
        warn!("Backend refused identity sync ({}): {}", status, message);

        Ok(SyncOutcome::Failed(message))
    }

    async fn current_user(&self, bearer: &str) -> BackendResult<User> {
        let response = self
            .http
            .get(self.url("/api/user"))
            .bearer_auth(bearer)
            .send()
            .await?;

        Self::expect_json(response, "Failed to authenticate").await
    }

    async fn update_user(&self, bearer: &str, update: UserUpdate) -> BackendResult<User> {
        info!("Updating current user profile");

        let mut form = Form::new().text("name", update.name);
        if let Some(image) = update.image {
            form = form.part("image", attachment_part(image)?);
        }

        let response = self
            .http
            .put(self.url("/api/user"))
            .bearer_auth(bearer)
            .multipart(form)
            .send()
            .await?;

        Self::expect_json(response, "Failed to update user").await
    }

    async fn list_todos(&self, bearer: &str) -> BackendResult<Vec<Todo>> {
        let response = self
            .http
            .get(self.url("/api/todo"))
            .bearer_auth(bearer)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::expect_json(response, "Failed to fetch todos").await
    }

    async fn get_todo(&self, bearer: &str, id: i64) -> BackendResult<Todo> {
        let response = self
            .http
            .get(self.url(&format!("/api/todo/{}", id)))
            .bearer_auth(bearer)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::expect_json(response, "Failed to fetch todo").await
    }

    async fn create_todo(&self, bearer: &str, todo: &NewTodo) -> BackendResult<Todo> {
        info!("Creating todo: {}", todo.title);

        let response = self
            .http
            .post(self.url("/api/todo"))
            .bearer_auth(bearer)
            .json(todo)
            .send()
            .await?;

        Self::expect_json(response, "Failed to create todo").await
    }

    async fn update_todo(&self, bearer: &str, id: i64, update: TodoUpdate) -> BackendResult<Todo> {
        info!("Updating todo {} with {} image(s)", id, update.images.len());

        let mut form = Form::new()
            .text("title", update.title)
            .text("description", update.description);
        for image in update.images {
            form = form.part("images", attachment_part(image)?);
        }

        let response = self
            .http
            .put(self.url(&format!("/api/todo/{}", id)))
            .bearer_auth(bearer)
            .multipart(form)
            .send()
            .await?;

        Self::expect_json(response, "Failed to update todo").await
    }
}
