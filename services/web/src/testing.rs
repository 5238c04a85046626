//! In-memory stand-ins for the identity provider and the backend

use std::sync::Mutex;

use async_trait::async_trait;
use common::{
    BackendApi, BackendError, BackendResult,
    models::{
        FormOutcome, IdentitySession, LoginRequest, LoginResponse, NewTodo, RegisterFieldErrors,
        RegisterRequest, ResetPasswordFieldErrors, ResetPasswordRequest, SyncOutcome, Todo,
        TodoUpdate, User, UserUpdate,
    },
};
use reqwest::StatusCode;

use crate::identity::{
    AuthorizationRequest, CallbackParams, IdentityError, IdentityProvider, PendingLogin,
    SessionCheck,
};

pub const PASSWORD: &str = "sakura2024";
pub const LOGIN_TOKEN: &str = "login-token";
pub const REVOKED_TOKEN: &str = "revoked-token";

/// How the fake provider answers a callback
pub enum IdentityScript {
    Token(String),
    Unauthenticated,
    Broken,
}

pub struct FakeIdentity {
    script: IdentityScript,
}

impl FakeIdentity {
    pub fn new(script: IdentityScript) -> Self {
        Self { script }
    }

    pub fn pending() -> PendingLogin {
        PendingLogin {
            state: "fixed-state".to_string(),
            verifier: "fixed-verifier".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorization_request(&self, idp_hint: Option<&str>) -> AuthorizationRequest {
        let hint = idp_hint
            .map(|h| format!("&kc_idp_hint={}", h))
            .unwrap_or_default();
        AuthorizationRequest {
            url: format!("http://idp.test/auth?state=fixed-state{}", hint),
            pending: Self::pending(),
        }
    }

    async fn check_session(
        &self,
        params: &CallbackParams,
        pending: Option<&PendingLogin>,
    ) -> Result<SessionCheck, IdentityError> {
        if params.error.is_some() || pending.is_none() {
            return Ok(SessionCheck::Unauthenticated);
        }
        match &self.script {
            IdentityScript::Token(token) => Ok(SessionCheck::Authenticated(token.clone())),
            IdentityScript::Unauthenticated => Ok(SessionCheck::Unauthenticated),
            IdentityScript::Broken => Err(IdentityError::Exchange(
                "token endpoint unreachable".to_string(),
            )),
        }
    }

    fn logout_url(&self, post_logout_redirect: &str) -> String {
        format!(
            "http://idp.test/logout?post_logout_redirect_uri={}",
            post_logout_redirect
        )
    }
}

/// How the fake backend answers an identity sync
pub enum SyncScript {
    Session(Option<String>),
    Refuse(String),
    Unreachable,
}

/// Backend accepting every bearer except [`REVOKED_TOKEN`]; records calls
pub struct FakeBackend {
    sync: SyncScript,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(sync: SyncScript) -> Self {
        Self {
            sync,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn authorize(&self, bearer: &str) -> BackendResult<()> {
        if bearer == REVOKED_TOKEN {
            return Err(rejected(StatusCode::UNAUTHORIZED, "jwt expired"));
        }
        Ok(())
    }

    pub fn user() -> User {
        User {
            id: 1,
            name: "Yuki".to_string(),
            email: "yuki@example.com".to_string(),
            avatar_url: None,
        }
    }

    pub fn todo(id: i64) -> Todo {
        Todo {
            id,
            title: format!("Todo {}", id),
            description: None,
            images: None,
            created_at: None,
            updated_at: None,
        }
    }
}

fn rejected(status: StatusCode, message: &str) -> BackendError {
    BackendError::Rejected {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn login(&self, credentials: &LoginRequest) -> BackendResult<LoginResponse> {
        self.record(format!("login:{}", credentials.email));
        if credentials.password != PASSWORD {
            return Err(rejected(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ));
        }
        Ok(LoginResponse {
            token: LOGIN_TOKEN.to_string(),
            user: Some(Self::user()),
        })
    }

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> BackendResult<FormOutcome<RegisterFieldErrors>> {
        self.record(format!("register:{}", request.email));
        if request.email == "taken@example.com" {
            return Ok(FormOutcome::Rejected {
                message: "Registration failed".to_string(),
                field_errors: RegisterFieldErrors {
                    email: Some(vec!["Email is already registered".to_string()]),
                    ..Default::default()
                },
            });
        }
        Ok(FormOutcome::Accepted)
    }

    async fn request_password_reset(&self, email: &str) -> BackendResult<()> {
        self.record(format!("forgot:{}", email));
        Ok(())
    }

    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> BackendResult<FormOutcome<ResetPasswordFieldErrors>> {
        self.record(format!("reset:{}", request.token));
        if request.token == "expired" {
            return Ok(FormOutcome::Rejected {
                message: "The reset link has expired".to_string(),
                field_errors: ResetPasswordFieldErrors::default(),
            });
        }
        Ok(FormOutcome::Accepted)
    }

    async fn verify_account(&self, token: &str) -> BackendResult<()> {
        self.record(format!("verify:{}", token));
        if token != "good" {
            return Err(rejected(
                StatusCode::BAD_REQUEST,
                "Invalid verification token",
            ));
        }
        Ok(())
    }

    async fn sync_identity_user(&self, identity_token: &str) -> BackendResult<SyncOutcome> {
        self.record(format!("sync:{}", identity_token));
        match &self.sync {
            SyncScript::Session(token) => Ok(SyncOutcome::Synced(IdentitySession {
                token: token.clone(),
                user: Some(Self::user()),
            })),
            SyncScript::Refuse(message) => Ok(SyncOutcome::Failed(message.clone())),
            SyncScript::Unreachable => Err(BackendError::Decode(
                "connection closed before message completed".to_string(),
            )),
        }
    }

    async fn current_user(&self, bearer: &str) -> BackendResult<User> {
        self.authorize(bearer)?;
        self.record(format!("user:{}", bearer));
        Ok(Self::user())
    }

    async fn update_user(&self, bearer: &str, update: UserUpdate) -> BackendResult<User> {
        self.authorize(bearer)?;
        self.record(format!(
            "update_user:{}:{}",
            update.name,
            update.image.is_some()
        ));
        Ok(User {
            name: update.name,
            avatar_url: update.image.map(|_| "/uploads/avatar.png".to_string()),
            ..Self::user()
        })
    }

    async fn list_todos(&self, bearer: &str) -> BackendResult<Vec<Todo>> {
        self.authorize(bearer)?;
        self.record(format!("todos:{}", bearer));
        Ok(vec![Self::todo(1), Self::todo(2)])
    }

    async fn get_todo(&self, bearer: &str, id: i64) -> BackendResult<Todo> {
        self.authorize(bearer)?;
        if id > 2 {
            return Err(rejected(StatusCode::NOT_FOUND, "Todo not found"));
        }
        Ok(Self::todo(id))
    }

    async fn create_todo(&self, bearer: &str, todo: &NewTodo) -> BackendResult<Todo> {
        self.authorize(bearer)?;
        self.record(format!(
            "create_todo:{}:{}",
            todo.title,
            todo.description.as_deref().unwrap_or("-")
        ));
        Ok(Todo {
            title: todo.title.clone(),
            description: todo.description.clone(),
            ..Self::todo(3)
        })
    }

    async fn update_todo(&self, bearer: &str, id: i64, update: TodoUpdate) -> BackendResult<Todo> {
        self.authorize(bearer)?;
        self.record(format!(
            "update_todo:{}:{}:{}",
            id,
            update.title,
            update.images.len()
        ));
        Ok(Todo {
            title: update.title,
            description: (!update.description.is_empty()).then_some(update.description),
            images: Some(
                update
                    .images
                    .iter()
                    .filter_map(|image| image.file_name.clone())
                    .collect(),
            ),
            ..Self::todo(id)
        })
    }
}
