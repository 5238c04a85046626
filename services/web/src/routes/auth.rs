//! Login, SSO and account pages

use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use common::{
    BackendError,
    models::{FormOutcome, LoginRequest, RegisterRequest, ResetPasswordRequest},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    bridge::BridgeOutcome,
    cookies::{
        AUTH_TOKEN_COOKIE, IDENTITY_TOKEN_COOKIE, PENDING_LOGIN_COOKIE, clear_session, non_empty,
        pending_login_cookie, removal, session_cookie,
    },
    error::{BACKEND_UNAVAILABLE_MESSAGE, WebError, WebResult},
    guard::{DASHBOARD_PATH, LOGIN_PATH},
    identity::{CallbackParams, PendingLogin},
    state::AppState,
    validation::{
        CHECK_INPUT_MESSAGE, validate_email, validate_password_reset, validate_registration,
    },
    views::{DeferredRedirect, deferred_redirect},
};

/// Local login form
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyParams {
    pub token: Option<String>,
}

/// Login page view
pub async fn login_page() -> impl IntoResponse {
    Json(json!({
        "page": "login",
        "sso": "/login/sso",
        "google": "/login/google",
        "register": "/register",
        "forgotPassword": "/forgot-password",
    }))
}

/// Local email/password login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> WebResult<Response> {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return Err(WebError::BadRequest(
            "Please enter your email address and password".to_string(),
        ));
    }

    let credentials = LoginRequest {
        email: email.to_string(),
        password: form.password,
    };

    match state.backend.login(&credentials).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(
                AUTH_TOKEN_COOKIE,
                session.token,
                state.config.secure_cookies,
            ));
            Ok((jar, Redirect::to(DASHBOARD_PATH)).into_response())
        }
        Err(BackendError::Rejected { message, .. }) => {
            warn!("Login rejected for user {}: {}", credentials.email, message);
            Err(WebError::Authentication(message))
        }
        Err(e) => {
            error!("Login request failed: {}", e);
            Err(WebError::Authentication(
                BACKEND_UNAVAILABLE_MESSAGE.to_string(),
            ))
        }
    }
}

/// Start an SSO login at the identity provider
pub async fn start_sso(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    start_identity_login(&state, jar, None)
}

/// Start an SSO login brokered to Google
pub async fn start_google(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    start_identity_login(&state, jar, Some("google"))
}

fn start_identity_login(state: &AppState, jar: CookieJar, idp_hint: Option<&str>) -> Response {
    let request = state.identity.authorization_request(idp_hint);
    let jar = jar.add(pending_login_cookie(
        request.pending.encode(),
        state.config.secure_cookies,
    ));
    (jar, Redirect::to(&request.url)).into_response()
}

/// Identity provider redirect target
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let pending = jar
        .get(PENDING_LOGIN_COOKIE)
        .and_then(|cookie| PendingLogin::decode(cookie.value()));
    let jar = jar.add(removal(PENDING_LOGIN_COOKIE));

    match state.bridge.complete(&params, pending.as_ref()).await {
        BridgeOutcome::Established {
            app_token,
            identity_token,
        } => {
            let secure = state.config.secure_cookies;
            let jar = jar.add(session_cookie(IDENTITY_TOKEN_COOKIE, identity_token, secure));
            let jar = match app_token {
                Some(token) => jar.add(session_cookie(AUTH_TOKEN_COOKIE, token, secure)),
                None => jar.add(removal(AUTH_TOKEN_COOKIE)),
            };
            (jar, Redirect::to(DASHBOARD_PATH)).into_response()
        }
        BridgeOutcome::Unauthenticated => (jar, Redirect::to(LOGIN_PATH)).into_response(),
        BridgeOutcome::Failed(message) => (
            jar,
            deferred_redirect(
                StatusCode::OK,
                json!({ "error": message }),
                DeferredRedirect::to_login(),
            ),
        )
            .into_response(),
    }
}

/// Drop the session; end the identity-provider session too when there is one
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let had_identity_session = non_empty(&jar, IDENTITY_TOKEN_COOKIE).is_some();
    let jar = clear_session(jar);

    let target = if had_identity_session {
        state.identity.logout_url(&state.config.login_url())
    } else {
        LOGIN_PATH.to_string()
    };

    (jar, Redirect::to(&target))
}

/// Account registration
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterRequest>,
) -> WebResult<Response> {
    let field_errors = validate_registration(&form);
    if !field_errors.is_empty() {
        return Err(WebError::validation(CHECK_INPUT_MESSAGE, &field_errors));
    }

    match state.backend.register(&form).await? {
        FormOutcome::Accepted => {
            info!("Registered account for {}", form.email);
            Ok(deferred_redirect(
                StatusCode::OK,
                json!({
                    "message": "Registration complete. Please check your email to verify your account."
                }),
                DeferredRedirect::to_login(),
            ))
        }
        FormOutcome::Rejected {
            message,
            field_errors,
        } => Err(WebError::validation(message, &field_errors)),
    }
}

/// Request a password reset email
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> WebResult<impl IntoResponse> {
    let email = form.email.trim();
    validate_email(email).map_err(WebError::BadRequest)?;

    state.backend.request_password_reset(email).await?;

    Ok(Json(json!({
        "message": "We sent you an email with a link to reset your password."
    })))
}

/// Set a new password with the token from the reset email
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordRequest>,
) -> WebResult<Response> {
    if form.token.is_empty() {
        return Err(WebError::BadRequest(
            "The reset link is invalid. Please open the link from your email again.".to_string(),
        ));
    }

    let field_errors = validate_password_reset(&form);
    if !field_errors.is_empty() {
        return Err(WebError::validation(CHECK_INPUT_MESSAGE, &field_errors));
    }

    match state.backend.reset_password(&form).await? {
        FormOutcome::Accepted => Ok(deferred_redirect(
            StatusCode::OK,
            json!({ "message": "Your password has been reset." }),
            DeferredRedirect::to_login(),
        )),
        FormOutcome::Rejected {
            message,
            field_errors,
        } => Err(WebError::validation(message, &field_errors)),
    }
}

/// Confirm an account from the link in the verification email
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> WebResult<Response> {
    let token = params
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            WebError::BadRequest("Verification token not found. Please check the URL.".to_string())
        })?;

    state.backend.verify_account(&token).await?;

    Ok(deferred_redirect(
        StatusCode::OK,
        json!({ "message": "Your account has been verified." }),
        DeferredRedirect::to_login(),
    ))
}
