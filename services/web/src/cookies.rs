//! Session cookies
//!
//! Two token cookies can authenticate a browser: the application token issued
//! by the backend and the access token issued by the identity provider. A third,
//! short-lived cookie carries the PKCE verifier across the SSO round trip.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration;

/// Application session token (JWT signed by the backend)
pub const AUTH_TOKEN_COOKIE: &str = "authToken";
/// Identity-provider access token
pub const IDENTITY_TOKEN_COOKIE: &str = "keycloak_token";
/// CSRF state and PKCE verifier of an SSO login in flight
pub const PENDING_LOGIN_COOKIE: &str = "kc_pending_login";

/// One day
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24;
/// Ten minutes to come back from the identity provider
pub const PENDING_LOGIN_MAX_AGE_SECS: i64 = 60 * 10;

fn http_only(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .path("/")
        .build()
}

/// Cookie holding a session token for a day
pub fn session_cookie(name: &'static str, token: String, secure: bool) -> Cookie<'static> {
    http_only(name, token, SESSION_MAX_AGE_SECS, secure)
}

/// Cookie holding an SSO login in flight
pub fn pending_login_cookie(value: String, secure: bool) -> Cookie<'static> {
    http_only(PENDING_LOGIN_COOKIE, value, PENDING_LOGIN_MAX_AGE_SECS, secure)
}

/// Expired, empty cookie replacing `name` in the browser
///
/// Added rather than removed from the jar so the `Set-Cookie` is emitted even
/// when the request did not carry the cookie.
pub fn removal(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// Remove both session tokens
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.add(removal(AUTH_TOKEN_COOKIE))
        .add(removal(IDENTITY_TOKEN_COOKIE))
}

/// Non-empty value of a cookie
pub fn non_empty<'a>(jar: &'a CookieJar, name: &str) -> Option<&'a str> {
    jar.get(name)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
}

/// Token to present to the backend: the application token wins over the
/// identity-provider token
pub fn bearer_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, AUTH_TOKEN_COOKIE)
        .or_else(|| non_empty(jar, IDENTITY_TOKEN_COOKIE))
        .map(str::to_string)
}
