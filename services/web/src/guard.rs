//! Route guard
//!
//! Every request passes through [`route_guard`] before it reaches a page. The
//! decision is a pure function of the request path and its cookies; the
//! backend is never contacted.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::{
    cookies::{AUTH_TOKEN_COOKIE, IDENTITY_TOKEN_COOKIE, non_empty},
    jwt::TokenVerifier,
    state::AppState,
};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Paths that require a session, together with everything below them
pub const PROTECTED_PREFIXES: [&str; 3] = ["/dashboard", "/profile", "/todo"];

/// Outcome of evaluating a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// True for `/todo` and `/todo/...`, false for `/todos`
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Access gate over the two session cookies
#[derive(Clone)]
pub struct RouteGuard {
    verifier: TokenVerifier,
}

impl RouteGuard {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// The application token must verify; the identity-provider token only
    /// has to be present because the backend re-verifies it on every call.
    pub fn is_authenticated(&self, jar: &CookieJar) -> bool {
        let app_token_valid = non_empty(jar, AUTH_TOKEN_COOKIE).is_some_and(|token| {
            match self.verifier.validate_token(token) {
                Ok(claims) => {
                    debug!(
                        "Application token for {:?} issued by {:?}",
                        claims.sub, claims.iss
                    );
                    true
                }
                Err(e) => {
                    debug!("Rejected application token: {}", e);
                    false
                }
            }
        });

        app_token_valid || non_empty(jar, IDENTITY_TOKEN_COOKIE).is_some()
    }

    /// Decide what happens to a request for `path`
    pub fn evaluate(&self, path: &str, jar: &CookieJar) -> GuardDecision {
        if path == LOGIN_PATH {
            if self.is_authenticated(jar) {
                return GuardDecision::Redirect(DASHBOARD_PATH);
            }
            return GuardDecision::Allow;
        }

        if is_protected(path) && !self.is_authenticated(jar) {
            return GuardDecision::Redirect(LOGIN_PATH);
        }

        GuardDecision::Allow
    }
}

/// Middleware applying the [`RouteGuard`] to every request
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request<Body>,
    next: Next,
) -> Response {
    match state.guard.evaluate(req.uri().path(), &jar) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::Redirect(target) => {
            debug!("Redirecting {} to {}", req.uri().path(), target);
            Redirect::to(target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::tests::{SECRET, issue_token, verifier};
    use axum_extra::extract::cookie::Cookie;

    fn guard() -> RouteGuard {
        RouteGuard::new(verifier())
    }

    fn jar_with(cookies: &[(&'static str, String)]) -> CookieJar {
        cookies
            .iter()
            .fold(CookieJar::new(), |jar, (name, value)| {
                jar.add(Cookie::new(*name, value.clone()))
            })
    }

    const PROTECTED_PATHS: [&str; 6] = [
        "/dashboard",
        "/dashboard/stats",
        "/profile",
        "/todo",
        "/todo/new",
        "/todo/42",
    ];

    #[test]
    fn test_login_with_valid_app_token_goes_to_dashboard() {
        let jar = jar_with(&[(AUTH_TOKEN_COOKIE, issue_token(SECRET, 3600))]);
        assert_eq!(
            guard().evaluate("/login", &jar),
            GuardDecision::Redirect("/dashboard")
        );
    }

    #[test]
    fn test_login_with_identity_token_goes_to_dashboard() {
        let jar = jar_with(&[(IDENTITY_TOKEN_COOKIE, "kc-access-token".to_string())]);
        assert_eq!(
            guard().evaluate("/login", &jar),
            GuardDecision::Redirect("/dashboard")
        );
    }

    #[test]
    fn test_login_with_invalid_app_token_is_allowed() {
        let expired = jar_with(&[(AUTH_TOKEN_COOKIE, issue_token(SECRET, -60))]);
        let forged = jar_with(&[(AUTH_TOKEN_COOKIE, issue_token("not-the-secret", 3600))]);
        let garbage = jar_with(&[(AUTH_TOKEN_COOKIE, "garbage".to_string())]);

        for jar in [expired, forged, garbage, CookieJar::new()] {
            assert_eq!(guard().evaluate("/login", &jar), GuardDecision::Allow);
        }
    }

    #[test]
    fn test_protected_paths_without_token_go_to_login() {
        for path in PROTECTED_PATHS {
            assert_eq!(
                guard().evaluate(path, &CookieJar::new()),
                GuardDecision::Redirect("/login"),
                "{path}"
            );
        }
    }

    #[test]
    fn test_protected_paths_with_invalid_app_token_go_to_login() {
        let jar = jar_with(&[(AUTH_TOKEN_COOKIE, issue_token(SECRET, -1))]);
        for path in PROTECTED_PATHS {
            assert_eq!(
                guard().evaluate(path, &jar),
                GuardDecision::Redirect("/login"),
                "{path}"
            );
        }
    }

    #[test]
    fn test_protected_paths_with_valid_app_token_are_allowed() {
        let jar = jar_with(&[(AUTH_TOKEN_COOKIE, issue_token(SECRET, 3600))]);
        for path in PROTECTED_PATHS {
            assert_eq!(guard().evaluate(path, &jar), GuardDecision::Allow, "{path}");
        }
    }

    #[test]
    fn test_identity_token_presence_is_enough() {
        let jar = jar_with(&[(IDENTITY_TOKEN_COOKIE, "opaque".to_string())]);
        for path in PROTECTED_PATHS {
            assert_eq!(guard().evaluate(path, &jar), GuardDecision::Allow, "{path}");
        }

        let empty = jar_with(&[(IDENTITY_TOKEN_COOKIE, String::new())]);
        assert_eq!(
            guard().evaluate("/todo", &empty),
            GuardDecision::Redirect("/login")
        );
    }

    #[test]
    fn test_invalid_app_token_falls_back_to_identity_token() {
        let jar = jar_with(&[
            (AUTH_TOKEN_COOKIE, issue_token("not-the-secret", 3600)),
            (IDENTITY_TOKEN_COOKIE, "opaque".to_string()),
        ]);
        assert_eq!(guard().evaluate("/profile", &jar), GuardDecision::Allow);
    }

    #[test]
    fn test_public_paths_are_never_checked() {
        for path in ["/", "/register", "/callback", "/health", "/todos", "/login/sso"] {
            assert_eq!(
                guard().evaluate(path, &CookieJar::new()),
                GuardDecision::Allow,
                "{path}"
            );
        }
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let guard = guard();
        let jars = [
            CookieJar::new(),
            jar_with(&[(AUTH_TOKEN_COOKIE, issue_token(SECRET, 3600))]),
            jar_with(&[(AUTH_TOKEN_COOKIE, issue_token(SECRET, -5))]),
            jar_with(&[(IDENTITY_TOKEN_COOKIE, "opaque".to_string())]),
        ];

        for jar in &jars {
            for path in ["/login", "/dashboard", "/todo/3", "/register"] {
                assert_eq!(guard.evaluate(path, jar), guard.evaluate(path, jar));
            }
        }
    }
}
