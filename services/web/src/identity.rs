//! OpenID Connect client for the Keycloak realm
//!
//! The browser is sent to the realm's authorization endpoint with a PKCE (S256)
//! challenge and a CSRF state. Both secrets travel back with the browser in a
//! short-lived cookie and are checked when the provider redirects to
//! `/callback`.

use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, CsrfToken, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient, reqwest::async_http_client,
    url::Url,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL of the Keycloak server
    pub url: String,
    pub realm: String,
    pub client_id: String,
}

impl IdentityConfig {
    /// Create a new IdentityConfig from environment variables
    ///
    /// # Environment Variables
    /// - `KEYCLOAK_CLIENT_URL`: Keycloak base URL (default: "http://localhost:80")
    /// - `KEYCLOAK_REALM`: Realm name (default: "microservice-app")
    /// - `KEYCLOAK_FRONTEND_CLIENT_ID`: Public client id (default: "todo-frontend-client")
    pub fn from_env() -> Self {
        let url = std::env::var("KEYCLOAK_CLIENT_URL")
            .unwrap_or_else(|_| "http://localhost:80".to_string());
        let realm =
            std::env::var("KEYCLOAK_REALM").unwrap_or_else(|_| "microservice-app".to_string());
        let client_id = std::env::var("KEYCLOAK_FRONTEND_CLIENT_ID")
            .unwrap_or_else(|_| "todo-frontend-client".to_string());

        IdentityConfig {
            url: url.trim_end_matches('/').to_string(),
            realm,
            client_id,
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.url, self.realm, name
        )
    }
}

/// Identity provider errors
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Login state does not match the pending login")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(#[from] oauth2::url::ParseError),
}

/// Secrets of an SSO login between the authorization redirect and the callback
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLogin {
    pub state: String,
    pub verifier: String,
}

impl PendingLogin {
    /// Both values are base64url, so a dot cannot occur inside either
    pub fn encode(&self) -> String {
        format!("{}.{}", self.state, self.verifier)
    }

    pub fn decode(value: &str) -> Option<Self> {
        let (state, verifier) = value.split_once('.')?;
        if state.is_empty() || verifier.is_empty() {
            return None;
        }
        Some(PendingLogin {
            state: state.to_string(),
            verifier: verifier.to_string(),
        })
    }
}

/// Where to send the browser, and what to remember until it comes back
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub pending: PendingLogin,
}

/// Query string the provider appends to the callback URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Result of checking the identity session on callback
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCheck {
    Authenticated(String),
    Unauthenticated,
}

/// Operations of the federated identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the authorization redirect; `idp_hint` skips straight to a
    /// brokered provider such as `google`
    fn authorization_request(&self, idp_hint: Option<&str>) -> AuthorizationRequest;

    /// Confirm the callback against the pending login and obtain the token
    async fn check_session(
        &self,
        params: &CallbackParams,
        pending: Option<&PendingLogin>,
    ) -> Result<SessionCheck, IdentityError>;

    /// End-session URL returning the browser to `post_logout_redirect`
    fn logout_url(&self, post_logout_redirect: &str) -> String;
}

/// Keycloak client
#[derive(Clone)]
pub struct IdentityClient {
    client: BasicClient,
    config: IdentityConfig,
}

impl IdentityClient {
    /// Create a new client redirecting back to `callback_url`
    pub fn new(config: IdentityConfig, callback_url: &str) -> Result<Self, IdentityError> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            None,
            AuthUrl::new(config.endpoint("auth"))?,
            Some(TokenUrl::new(config.endpoint("token"))?),
        )
        .set_redirect_uri(RedirectUrl::new(callback_url.to_string())?);

        info!(
            "Identity client initialized for realm {} at {}",
            config.realm, config.url
        );

        Ok(Self { client, config })
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    fn authorization_request(&self, idp_hint: Option<&str>) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .set_pkce_challenge(pkce_challenge);

        if let Some(hint) = idp_hint {
            request = request.add_extra_param("kc_idp_hint", hint.to_string());
        }

        let (auth_url, csrf_token) = request.url();

        AuthorizationRequest {
            url: auth_url.to_string(),
            pending: PendingLogin {
                state: csrf_token.secret().clone(),
                verifier: pkce_verifier.secret().clone(),
            },
        }
    }

    async fn check_session(
        &self,
        params: &CallbackParams,
        pending: Option<&PendingLogin>,
    ) -> Result<SessionCheck, IdentityError> {
        if let Some(error) = &params.error {
            info!(
                "Identity provider returned {}: {}",
                error,
                params.error_description.as_deref().unwrap_or("")
            );
            return Ok(SessionCheck::Unauthenticated);
        }

        let (Some(code), Some(pending)) = (params.code.as_deref(), pending) else {
            return Ok(SessionCheck::Unauthenticated);
        };

        if params.state.as_deref() != Some(pending.state.as_str()) {
            warn!("Callback state does not match the pending login");
            return Err(IdentityError::StateMismatch);
        }

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.verifier.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|e| IdentityError::Exchange(e.to_string()))?;

        let access_token = token_response.access_token().secret();
        if access_token.is_empty() {
            return Ok(SessionCheck::Unauthenticated);
        }

        Ok(SessionCheck::Authenticated(access_token.clone()))
    }

    fn logout_url(&self, post_logout_redirect: &str) -> String {
        let endpoint = self.config.endpoint("logout");
        Url::parse_with_params(
            &endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("post_logout_redirect_uri", post_logout_redirect),
            ],
        )
        .map(|url| url.to_string())
        .unwrap_or(endpoint)
    }
}
