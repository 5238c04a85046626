//! Session bridge
//!
//! Runs once per `/callback`: confirms the identity-provider session, then asks
//! the backend to create or update the matching application user. The outcome
//! tells the callback page which cookies to set and where to go next.

use std::sync::Arc;

use common::{
    BackendApi, BackendError,
    backend::DEFAULT_SYNC_FAILURE,
    models::{IdentitySession, SyncOutcome},
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::identity::{CallbackParams, IdentityError, IdentityProvider, PendingLogin, SessionCheck};

/// Shown for any failure whose details stay in the logs
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred during authentication";

#[derive(Error, Debug)]
enum BridgeError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// What the callback page does next
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOutcome {
    /// Both sides agree on the user; continue to the dashboard
    Established {
        app_token: Option<String>,
        identity_token: String,
    },
    /// No identity session; back to the login page straight away
    Unauthenticated,
    /// Show the message, then return to the login page
    Failed(String),
}

/// Bridges an identity-provider session into an application session
#[derive(Clone)]
pub struct SessionBridge {
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<dyn BackendApi>,
}

impl SessionBridge {
    pub fn new(identity: Arc<dyn IdentityProvider>, backend: Arc<dyn BackendApi>) -> Self {
        Self { identity, backend }
    }

    /// Complete an SSO login; never fails, every error becomes a message
    pub async fn complete(
        &self,
        params: &CallbackParams,
        pending: Option<&PendingLogin>,
    ) -> BridgeOutcome {
        match self.try_complete(params, pending).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Session bridge failed: {}", e);
                BridgeOutcome::Failed(GENERIC_FAILURE_MESSAGE.to_string())
            }
        }
    }

    async fn try_complete(
        &self,
        params: &CallbackParams,
        pending: Option<&PendingLogin>,
    ) -> Result<BridgeOutcome, BridgeError> {
        let identity_token = match self.identity.check_session(params, pending).await? {
            SessionCheck::Authenticated(token) => token,
            SessionCheck::Unauthenticated => {
                info!("No identity session on callback");
                return Ok(BridgeOutcome::Unauthenticated);
            }
        };

        match self.backend.sync_identity_user(&identity_token).await? {
            SyncOutcome::Synced(IdentitySession { token, user }) => {
                if let Some(user) = &user {
                    info!("Identity session bridged for user {}", user.id);
                }
                Ok(BridgeOutcome::Established {
                    app_token: token.filter(|t| !t.is_empty()),
                    identity_token,
                })
            }
            SyncOutcome::Failed(message) => {
                warn!("Backend refused identity sync: {}", message);
                let message = if message.trim().is_empty() {
                    DEFAULT_SYNC_FAILURE.to_string()
                } else {
                    message
                };
                Ok(BridgeOutcome::Failed(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeIdentity, IdentityScript, SyncScript};

    fn bridge(identity: IdentityScript, sync: SyncScript) -> (SessionBridge, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::new(sync));
        let bridge = SessionBridge::new(Arc::new(FakeIdentity::new(identity)), backend.clone());
        (bridge, backend)
    }

    fn callback() -> (CallbackParams, PendingLogin) {
        let params = CallbackParams {
            code: Some("code".to_string()),
            state: Some("fixed-state".to_string()),
            ..Default::default()
        };
        (params, FakeIdentity::pending())
    }

    #[tokio::test]
    async fn test_synced_identity_establishes_session() {
        let (bridge, backend) = bridge(
            IdentityScript::Token("kc-token".to_string()),
            SyncScript::Session(Some("app-token".to_string())),
        );
        let (params, pending) = callback();

        let outcome = bridge.complete(&params, Some(&pending)).await;

        assert_eq!(
            outcome,
            BridgeOutcome::Established {
                app_token: Some("app-token".to_string()),
                identity_token: "kc-token".to_string(),
            }
        );
        assert_eq!(backend.calls(), vec!["sync:kc-token".to_string()]);
    }

    #[tokio::test]
    async fn test_sync_without_app_token_keeps_identity_token() {
        let (bridge, _) = bridge(
            IdentityScript::Token("kc-token".to_string()),
            SyncScript::Session(None),
        );
        let (params, pending) = callback();

        let outcome = bridge.complete(&params, Some(&pending)).await;
        assert_eq!(
            outcome,
            BridgeOutcome::Established {
                app_token: None,
                identity_token: "kc-token".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_refused_sync_shows_backend_message() {
        let (bridge, _) = bridge(
            IdentityScript::Token("kc-token".to_string()),
            SyncScript::Refuse("X".to_string()),
        );
        let (params, pending) = callback();

        let outcome = bridge.complete(&params, Some(&pending)).await;
        assert_eq!(outcome, BridgeOutcome::Failed("X".to_string()));
    }

    #[tokio::test]
    async fn test_refused_sync_without_message_uses_default() {
        let (bridge, _) = bridge(
            IdentityScript::Token("kc-token".to_string()),
            SyncScript::Refuse("  ".to_string()),
        );
        let (params, pending) = callback();

        let outcome = bridge.complete(&params, Some(&pending)).await;
        assert_eq!(outcome, BridgeOutcome::Failed(DEFAULT_SYNC_FAILURE.to_string()));
    }

    #[tokio::test]
    async fn test_unauthenticated_skips_backend() {
        let (bridge, backend) = bridge(
            IdentityScript::Unauthenticated,
            SyncScript::Session(Some("app-token".to_string())),
        );
        let (params, pending) = callback();

        let outcome = bridge.complete(&params, Some(&pending)).await;

        assert_eq!(outcome, BridgeOutcome::Unauthenticated);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_identity_failure_is_generic() {
        let (bridge, backend) = bridge(
            IdentityScript::Broken,
            SyncScript::Session(Some("app-token".to_string())),
        );
        let (params, pending) = callback();

        let outcome = bridge.complete(&params, Some(&pending)).await;

        assert_eq!(
            outcome,
            BridgeOutcome::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_generic() {
        let (bridge, _) = bridge(
            IdentityScript::Token("kc-token".to_string()),
            SyncScript::Unreachable,
        );
        let (params, pending) = callback();

        let outcome = bridge.complete(&params, Some(&pending)).await;
        assert_eq!(
            outcome,
            BridgeOutcome::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        );
    }
}
