//! Application state shared across handlers

use std::sync::Arc;

use common::BackendApi;

use crate::{
    bridge::SessionBridge, config::WebConfig, guard::RouteGuard, identity::IdentityProvider,
    jwt::TokenVerifier,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WebConfig>,
    pub guard: RouteGuard,
    pub identity: Arc<dyn IdentityProvider>,
    pub backend: Arc<dyn BackendApi>,
    pub bridge: SessionBridge,
}

impl AppState {
    pub fn new(
        config: WebConfig,
        verifier: TokenVerifier,
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendApi>,
    ) -> Self {
        let bridge = SessionBridge::new(identity.clone(), backend.clone());
        Self {
            config: Arc::new(config),
            guard: RouteGuard::new(verifier),
            identity,
            backend,
            bridge,
        }
    }
}
