use std::sync::Arc;

use anyhow::Result;
use tokio::{
    net::TcpListener,
    signal::ctrl_c,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

mod bridge;
mod config;
mod cookies;
mod error;
mod guard;
mod identity;
mod jwt;
mod routes;
mod state;
mod validation;
mod views;

#[cfg(test)]
mod testing;

use common::{BackendClient, BackendConfig};

use crate::{
    config::WebConfig,
    identity::{IdentityClient, IdentityConfig},
    jwt::{JwtConfig, TokenVerifier},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting todo web service");

    let config = WebConfig::from_env()?;

    // Application tokens are verified locally with the backend's secret
    let jwt_config = JwtConfig::from_env()?;
    let verifier = TokenVerifier::new(&jwt_config);

    let backend_config = BackendConfig::from_env()?;
    let backend = BackendClient::new(&backend_config)?;
    info!("Backend API at {}", backend_config.base_url);

    let identity = IdentityClient::new(IdentityConfig::from_env(), &config.callback_url())?;

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, verifier, Arc::new(identity), Arc::new(backend));

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Todo web service listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Todo web service stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
