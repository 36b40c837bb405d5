//! # Gatehouse Server
//!
//! Minimal API demonstrating the authorization gate:
//!
//! - `GET /api/public` answers everyone
//! - `GET /api/private` requires a bearer token carrying the configured scope
//!
//! Configuration is loaded once at startup (see [`config`]) and passed into
//! the router as plain values.

pub mod cli;
pub mod config;
pub mod routes;

use anyhow::{Context, Result};
use gatehouse_auth::Authorizer;
use tokio::net::TcpListener;
use tracing::info;

pub use config::{Messages, ServerConfig};
pub use routes::{MessageResponse, app};

/// Run the server until Ctrl-C
///
/// # Errors
///
/// Fails if the authorization settings are invalid, the eager key fetch
/// fails, or the listener cannot be bound.
pub async fn run(config: ServerConfig) -> Result<()> {
    let authorizer =
        Authorizer::from_config(config.auth.clone()).context("Failed to set up authorization")?;

    if config.prefetch_keys {
        let key_count = authorizer
            .resolver()
            .prefetch()
            .await
            .with_context(|| format!("Failed to fetch signing keys from {}", config.auth.jwks_uri))?;
        info!(key_count, jwks_uri = %config.auth.jwks_uri, "Signing keys loaded");
    }

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(address = %config.bind, "Listening");

    axum::serve(listener, app(config.messages(), authorizer))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
