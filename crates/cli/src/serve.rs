//! HTTP server for the questlog API

use std::sync::Arc;

use accounts::TokenIssuer;
use anyhow::{Context, Result};
use api::AppState;

use crate::config::{Config, JWT_SECRET_ENV};

pub async fn run(cfg: &Config) -> Result<()> {
    let secret = cfg.auth.secret().with_context(|| {
        format!(
            "No JWT secret configured. Run 'questlog init' or set {}",
            JWT_SECRET_ENV
        )
    })?;
    let tokens = TokenIssuer::new(&secret, cfg.auth.token_ttl_hours);

    tracing::info!("Connecting to questlog database...");
    let db = crate::open_database(cfg).await?;

    let state = Arc::new(AppState::new(db, tokens));
    let router = api::build_router(state);
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind server to {}", addr))?;

    tracing::info!("API available at http://{}/api", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
