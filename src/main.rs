//! Open Gateway - Main entry point
//!
//! Loads the routing document, builds the router and serves until SIGINT or
//! SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use open_gateway::{
    api::{create_http_client, gateway_router, AppState},
    core::{init_metrics, init_tracing, GatewayConfig, ServerArgs},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    let args = ServerArgs::parse();
    init_tracing(&args.log_level);
    init_metrics();

    let config = GatewayConfig::load(&args.config)?;
    tracing::info!(
        "Configuration loaded from {}: {} providers, {} models, {} tokens",
        args.config,
        config.oai.providers.len(),
        config.model_count(),
        config.auth.tokens.len()
    );
    if config.auth.tokens.is_empty() {
        tracing::warn!("No auth tokens configured; every authenticated request will be rejected");
    }

    let http_client = create_http_client().context("Failed to build HTTP client")?;
    let state = Arc::new(AppState::new(config, http_client));
    let app = gateway_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Starting Open Gateway on {}", addr);
    tracing::info!("OpenAI API: /v1/chat/completions, /v1/models");
    tracing::info!("Metrics endpoint: /metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
