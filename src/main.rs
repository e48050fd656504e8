//! PDF Cache - A byte-budgeted local document cache
//!
//! Serves cached documents to the viewer over a local HTTP API.

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_cache::api::create_router;
use pdf_cache::{AppState, Config};

/// Main entry point for the document cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable store and create the cache manager
/// 4. Create Axum router with all endpoints and the configured CORS origin
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PDF cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_dir={}, store={}, cache_size={}MB, port={}, fetch_timeout={}s",
        config.cache_dir.display(),
        config.store_name,
        config.cache_size_mb,
        config.server_port,
        config.fetch_timeout
    );

    let state = AppState::from_config(&config)
        .await
        .context("failed to open document cache")?;
    info!("Document cache initialized");

    let cors_origin = config
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
        .context("invalid CORS_ORIGIN")?;
    match &config.cors_origin {
        Some(origin) => info!(origin = %origin, "cross-origin access allowed"),
        None => info!("cross-origin access disabled"),
    }

    let app = create_router(state, cors_origin);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
