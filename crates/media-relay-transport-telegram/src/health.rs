//! Keep-alive HTTP listener for external uptime monitors.

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Static liveness payload served on `/`.
pub const ALIVE_TEXT: &str = "Bot is alive";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Build the health router.
pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(health))
}

async fn alive() -> &'static str {
    ALIVE_TEXT
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Serve the health router on `0.0.0.0:port` until `cancel` fires.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve_health(port: u16, cancel: CancellationToken) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind health listener on {addr}"))?;

    info!("HTTP Server listening on {addr}");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("health listener stopped with error")
}
