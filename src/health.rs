//! Liveness endpoint for the hosting platform.

use std::net::SocketAddr;

use axum::Router;
use axum::http::{Method, StatusCode};
use tracing::{info, warn};

/// Answers `200 OK` to a GET on any path.
pub fn router() -> Router {
    Router::new().fallback(probe)
}

async fn probe(method: Method) -> (StatusCode, &'static str) {
    if method == Method::GET {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }
}

/// Serve on all interfaces until Ctrl-C.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🩺 Health check listening on {addr}");

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Health check shutting down");
}
