//! Liveness endpoint for hosting platforms.

use axum::Router;
use axum::routing::get;

const HEALTH_BODY: &str = "Bot is running";

/// `GET /` and `GET /health` both answer `200 Bot is running`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    HEALTH_BODY
}

/// Bind the health server and serve until the task is dropped.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Health server started");
    axum::serve(listener, router()).await
}
