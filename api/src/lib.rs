//! HTTP front end: GitLab webhook receiver and health probe.
//!
//! `POST /webhook/gitlab` validates and screens events, then dispatches
//! the review pipeline as a background task; the response never waits for
//! the review itself. `GET /health` reports liveness.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tracing::info;

mod core;
mod routes;

pub use crate::core::app_state::AppState;
use crate::routes::gitlab_webhook::gitlab_webhook_route::gitlab_webhook;
use crate::routes::health::health_route::health;

/// Binds the listener and serves until Ctrl+C.
pub async fn start(addr: &str, state: AppState) -> std::io::Result<()> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/webhook/gitlab", post(gitlab_webhook))
        .with_state(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Returns a future that resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
