use std::sync::Arc;

use review_pipeline::ReviewContext;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Optional shared secret expected in the `X-Gitlab-Token` header.
    /// `None` accepts unauthenticated webhooks (logged as a warning).
    pub webhook_secret: Option<String>,
    /// Wired review pipeline dependencies.
    pub ctx: Arc<ReviewContext>,
}
