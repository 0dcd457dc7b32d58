use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use review_pipeline::pipeline;

use crate::core::app_state::AppState;
use crate::routes::gitlab_webhook::payload::MergeRequestEvent;
use crate::routes::gitlab_webhook::screen::{self, Screen};
use crate::routes::gitlab_webhook::validate;

/// POST /webhook/gitlab
///
/// Validates the secret and payload shape, screens the event, then
/// dispatches the review pipeline as a background task and answers
/// 202 immediately. Background failures are only observable through the
/// MR comment and the usage ledger.
pub async fn gitlab_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match &state.webhook_secret {
        Some(secret) => {
            let token = headers.get("x-gitlab-token").and_then(|v| v.to_str().ok());
            if token != Some(secret.as_str()) {
                warn!("webhook rejected: invalid secret token");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Unauthorized: invalid webhook secret" })),
                );
            }
        }
        None => warn!("webhook secret not configured; accepting unauthenticated request"),
    }

    if let Err(reason) = validate::validate_payload(&payload) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid payload: {reason}") })),
        );
    }

    let object_kind = payload["object_kind"].as_str().unwrap_or_default();
    if object_kind != "merge_request" {
        info!("ignoring webhook of kind '{object_kind}'");
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ignored",
                "message": format!("unsupported webhook type: {object_kind}"),
            })),
        );
    }

    if let Err(reason) = validate::validate_merge_request_payload(&payload) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid MR payload: {reason}") })),
        );
    }

    let event: MergeRequestEvent = match serde_json::from_value(payload) {
        Ok(e) => e,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid MR payload: {e}") })),
            );
        }
    };

    let attrs = &event.object_attributes;
    info!(
        "webhook received: MR !{} ({} / {})",
        attrs.iid, attrs.action, attrs.state
    );
    if let Some(title) = &attrs.title {
        info!("  title: {title}");
    }
    if let (Some(source), Some(target)) = (&attrs.source_branch, &attrs.target_branch) {
        info!("  branches: {source} -> {target}");
    }

    match screen::screen_event(&event, &state.ctx.project_id) {
        Screen::Skip(reason) => {
            info!("webhook skipped: {reason}");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "skipped",
                    "message": reason,
                    "mrIid": attrs.iid,
                    "action": attrs.action,
                })),
            )
        }
        Screen::Process => {
            let ctx = state.ctx.clone();
            let iid = attrs.iid;
            // Fire-and-forget: the response never waits for the review.
            tokio::spawn(async move {
                pipeline::process_merge_request_by_iid(&ctx, iid).await;
            });
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "status": "accepted",
                    "message": format!("review of MR !{iid} started"),
                    "mrIid": iid,
                    "action": attrs.action,
                })),
            )
        }
    }
}
