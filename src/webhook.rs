//! HTTP endpoints that receive Memos webhooks.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::forward::Forwarder;
use crate::memo::NotificationPayload;

/// Shared state for webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub forwarder: Arc<Forwarder>,
}

/// POST /api/webhook/memos
///
/// Forwards the memo and acknowledges once both channels have finished.
/// Channel-level delivery failures still answer 200.
async fn receive_memos_webhook(
    State(state): State<WebhookState>,
    Json(payload): Json<NotificationPayload>,
) -> impl IntoResponse {
    tracing::info!(activity_type = %payload.activity_type, "Received Memos webhook");

    match state.forwarder.forward(&payload).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => {
            tracing::error!(error = %e, "Error processing Memos webhook");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal server error"})),
            )
        }
    }
}

/// GET /api/webhook/health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "g2g",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Build the webhook router.
pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/api/webhook/memos", post(receive_memos_webhook))
        .route("/api/webhook/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
