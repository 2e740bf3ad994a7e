use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

/// Health check handler
///
/// Reports liveness plus the number of open call sessions.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    Json(json!({
        "status": "OK",
        "active_sessions": state.sessions.len(),
        "relaying_sessions": state.sessions.relaying_count(),
    }))
}
