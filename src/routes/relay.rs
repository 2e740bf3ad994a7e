//! Relay WebSocket route configuration

use axum::{Router, routing::any};
use tower_http::trace::TraceLayer;

use crate::handlers::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Path of the call relay endpoint
pub const RELAY_PATH: &str = "/realtime-ai";

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /realtime-ai` - WebSocket upgrade for one call
///
/// Other methods and non-upgrade requests are answered with `400`.
///
/// # Example
///
/// ```json
/// // Client opens the call
/// {"type": "session.init", "context": "Acme Corp, evaluating CRM vendors"}
///
/// // Provider events then flow back verbatim, starting with
/// {"type": "session.created", "session": {"id": "..."}}
///
/// // Client streams captured audio
/// {"type": "input_audio_buffer.append", "audio": "<base64 pcm16>"}
/// ```
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(RELAY_PATH, any(relay_handler))
        .layer(TraceLayer::new_for_http())
}
