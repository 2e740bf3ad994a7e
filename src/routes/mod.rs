//! Router assembly
//!
//! - `relay` - the `/realtime-ai` WebSocket endpoint
//!
//! [`app`] combines the routes with the CORS and security-header layers
//! shared by `main.rs` and the integration tests.

pub mod relay;

use axum::Router;
use http::{
    HeaderName, HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::handlers::api;
use crate::state::AppState;

fn allowed_headers() -> [HeaderName; 4] {
    [
        AUTHORIZATION,
        CONTENT_TYPE,
        HeaderName::from_static("x-client-info"),
        HeaderName::from_static("apikey"),
    ]
}

/// Build the CORS layer from `cors_allowed_origins`.
///
/// `"*"` allows any origin; a comma-separated list allows exactly those.
/// Preflight requests are answered by the layer itself.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    match config.cors_allowed_origins.as_deref() {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(allowed_headers())
            .allow_credentials(false),
        Some(origins) => {
            // Parse comma-separated origins
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(methods)
                .allow_headers(allowed_headers())
                .allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            CorsLayer::new()
                .allow_methods(methods)
                .allow_headers(allowed_headers())
                .allow_credentials(false)
        }
    }
}

/// The complete application router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    Router::new()
        .route("/", axum::routing::get(api::health_check))
        .merge(relay::create_relay_router())
        .with_state(state)
        .layer(cors)
        .layer(security_headers)
}
