//! Route definitions and router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// CORS for the API routes. Origins that are not valid header values are
/// skipped with a warning.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            use axum::http::HeaderValue;
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(%origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Relay routes without the `/api` prefix.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/relay/status", get(handlers::relay::status))
        .route("/relay/start", post(handlers::relay::start))
        .route("/relay/stop", post(handlers::relay::stop))
        .route("/relay/paths", get(handlers::relay::paths))
        .route("/relay/config", get(handlers::relay::config))
        .route(
            "/relay/logs",
            get(handlers::relay::logs).delete(handlers::relay::clear_logs),
        )
        .route("/relay/events", get(handlers::events::stream))
}

/// Router serving `/health` and everything under `/api`.
///
/// CORS applies to the API only; the trace layer covers both.
pub fn create_router(ctx: AxumContext, cors_config: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes().with_state(state).layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Liveness of the HTTP server itself, independent of the relay.
pub(crate) async fn health_check() -> &'static str {
    "OK"
}
