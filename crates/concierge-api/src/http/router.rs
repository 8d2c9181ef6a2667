//! Axum router configuration with middleware.
//!
//! Routes: `POST /chat`, `GET /history/{sessionId}`, `POST /feedback`,
//! `GET /health`. Middleware: CORS (configurable allowed origins for widget
//! embedding) and request tracing.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);

    Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/history/{session_id}", get(handlers::history::history))
        .route("/feedback", post(handlers::feedback::feedback))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS layer from the configured origin list. `["*"]` (the default) allows
/// any origin; otherwise only the listed origins may embed the widget.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST];

    if allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring malformed allowed origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers([CONTENT_TYPE])
}

/// GET /health - liveness probe for the widget and deploy tooling.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "concierge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
