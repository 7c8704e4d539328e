use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Body ceiling for part uploads; the store enforces the configured
/// per-part byte limit below this.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions", post(handlers::start_session))
        .route("/sessions/:session_id/parts", post(handlers::append_part))
        .route(
            "/sessions/:session_id/partial",
            get(handlers::partial_transcript),
        )
        .route(
            "/sessions/:session_id/finalize",
            post(handlers::finalize_session),
        )
        .route(
            "/sessions/:session_id/cancel",
            post(handlers::cancel_session),
        )
        // Request logging, browser capture clients, raw part bodies
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
