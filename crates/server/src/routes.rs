use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, MethodRouter};
use axum::{middleware, Router};
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers;
use crate::middleware::{cors_headers, request_logging};
use crate::state::AppState;

/// POST endpoint that also answers CORS preflight and rejects other
/// methods with a JSON 405.
fn json_endpoint<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: axum::handler::Handler<T, AppState>,
    T: 'static,
{
    post(handler)
        .options(handlers::preflight)
        .fallback(handlers::method_not_allowed)
}

pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/analyze", json_endpoint(handlers::analyze))
        .route("/analyze", json_endpoint(handlers::analyze))
        .route("/api/feedback", json_endpoint(handlers::feedback))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(cors_headers))
        .with_state(state)
}
