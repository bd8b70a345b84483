use crate::infrastructure::http::controllers;
use crate::infrastructure::http::middleware::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState, api_prefix: &str) -> Router {
    let api = Router::new()
        .route("/health", get(controllers::health::get_health))
        .route("/calculate", post(controllers::calculate::calculate));

    let prefix = api_prefix.trim_matches('/');
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{}", prefix), api)
    };

    router
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
