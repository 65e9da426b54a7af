//! Axum router: maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    api::{api_predict, api_schema},
    form::{form_page, predict_form},
    health::health,
};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",        get(form_page))
        .route("/predict", post(predict_form))

        // API endpoints
        .route("/api/predict", post(api_predict))
        .route("/api/schema",  get(api_schema))
        .route("/health",      get(health))

        // Static files
        .nest_service("/static", static_dir)

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
