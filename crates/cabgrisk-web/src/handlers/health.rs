//! Liveness and loaded-model summary.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let models: Vec<Value> = state
        .pipeline
        .registry()
        .handles()
        .iter()
        .map(|h| {
            json!({
                "name": h.name(),
                "display_name": h.display_name,
                "features": h.subset.len(),
                "fingerprint": h.subset.fingerprint(),
            })
        })
        .collect();

    Json(json!({
        "status": "ok",
        "models": models,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
