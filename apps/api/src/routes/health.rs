use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Reports service status without loading the corpus.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let tiers = state.matcher.ranker().tiers();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "compass-api",
        "inference": state.inference_name,
        "corpus_loaded": state.matcher.is_loaded().await,
        "case_source": state.matcher.repository_label(),
        "tier_table": tiers.source(),
    }))
}
