pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis tasks
        .route("/api/v1/analyses", post(handlers::handle_submit_analysis))
        .route("/api/v1/analyses/:id", get(handlers::handle_get_analysis))
        .route(
            "/api/v1/analyses/:id/cancel",
            post(handlers::handle_cancel_analysis),
        )
        // Case corpus
        .route("/api/v1/similar-cases", get(handlers::handle_similar_cases))
        .route("/api/v1/cases", get(handlers::handle_case_details))
        .route("/api/v1/refresh-data", post(handlers::handle_refresh_data))
        .with_state(state)
}
