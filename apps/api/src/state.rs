use std::sync::Arc;

use crate::analysis::orchestrator::Orchestrator;
use crate::config::Config;
use crate::matching::matcher::CaseMatcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Same matcher the orchestrator ranks with; exposed for the case endpoints.
    pub matcher: Arc<CaseMatcher>,
    pub config: Config,
    /// Display name of the inference provider chain, for health reporting.
    pub inference_name: String,
}
