use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::task_store::{TaskStatus, TaskStatusView};
use crate::errors::AppError;
use crate::matching::ranker::SimilarityResult;
use crate::models::case::CaseRecord;
use crate::models::profile::{GpaScale, Profile, TargetConstraints};
use crate::state::AppState;

const DEFAULT_SIMILAR_CASES: usize = 50;
const EXPLORATION_DEGREE: &str = "Master";

#[derive(Debug, Serialize)]
pub struct TaskAccepted {
    pub task_id: Uuid,
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct SimilarCasesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SimilarCasesResponse {
    pub total: usize,
    pub cases: Vec<SimilarityResult>,
}

#[derive(Debug, Deserialize)]
pub struct CaseIdsQuery {
    /// Comma-separated case ids.
    pub ids: String,
}

#[derive(Debug, Serialize)]
pub struct CaseDetailsResponse {
    pub cases: Vec<CaseRecord>,
}

#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub status: &'static str,
}

/// Profile with nothing to match on apart from the master's degree filter, so
/// ranking falls back to the order the neutral component scores produce.
fn neutral_profile() -> Profile {
    Profile {
        institution: String::new(),
        major: String::new(),
        gpa: 0.0,
        gpa_scale: GpaScale::Four,
        graduation_year: None,
        tests: Vec::new(),
        research_experiences: Vec::new(),
        internship_experiences: Vec::new(),
        other_experiences: Vec::new(),
        targets: TargetConstraints {
            degree_type: Some(EXPLORATION_DEGREE.to_string()),
            ..TargetConstraints::default()
        },
    }
}

/// POST /api/v1/analyses
pub async fn handle_submit_analysis(
    State(state): State<AppState>,
    payload: Result<Json<Profile>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskAccepted>), AppError> {
    let Json(profile) = payload?;
    let task_id = state.orchestrator.submit(profile).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            task_id,
            status: TaskStatus::Pending,
        }),
    ))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TaskStatusView>, AppError> {
    let Path(id) = path?;
    Ok(Json(state.orchestrator.status(id).await?))
}

/// POST /api/v1/analyses/:id/cancel
pub async fn handle_cancel_analysis(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TaskAccepted>, AppError> {
    let Path(id) = path?;
    state.orchestrator.cancel(id).await?;
    Ok(Json(TaskAccepted {
        task_id: id,
        status: TaskStatus::Cancelled,
    }))
}

/// GET /api/v1/similar-cases?limit=N
pub async fn handle_similar_cases(
    State(state): State<AppState>,
    query: Result<Query<SimilarCasesQuery>, QueryRejection>,
) -> Result<Json<SimilarCasesResponse>, AppError> {
    let Query(params) = query?;
    let max = state.config.similar_cases_api_limit.max(1);
    let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_CASES).clamp(1, max);
    let cases = state
        .matcher
        .rank(Arc::new(neutral_profile()), limit)
        .await?;
    Ok(Json(SimilarCasesResponse {
        total: cases.len(),
        cases,
    }))
}

/// GET /api/v1/cases?ids=1,2,3
pub async fn handle_case_details(
    State(state): State<AppState>,
    query: Result<Query<CaseIdsQuery>, QueryRejection>,
) -> Result<Json<CaseDetailsResponse>, AppError> {
    let Query(params) = query?;
    let ids = params
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AppError::InvalidInput(format!("'{s}' is not a case id")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(AppError::InvalidInput("ids must name at least one case".to_string()));
    }
    let cases = state.matcher.case_details(&ids).await?;
    Ok(Json(CaseDetailsResponse { cases }))
}

/// POST /api/v1/refresh-data
/// Reload runs in the background; the old snapshot keeps serving until it finishes.
pub async fn handle_refresh_data(
    State(state): State<AppState>,
) -> (StatusCode, Json<RefreshAccepted>) {
    let matcher = Arc::clone(&state.matcher);
    tokio::spawn(async move {
        match matcher.refresh().await {
            Ok(snapshot) => info!(
                version = snapshot.version,
                cases = snapshot.len(),
                "corpus refreshed"
            ),
            Err(e) => error!("corpus refresh failed: {e}"),
        }
    });
    (
        StatusCode::ACCEPTED,
        Json(RefreshAccepted {
            status: "refreshing",
        }),
    )
}
