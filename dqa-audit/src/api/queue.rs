//! Manual queue API handlers

use crate::error::{ApiError, ApiResult};
use crate::models::{ManualQueueItem, QueueStatus, ResolutionAction};
use crate::services::queue_manager::QueueEntry;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use dqa_common::Priority;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GET /manual-queue query
#[derive(Debug, Deserialize)]
pub struct QueueListQuery {
    pub priority: Option<String>,
    pub status: Option<String>,
}

/// GET /manual-queue response
#[derive(Debug, Serialize)]
pub struct QueueListResponse {
    pub items: Vec<QueueEntry>,
}

/// POST /resolve-issue request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveIssueRequest {
    pub queue_id: Uuid,
    pub action: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub apply_ai_suggestion: bool,
}

/// POST /resolve-issue response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveIssueResponse {
    pub success: bool,
    pub message: String,
    pub sla_missed: bool,
}

/// POST /claim-issue request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimIssueRequest {
    pub queue_id: Uuid,
}

/// POST /claim-issue response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimIssueResponse {
    pub success: bool,
    pub queue_item: ManualQueueItem,
}

/// GET /manual-queue?priority=&status=
pub async fn list_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueListQuery>,
) -> ApiResult<Json<QueueListResponse>> {
    let priority = query
        .priority
        .as_deref()
        .map(|s| {
            Priority::parse(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown priority filter: {}", s)))
        })
        .transpose()?;
    let status = query
        .status
        .as_deref()
        .map(|s| {
            QueueStatus::parse(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown status filter: {}", s)))
        })
        .transpose()?;

    let items = state.queue_manager().list(priority, status).await?;

    Ok(Json(QueueListResponse { items }))
}

/// POST /resolve-issue
///
/// **[DQA-QUE-030]** 404 for an unknown queue id, 409 for an already
/// resolved item; neither mutates any state.
pub async fn resolve_issue(
    State(state): State<AppState>,
    Json(request): Json<ResolveIssueRequest>,
) -> ApiResult<Json<ResolveIssueResponse>> {
    let action = ResolutionAction::parse(&request.action).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown action '{}' (expected approve|reject|custom)",
            request.action
        ))
    })?;

    let result = state
        .queue_manager()
        .resolve(
            request.queue_id,
            action,
            request.notes,
            request.apply_ai_suggestion,
        )
        .await?;

    Ok(Json(ResolveIssueResponse {
        success: true,
        message: format!(
            "Issue {} resolved ({})",
            result.issue_id,
            action.as_str()
        ),
        sla_missed: result.sla_missed,
    }))
}

/// POST /claim-issue
pub async fn claim_issue(
    State(state): State<AppState>,
    Json(request): Json<ClaimIssueRequest>,
) -> ApiResult<Json<ClaimIssueResponse>> {
    let item = state.queue_manager().claim(request.queue_id).await?;

    Ok(Json(ClaimIssueResponse {
        success: true,
        queue_item: item,
    }))
}

/// Build queue routes
pub fn queue_routes() -> Router<AppState> {
    Router::new()
        .route("/manual-queue", get(list_queue))
        .route("/resolve-issue", post(resolve_issue))
        .route("/claim-issue", post(claim_issue))
}
