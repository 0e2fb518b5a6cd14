//! Audit trigger and history handlers
//!
//! **[DQA-ORC-020]** POST /run-audit returns immediately with
//! `status: running`; the run executes as a supervised background task.
//! A second trigger while one is in flight is rejected with 409.

use crate::error::{ApiError, ApiResult};
use crate::models::AuditRun;
use crate::{db, AppState};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// POST /run-audit response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAuditResponse {
    pub status: &'static str,
    pub run_id: Uuid,
}

/// GET /audit-history query
#[derive(Debug, Deserialize)]
pub struct AuditHistoryQuery {
    pub limit: Option<i64>,
}

/// GET /audit-history response
#[derive(Debug, Serialize)]
pub struct AuditHistoryResponse {
    pub runs: Vec<AuditRun>,
}

/// POST /run-audit
///
/// Single-flight: the in-process guard plus an unfinished-run check reject
/// concurrent triggers so the same anomaly is never detected twice.
pub async fn run_audit(State(state): State<AppState>) -> ApiResult<Json<RunAuditResponse>> {
    let mut guard = state.active_run.lock().await;
    if let Some(run_id) = *guard {
        return Err(ApiError::Conflict(format!(
            "Audit run {} is already in flight",
            run_id
        )));
    }
    if db::runs::has_unfinished_run(&state.db).await.map_err(ApiError::from)? {
        return Err(ApiError::Conflict(
            "An unfinished audit run exists; wait for it to complete".to_string(),
        ));
    }

    let run = AuditRun::new();
    db::runs::save_run(&state.db, &run).await.map_err(ApiError::from)?;
    *guard = Some(run.id);
    drop(guard);

    tracing::info!(run_id = %run.id, "Audit run opened, spawning background task");

    let state_clone = state.clone();
    let run_id = run.id;
    tokio::spawn(async move {
        let orchestrator = state_clone.orchestrator();

        match orchestrator.execute_audit(run).await {
            Ok(run) => {
                tracing::info!(
                    run_id = %run.id,
                    data_quality_score = run.data_quality_score,
                    "Background audit task completed"
                );
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Background audit task failed");

                // Close the run from whatever the issues last recorded, so
                // the next trigger is not blocked by a forever-open row.
                if let Err(finalize_error) = orchestrator.finalize_run(run_id).await {
                    tracing::error!(
                        run_id = %run_id,
                        error = %finalize_error,
                        "Failed to finalize run after task failure"
                    );
                }
            }
        }

        *state_clone.active_run.lock().await = None;
    });

    Ok(Json(RunAuditResponse {
        status: "running",
        run_id,
    }))
}

/// GET /audit-history?limit=N
pub async fn audit_history(
    State(state): State<AppState>,
    Query(query): Query<AuditHistoryQuery>,
) -> ApiResult<Json<AuditHistoryResponse>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let runs = db::runs::list_runs(&state.db, limit).await.map_err(ApiError::from)?;

    Ok(Json(AuditHistoryResponse { runs }))
}

/// Build audit routes
pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/run-audit", post(run_audit))
        .route("/audit-history", get(audit_history))
}
