//! Dashboard summary handler

use crate::error::{ApiError, ApiResult};
use crate::models::AuditRun;
use crate::{db, AppState};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// GET /dashboard response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub has_data: bool,
    pub current_score: f64,
    /// `current_score - previous_score`; 0 with fewer than two runs
    pub improvement: f64,
    /// "improving" | "declining" | "stable"
    pub trend: &'static str,
    pub latest_audit: Option<AuditRun>,
    pub manual_queue: ManualQueueSummary,
    pub ai_performance: AiPerformanceSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualQueueSummary {
    pub pending: i64,
    pub in_progress: i64,
    pub overdue: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPerformanceSummary {
    pub total_attempts: i64,
    pub failures: i64,
    pub average_confidence: f64,
    pub approved: i64,
    pub rejected: i64,
    pub modified: i64,
    pub learned: i64,
}

fn trend_for(improvement: f64) -> &'static str {
    if improvement > 0.0 {
        "improving"
    } else if improvement < 0.0 {
        "declining"
    } else {
        "stable"
    }
}

/// GET /dashboard
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardResponse>> {
    let recent = db::runs::latest_completed_runs(&state.db, 2)
        .await
        .map_err(ApiError::from)?;

    let current_score = recent.first().map(|r| r.data_quality_score).unwrap_or(0.0);
    let improvement = match (recent.first(), recent.get(1)) {
        (Some(current), Some(previous)) => {
            current.data_quality_score - previous.data_quality_score
        }
        _ => 0.0,
    };

    let queue_stats = db::queue::queue_stats(&state.db, chrono::Utc::now())
        .await
        .map_err(ApiError::from)?;
    let attempt_stats = db::attempts::attempt_stats(&state.db)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(DashboardResponse {
        has_data: !recent.is_empty(),
        current_score,
        improvement,
        trend: trend_for(improvement),
        latest_audit: recent.into_iter().next(),
        manual_queue: ManualQueueSummary {
            pending: queue_stats.pending,
            in_progress: queue_stats.in_progress,
            overdue: queue_stats.overdue,
        },
        ai_performance: AiPerformanceSummary {
            total_attempts: attempt_stats.total_attempts,
            failures: attempt_stats.failures,
            average_confidence: attempt_stats.average_confidence,
            approved: attempt_stats.approved,
            rejected: attempt_stats.rejected,
            modified: attempt_stats.modified,
            learned: attempt_stats.learned,
        },
    }))
}

/// Build dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_follows_improvement_sign() {
        assert_eq!(trend_for(2.5), "improving");
        assert_eq!(trend_for(-0.1), "declining");
        assert_eq!(trend_for(0.0), "stable");
    }
}
