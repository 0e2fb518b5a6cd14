//! Report download handlers
//!
//! **[DQA-RPT-010]** Rendering is delegated to the ReportRenderer seam.

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};
use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

/// GET /report/:audit_id as a CSV attachment
pub async fn report_csv(
    State(state): State<AppState>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Response> {
    let run = db::runs::load_run(&state.db, audit_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Audit run not found: {}", audit_id)))?;
    let issues = db::issues::list_issues_for_run(&state.db, audit_id)
        .await
        .map_err(ApiError::from)?;

    let body = state.renderer.render_csv(&run, &issues);
    let filename = format!("audit-report-{}.csv", audit_id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

/// GET /email-preview/:audit_id as a renderable HTML report
pub async fn email_preview(
    State(state): State<AppState>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Html<String>> {
    let run = db::runs::load_run(&state.db, audit_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Audit run not found: {}", audit_id)))?;
    let issues = db::issues::list_issues_for_run(&state.db, audit_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Html(state.renderer.render_html(&run, &issues)))
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/report/:audit_id", get(report_csv))
        .route("/email-preview/:audit_id", get(email_preview))
}
