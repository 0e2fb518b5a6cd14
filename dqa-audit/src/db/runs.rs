//! Audit run persistence
//!
//! **[DQA-ORC-050]** Run counters are written by `finalize_run` in one pass;
//! the open row carries zeroed counters until then.

use crate::models::AuditRun;
use dqa_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Insert or update a run row
pub async fn save_run(pool: &SqlitePool, run: &AuditRun) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_runs (
            id, started_at, completed_at, total_issues, errors, warnings, info,
            auto_fixed, flagged_for_review, manual_queue, data_quality_score
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            completed_at = excluded.completed_at,
            total_issues = excluded.total_issues,
            errors = excluded.errors,
            warnings = excluded.warnings,
            info = excluded.info,
            auto_fixed = excluded.auto_fixed,
            flagged_for_review = excluded.flagged_for_review,
            manual_queue = excluded.manual_queue,
            data_quality_score = excluded.data_quality_score
        "#,
    )
    .bind(run.id.to_string())
    .bind(run.started_at.to_rfc3339())
    .bind(run.completed_at.map(|dt| dt.to_rfc3339()))
    .bind(run.total_issues)
    .bind(run.errors)
    .bind(run.warnings)
    .bind(run.info)
    .bind(run.auto_fixed)
    .bind(run.flagged_for_review)
    .bind(run.manual_queue)
    .bind(run.data_quality_score)
    .execute(pool)
    .await?;

    Ok(())
}

fn run_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuditRun> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| dqa_common::Error::Internal(format!("Failed to parse run id: {}", e)))?;

    let started_at: String = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");

    Ok(AuditRun {
        id,
        started_at: super::parse_ts(&started_at, "started_at")?,
        completed_at: super::parse_opt_ts(completed_at, "completed_at")?,
        total_issues: row.get("total_issues"),
        errors: row.get("errors"),
        warnings: row.get("warnings"),
        info: row.get("info"),
        auto_fixed: row.get("auto_fixed"),
        flagged_for_review: row.get("flagged_for_review"),
        manual_queue: row.get("manual_queue"),
        data_quality_score: row.get("data_quality_score"),
    })
}

/// Load a run by id
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<AuditRun>> {
    let row = sqlx::query("SELECT * FROM audit_runs WHERE id = ?")
        .bind(run_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(run_from_row).transpose()
}

/// Recent runs, newest first
pub async fn list_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<AuditRun>> {
    let rows = sqlx::query("SELECT * FROM audit_runs ORDER BY started_at DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(run_from_row).collect()
}

/// Most recent completed runs, newest first (dashboard score + trend)
pub async fn latest_completed_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<AuditRun>> {
    let rows = sqlx::query(
        "SELECT * FROM audit_runs WHERE completed_at IS NOT NULL ORDER BY completed_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(run_from_row).collect()
}

/// Whether any run is still open
///
/// **[DQA-ORC-020]** Single-flight backstop: a second trigger while a run is
/// in flight is rejected, not interleaved.
pub async fn has_unfinished_run(pool: &SqlitePool) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_runs WHERE completed_at IS NULL")
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

/// Ids of runs left open by a previous process (startup sweep input)
pub async fn unfinished_run_ids(pool: &SqlitePool) -> Result<Vec<Uuid>> {
    let rows: Vec<String> =
        sqlx::query_scalar("SELECT id FROM audit_runs WHERE completed_at IS NULL")
            .fetch_all(pool)
            .await?;

    rows.iter()
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|e| dqa_common::Error::Internal(format!("Failed to parse run id: {}", e)))
        })
        .collect()
}
