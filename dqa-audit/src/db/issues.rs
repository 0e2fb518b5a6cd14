//! Audit issue persistence and run aggregation

use crate::models::{AuditIssue, IssueStatus, ResolvedBy};
use chrono::{DateTime, Utc};
use dqa_common::{Error, Result, Severity};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Insert a freshly detected issue
pub async fn save_issue(conn: &mut SqliteConnection, issue: &AuditIssue) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_issues (
            id, audit_run_id, description, severity, status, entity_type, entity_id,
            suggested_fix, detected_at, resolved_by, resolved_at, resolution_notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(issue.id.to_string())
    .bind(issue.audit_run_id.to_string())
    .bind(&issue.description)
    .bind(issue.severity.as_str())
    .bind(issue.status.as_str())
    .bind(&issue.entity_type)
    .bind(&issue.entity_id)
    .bind(&issue.suggested_fix)
    .bind(issue.detected_at.to_rfc3339())
    .bind(issue.resolved_by.map(|r| r.as_str()))
    .bind(issue.resolved_at.map(|dt| dt.to_rfc3339()))
    .bind(&issue.resolution_notes)
    .execute(conn)
    .await?;

    Ok(())
}

fn issue_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuditIssue> {
    let id: String = row.get("id");
    let run_id: String = row.get("audit_run_id");
    let severity: String = row.get("severity");
    let status: String = row.get("status");
    let resolved_by: Option<String> = row.get("resolved_by");
    let detected_at: String = row.get("detected_at");
    let resolved_at: Option<String> = row.get("resolved_at");

    Ok(AuditIssue {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Failed to parse issue id: {}", e)))?,
        audit_run_id: Uuid::parse_str(&run_id)
            .map_err(|e| Error::Internal(format!("Failed to parse audit_run_id: {}", e)))?,
        description: row.get("description"),
        severity: Severity::parse(&severity)
            .ok_or_else(|| Error::Internal(format!("Unknown severity: {}", severity)))?,
        status: IssueStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("Unknown issue status: {}", status)))?,
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        suggested_fix: row.get("suggested_fix"),
        detected_at: super::parse_ts(&detected_at, "detected_at")?,
        resolved_by: resolved_by.as_deref().and_then(ResolvedBy::parse),
        resolved_at: super::parse_opt_ts(resolved_at, "resolved_at")?,
        resolution_notes: row.get("resolution_notes"),
    })
}

/// Load an issue by id
pub async fn load_issue(pool: &SqlitePool, issue_id: Uuid) -> Result<Option<AuditIssue>> {
    let row = sqlx::query("SELECT * FROM audit_issues WHERE id = ?")
        .bind(issue_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(issue_from_row).transpose()
}

/// All issues of a run, detection order
pub async fn list_issues_for_run(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<AuditIssue>> {
    let rows = sqlx::query(
        "SELECT * FROM audit_issues WHERE audit_run_id = ? ORDER BY detected_at ASC, id ASC",
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(issue_from_row).collect()
}

/// detected → auto_fixed, resolved by the AI
pub async fn mark_auto_fixed(
    conn: &mut SqliteConnection,
    issue_id: Uuid,
    resolved_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE audit_issues SET status = 'auto_fixed', resolved_by = 'ai', resolved_at = ? WHERE id = ?",
    )
    .bind(resolved_at.to_rfc3339())
    .bind(issue_id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// detected → escalated
pub async fn mark_escalated(conn: &mut SqliteConnection, issue_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE audit_issues SET status = 'escalated' WHERE id = ?")
        .bind(issue_id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

/// escalated → resolved by a human reviewer
pub async fn mark_resolved(
    conn: &mut SqliteConnection,
    issue_id: Uuid,
    notes: Option<&str>,
    resolved_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE audit_issues
        SET status = 'resolved', resolved_by = 'human', resolved_at = ?, resolution_notes = ?
        WHERE id = ?
        "#,
    )
    .bind(resolved_at.to_rfc3339())
    .bind(notes)
    .bind(issue_id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// Aggregate counters for one run, computed from the issue set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub total_issues: i64,
    pub errors: i64,
    pub warnings: i64,
    pub info: i64,
    pub auto_fixed: i64,
    /// Escalations caused by a collaborator error or timeout
    pub flagged_for_review: i64,
    /// Low-confidence escalations routed to the manual queue
    pub manual_queue: i64,
}

/// **[DQA-ORC-050]** One-shot aggregation over a run's finalized issues
///
/// Escalations are split by the latest attempt's outcome: `failure` counts
/// as flagged_for_review, `success` (low confidence) as manual_queue.
pub async fn aggregate_run_counts(pool: &SqlitePool, run_id: Uuid) -> Result<RunCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total_issues,
            COALESCE(SUM(severity = 'error'), 0) AS errors,
            COALESCE(SUM(severity = 'warning'), 0) AS warnings,
            COALESCE(SUM(severity = 'info'), 0) AS info,
            COALESCE(SUM(status = 'auto_fixed'), 0) AS auto_fixed
        FROM audit_issues
        WHERE audit_run_id = ?
        "#,
    )
    .bind(run_id.to_string())
    .fetch_one(pool)
    .await?;

    let escalation_row = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(a.outcome = 'failure'), 0) AS flagged_for_review,
            COALESCE(SUM(a.outcome = 'success'), 0) AS manual_queue
        FROM audit_issues i
        JOIN remediation_attempts a ON a.id = (
            SELECT id FROM remediation_attempts
            WHERE issue_id = i.id
            ORDER BY completed_at DESC, rowid DESC
            LIMIT 1
        )
        WHERE i.audit_run_id = ? AND i.status IN ('escalated', 'resolved')
        "#,
    )
    .bind(run_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(RunCounts {
        total_issues: row.get("total_issues"),
        errors: row.get("errors"),
        warnings: row.get("warnings"),
        info: row.get("info"),
        auto_fixed: row.get("auto_fixed"),
        flagged_for_review: escalation_row.get("flagged_for_review"),
        manual_queue: escalation_row.get("manual_queue"),
    })
}
