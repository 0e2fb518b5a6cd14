//! Database access for dqa-audit
//!
//! **[DQA-DB-020]** One module per table, `save_/load_/list_` free functions
//! over the shared pool. Helpers that must participate in a transaction take
//! `&mut SqliteConnection`.

pub mod attempts;
pub mod issues;
pub mod queue;
pub mod records;
pub mod runs;

use chrono::{DateTime, Utc};
use dqa_common::{Error, Result};
use sqlx::SqlitePool;

/// Initialize all dqa-audit tables
///
/// Creates the four pipeline tables plus the entity record store.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_runs (
            id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            total_issues INTEGER NOT NULL DEFAULT 0,
            errors INTEGER NOT NULL DEFAULT 0,
            warnings INTEGER NOT NULL DEFAULT 0,
            info INTEGER NOT NULL DEFAULT 0,
            auto_fixed INTEGER NOT NULL DEFAULT 0,
            flagged_for_review INTEGER NOT NULL DEFAULT 0,
            manual_queue INTEGER NOT NULL DEFAULT 0,
            data_quality_score REAL NOT NULL DEFAULT 100.0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_issues (
            id TEXT PRIMARY KEY,
            audit_run_id TEXT NOT NULL,
            description TEXT NOT NULL,
            severity TEXT NOT NULL,
            status TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            suggested_fix TEXT,
            detected_at TEXT NOT NULL,
            resolved_by TEXT,
            resolved_at TEXT,
            resolution_notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issues_run ON audit_issues(audit_run_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS remediation_attempts (
            id TEXT PRIMARY KEY,
            issue_id TEXT NOT NULL,
            reasoning TEXT NOT NULL,
            confidence_score INTEGER NOT NULL,
            data_sources TEXT NOT NULL DEFAULT '[]',
            fixes_applied TEXT NOT NULL DEFAULT '[]',
            completed_at TEXT NOT NULL,
            execution_time_ms INTEGER NOT NULL,
            outcome TEXT NOT NULL,
            human_feedback TEXT,
            feedback_notes TEXT,
            learned INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_attempts_issue ON remediation_attempts(issue_id, completed_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manual_queue (
            id TEXT PRIMARY KEY,
            issue_id TEXT NOT NULL,
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            queued_at TEXT NOT NULL,
            sla_deadline TEXT NOT NULL,
            resolved_at TEXT,
            time_to_resolve_minutes INTEGER,
            sla_missed INTEGER,
            notes TEXT,
            resolution_action TEXT,
            ai_suggestions TEXT NOT NULL DEFAULT '[]',
            ai_reasoning TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One active (pending/in_progress) item per issue
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_active_issue
        ON manual_queue(issue_id) WHERE status IN ('pending', 'in_progress')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_queue_order ON manual_queue(priority, queued_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entity_records (
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (entity_type, entity_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (audit_runs, audit_issues, remediation_attempts, manual_queue, entity_records)"
    );

    Ok(())
}

/// Parse an RFC3339 TEXT column
pub(crate) fn parse_ts(value: &str, column: &str) -> Result<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

/// Parse an optional RFC3339 TEXT column
pub(crate) fn parse_opt_ts(value: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>> {
    value.map(|s| parse_ts(&s, column)).transpose()
}
