//! Manual intervention queue persistence
//!
//! **[DQA-QUE-040]** State transitions use atomic conditional updates
//! (`WHERE status IN (...)`, rows_affected check) so two concurrent
//! resolutions cannot both succeed.

use crate::models::{ManualQueueItem, ProposedFix, QueueStatus};
use chrono::{DateTime, Utc};
use dqa_common::{Error, Priority, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Insert a new pending queue item
pub async fn save_item(conn: &mut SqliteConnection, item: &ManualQueueItem) -> Result<()> {
    let ai_suggestions = serde_json::to_string(&item.ai_suggestions)
        .map_err(|e| Error::Internal(format!("Failed to serialize ai_suggestions: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO manual_queue (
            id, issue_id, priority, status, queued_at, sla_deadline, resolved_at,
            time_to_resolve_minutes, sla_missed, notes, resolution_action,
            ai_suggestions, ai_reasoning
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.issue_id.to_string())
    .bind(item.priority.as_str())
    .bind(item.status.as_str())
    .bind(item.queued_at.to_rfc3339())
    .bind(item.sla_deadline.to_rfc3339())
    .bind(item.resolved_at.map(|dt| dt.to_rfc3339()))
    .bind(item.time_to_resolve_minutes)
    .bind(item.sla_missed.map(|b| b as i64))
    .bind(&item.notes)
    .bind(&item.resolution_action)
    .bind(ai_suggestions)
    .bind(&item.ai_reasoning)
    .execute(conn)
    .await?;

    Ok(())
}

fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ManualQueueItem> {
    let id: String = row.get("id");
    let issue_id: String = row.get("issue_id");
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    let queued_at: String = row.get("queued_at");
    let sla_deadline: String = row.get("sla_deadline");
    let resolved_at: Option<String> = row.get("resolved_at");
    let sla_missed: Option<i64> = row.get("sla_missed");
    let ai_suggestions: String = row.get("ai_suggestions");

    let ai_suggestions: Vec<ProposedFix> = serde_json::from_str(&ai_suggestions)
        .map_err(|e| Error::Internal(format!("Failed to deserialize ai_suggestions: {}", e)))?;

    Ok(ManualQueueItem {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Failed to parse queue id: {}", e)))?,
        issue_id: Uuid::parse_str(&issue_id)
            .map_err(|e| Error::Internal(format!("Failed to parse issue_id: {}", e)))?,
        priority: Priority::parse(&priority)
            .ok_or_else(|| Error::Internal(format!("Unknown priority: {}", priority)))?,
        status: QueueStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("Unknown queue status: {}", status)))?,
        queued_at: super::parse_ts(&queued_at, "queued_at")?,
        sla_deadline: super::parse_ts(&sla_deadline, "sla_deadline")?,
        resolved_at: super::parse_opt_ts(resolved_at, "resolved_at")?,
        time_to_resolve_minutes: row.get("time_to_resolve_minutes"),
        sla_missed: sla_missed.map(|v| v != 0),
        notes: row.get("notes"),
        resolution_action: row.get("resolution_action"),
        ai_suggestions,
        ai_reasoning: row.get("ai_reasoning"),
    })
}

/// Load a queue item by id
pub async fn load_item(pool: &SqlitePool, queue_id: Uuid) -> Result<Option<ManualQueueItem>> {
    let row = sqlx::query("SELECT * FROM manual_queue WHERE id = ?")
        .bind(queue_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(item_from_row).transpose()
}

/// List queue items with optional filters
///
/// **[DQA-QUE-050]** Ordered P0 < P1 < P2, then queued_at ascending, so the
/// oldest highest-priority item surfaces first.
pub async fn list_items(
    pool: &SqlitePool,
    priority: Option<Priority>,
    status: Option<QueueStatus>,
) -> Result<Vec<ManualQueueItem>> {
    let mut sql = String::from("SELECT * FROM manual_queue WHERE 1=1");
    if priority.is_some() {
        sql.push_str(" AND priority = ?");
    }
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY priority ASC, queued_at ASC");

    let mut query = sqlx::query(&sql);
    if let Some(priority) = priority {
        query = query.bind(priority.as_str());
    }
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(item_from_row).collect()
}

/// pending → in_progress, only if still pending
///
/// Returns affected row count; 0 means the item was not pending.
pub async fn mark_in_progress(pool: &SqlitePool, queue_id: Uuid) -> Result<u64> {
    let result =
        sqlx::query("UPDATE manual_queue SET status = 'in_progress' WHERE id = ? AND status = 'pending'")
            .bind(queue_id.to_string())
            .execute(pool)
            .await?;

    Ok(result.rows_affected())
}

/// active → resolved, only if still active
///
/// Returns affected row count; 0 means another resolution won the race.
#[allow(clippy::too_many_arguments)]
pub async fn mark_resolved_conditional(
    conn: &mut SqliteConnection,
    queue_id: Uuid,
    resolved_at: DateTime<Utc>,
    time_to_resolve_minutes: i64,
    sla_missed: bool,
    action: &str,
    notes: Option<&str>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE manual_queue
        SET status = 'resolved', resolved_at = ?, time_to_resolve_minutes = ?,
            sla_missed = ?, resolution_action = ?, notes = ?
        WHERE id = ? AND status IN ('pending', 'in_progress')
        "#,
    )
    .bind(resolved_at.to_rfc3339())
    .bind(time_to_resolve_minutes)
    .bind(sla_missed as i64)
    .bind(action)
    .bind(notes)
    .bind(queue_id.to_string())
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Active (pending/in_progress) item count per issue; at most one by index
pub async fn active_item_count_for_issue(pool: &SqlitePool, issue_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM manual_queue WHERE issue_id = ? AND status IN ('pending', 'in_progress')",
    )
    .bind(issue_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Queue counters for the dashboard
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub pending: i64,
    pub in_progress: i64,
    /// Active items already past their SLA deadline
    pub overdue: i64,
}

pub async fn queue_stats(pool: &SqlitePool, now: DateTime<Utc>) -> Result<QueueStats> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(status = 'pending'), 0) AS pending,
            COALESCE(SUM(status = 'in_progress'), 0) AS in_progress,
            COALESCE(SUM(status IN ('pending', 'in_progress') AND sla_deadline < ?), 0) AS overdue
        FROM manual_queue
        "#,
    )
    .bind(now.to_rfc3339())
    .fetch_one(pool)
    .await?;

    Ok(QueueStats {
        pending: row.get("pending"),
        in_progress: row.get("in_progress"),
        overdue: row.get("overdue"),
    })
}
