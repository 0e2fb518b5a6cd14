//! Remediation attempt persistence

use crate::models::{
    AttemptOutcome, DataSource, HumanFeedback, ProposedFix, RemediationAttempt,
};
use dqa_common::{Error, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Insert a completed attempt row
pub async fn save_attempt(conn: &mut SqliteConnection, attempt: &RemediationAttempt) -> Result<()> {
    let data_sources = serde_json::to_string(&attempt.data_sources)
        .map_err(|e| Error::Internal(format!("Failed to serialize data_sources: {}", e)))?;
    let fixes_applied = serde_json::to_string(&attempt.fixes_applied)
        .map_err(|e| Error::Internal(format!("Failed to serialize fixes_applied: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO remediation_attempts (
            id, issue_id, reasoning, confidence_score, data_sources, fixes_applied,
            completed_at, execution_time_ms, outcome, human_feedback, feedback_notes, learned
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(attempt.id.to_string())
    .bind(attempt.issue_id.to_string())
    .bind(&attempt.reasoning)
    .bind(attempt.confidence_score as i64)
    .bind(data_sources)
    .bind(fixes_applied)
    .bind(attempt.completed_at.to_rfc3339())
    .bind(attempt.execution_time_ms)
    .bind(attempt.outcome.as_str())
    .bind(attempt.human_feedback.map(|f| f.as_str()))
    .bind(&attempt.feedback_notes)
    .bind(attempt.learned as i64)
    .execute(conn)
    .await?;

    Ok(())
}

fn attempt_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RemediationAttempt> {
    let id: String = row.get("id");
    let issue_id: String = row.get("issue_id");
    let data_sources: String = row.get("data_sources");
    let fixes_applied: String = row.get("fixes_applied");
    let completed_at: String = row.get("completed_at");
    let outcome: String = row.get("outcome");
    let human_feedback: Option<String> = row.get("human_feedback");

    let data_sources: Vec<DataSource> = serde_json::from_str(&data_sources)
        .map_err(|e| Error::Internal(format!("Failed to deserialize data_sources: {}", e)))?;
    let fixes_applied: Vec<ProposedFix> = serde_json::from_str(&fixes_applied)
        .map_err(|e| Error::Internal(format!("Failed to deserialize fixes_applied: {}", e)))?;

    Ok(RemediationAttempt {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Failed to parse attempt id: {}", e)))?,
        issue_id: Uuid::parse_str(&issue_id)
            .map_err(|e| Error::Internal(format!("Failed to parse issue_id: {}", e)))?,
        reasoning: row.get("reasoning"),
        confidence_score: row.get::<i64, _>("confidence_score") as u8,
        data_sources,
        fixes_applied,
        completed_at: super::parse_ts(&completed_at, "completed_at")?,
        execution_time_ms: row.get("execution_time_ms"),
        outcome: AttemptOutcome::parse(&outcome)
            .ok_or_else(|| Error::Internal(format!("Unknown attempt outcome: {}", outcome)))?,
        human_feedback: human_feedback.as_deref().and_then(HumanFeedback::parse),
        feedback_notes: row.get("feedback_notes"),
        learned: row.get::<i64, _>("learned") != 0,
    })
}

/// Most recent attempt for an issue
pub async fn latest_attempt_for_issue(
    pool: &SqlitePool,
    issue_id: Uuid,
) -> Result<Option<RemediationAttempt>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM remediation_attempts
        WHERE issue_id = ?
        ORDER BY completed_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(issue_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(attempt_from_row).transpose()
}

/// All attempts for an issue, time-ordered
pub async fn list_attempts_for_issue(
    pool: &SqlitePool,
    issue_id: Uuid,
) -> Result<Vec<RemediationAttempt>> {
    let rows = sqlx::query(
        "SELECT * FROM remediation_attempts WHERE issue_id = ? ORDER BY completed_at ASC, rowid ASC",
    )
    .bind(issue_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(attempt_from_row).collect()
}

/// **[DQA-FBK-010]** Annotate an attempt with the human verdict
///
/// Only the Feedback Recorder writes these three columns.
pub async fn set_feedback(
    pool: &SqlitePool,
    attempt_id: Uuid,
    feedback: HumanFeedback,
    notes: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE remediation_attempts SET human_feedback = ?, feedback_notes = ?, learned = 1 WHERE id = ?",
    )
    .bind(feedback.as_str())
    .bind(notes)
    .bind(attempt_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Aggregate attempt statistics for the dashboard
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptStats {
    pub total_attempts: i64,
    pub failures: i64,
    pub average_confidence: f64,
    pub approved: i64,
    pub rejected: i64,
    pub modified: i64,
    pub learned: i64,
}

/// Attempt counters across the whole store
pub async fn attempt_stats(pool: &SqlitePool) -> Result<AttemptStats> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total_attempts,
            COALESCE(SUM(outcome = 'failure'), 0) AS failures,
            COALESCE(AVG(confidence_score), 0.0) AS average_confidence,
            COALESCE(SUM(human_feedback = 'approved'), 0) AS approved,
            COALESCE(SUM(human_feedback = 'rejected'), 0) AS rejected,
            COALESCE(SUM(human_feedback = 'modified'), 0) AS modified,
            COALESCE(SUM(learned), 0) AS learned
        FROM remediation_attempts
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(AttemptStats {
        total_attempts: row.get("total_attempts"),
        failures: row.get("failures"),
        average_confidence: row.get("average_confidence"),
        approved: row.get("approved"),
        rejected: row.get("rejected"),
        modified: row.get("modified"),
        learned: row.get("learned"),
    })
}
