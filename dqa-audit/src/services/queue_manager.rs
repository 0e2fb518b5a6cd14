//! Manual intervention queue manager
//!
//! **[DQA-QUE-010]** Owns unresolved issues awaiting human judgment: claim,
//! resolve, list. Resolution is an atomic conditional transition so a
//! double-resolution race loses cleanly with `InvalidState`.

use crate::db::records::{self, SchemaRegistry};
use crate::db::{issues, queue};
use crate::models::{
    AuditIssue, ManualQueueItem, QueueStatus, ResolutionAction,
};
use crate::services::feedback::FeedbackRecorder;
use chrono::Utc;
use dqa_common::events::{DqaEvent, EventBus};
use dqa_common::{Error, Priority, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A queue item joined with its owning issue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub queue_item: ManualQueueItem,
    pub issue: AuditIssue,
}

/// Result of a successful resolution
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub queue_id: Uuid,
    pub issue_id: Uuid,
    pub sla_missed: bool,
    pub time_to_resolve_minutes: i64,
}

/// Queue lifecycle owner
pub struct QueueManager {
    db: SqlitePool,
    event_bus: EventBus,
    registry: SchemaRegistry,
    feedback: FeedbackRecorder,
}

impl QueueManager {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        registry: SchemaRegistry,
        feedback: FeedbackRecorder,
    ) -> Self {
        Self {
            db,
            event_bus,
            registry,
            feedback,
        }
    }

    /// **[DQA-QUE-050]** List queue items with optional filters
    ///
    /// Ordered P0 < P1 < P2, then queued_at ascending; each row joined with
    /// its owning issue.
    pub async fn list(
        &self,
        priority: Option<Priority>,
        status: Option<QueueStatus>,
    ) -> Result<Vec<QueueEntry>> {
        let items = queue::list_items(&self.db, priority, status).await?;

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let issue = issues::load_issue(&self.db, item.issue_id)
                .await?
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "Queue item {} references missing issue {}",
                        item.id, item.issue_id
                    ))
                })?;
            entries.push(QueueEntry {
                queue_item: item,
                issue,
            });
        }

        Ok(entries)
    }

    /// Reviewer claims an item: pending → in_progress
    pub async fn claim(&self, queue_id: Uuid) -> Result<ManualQueueItem> {
        let affected = queue::mark_in_progress(&self.db, queue_id).await?;
        if affected == 0 {
            let item = queue::load_item(&self.db, queue_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Queue item not found: {}", queue_id)))?;
            return Err(Error::InvalidState(format!(
                "Queue item {} is {}, not pending",
                queue_id,
                item.status.as_str()
            )));
        }

        let item = queue::load_item(&self.db, queue_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Queue item vanished: {}", queue_id)))?;

        tracing::info!(queue_id = %queue_id, issue_id = %item.issue_id, "Queue item claimed");

        self.event_bus.emit_lossy(DqaEvent::QueueItemClaimed {
            queue_id,
            issue_id: item.issue_id,
            timestamp: Utc::now(),
        });

        Ok(item)
    }

    /// **[DQA-QUE-030]** Resolve a queue item
    ///
    /// Fails with `NotFound` for an unknown id and `InvalidState` for an
    /// already-resolved item; neither mutates any state. On success the queue
    /// item, owning issue, and (optionally) the entity record transition in
    /// one transaction, then feedback is recorded as the last step.
    pub async fn resolve(
        &self,
        queue_id: Uuid,
        action: ResolutionAction,
        notes: Option<String>,
        apply_ai_suggestion: bool,
    ) -> Result<ResolutionResult> {
        let item = queue::load_item(&self.db, queue_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Queue item not found: {}", queue_id)))?;

        if item.status == QueueStatus::Resolved {
            return Err(Error::InvalidState(format!(
                "Queue item {} is already resolved",
                queue_id
            )));
        }

        let issue = issues::load_issue(&self.db, item.issue_id)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!(
                    "Queue item {} references missing issue {}",
                    queue_id, item.issue_id
                ))
            })?;

        let resolved_at = Utc::now();
        let time_to_resolve_minutes =
            ManualQueueItem::time_to_resolve(item.queued_at, resolved_at);
        let sla_missed = resolved_at > item.sla_deadline;

        let mut txn = self.db.begin().await?;

        let affected = queue::mark_resolved_conditional(
            &mut *txn,
            queue_id,
            resolved_at,
            time_to_resolve_minutes,
            sla_missed,
            action.as_str(),
            notes.as_deref(),
        )
        .await?;
        if affected == 0 {
            // Lost the race against a concurrent resolution
            return Err(Error::InvalidState(format!(
                "Queue item {} is already resolved",
                queue_id
            )));
        }

        if apply_ai_suggestion {
            for fix in &item.ai_suggestions {
                self.registry.validate_fix(&issue.entity_type, fix)?;
                records::apply_fix(&mut *txn, &issue.entity_type, &issue.entity_id, fix).await?;
            }
        }

        issues::mark_resolved(&mut *txn, issue.id, notes.as_deref(), resolved_at).await?;

        txn.commit().await?;

        tracing::info!(
            queue_id = %queue_id,
            issue_id = %issue.id,
            action = action.as_str(),
            sla_missed,
            time_to_resolve_minutes,
            "Queue item resolved"
        );

        self.event_bus.emit_lossy(DqaEvent::QueueItemResolved {
            queue_id,
            issue_id: issue.id,
            action: action.as_str().to_string(),
            sla_missed,
            timestamp: resolved_at,
        });

        // Last step of a successful resolve; annotation failure must not
        // undo the committed resolution.
        if let Err(e) = self
            .feedback
            .record_feedback(issue.id, action, notes.as_deref())
            .await
        {
            tracing::warn!(issue_id = %issue.id, error = %e, "Feedback annotation failed");
        }

        Ok(ResolutionResult {
            queue_id,
            issue_id: issue.id,
            sla_missed,
            time_to_resolve_minutes,
        })
    }
}
