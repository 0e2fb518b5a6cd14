//! Manual intervention queue item model
//!
//! **[DQA-QUE-010]** Per-item state machine:
//! pending → in_progress → resolved (terminal)
//!
//! `in_progress` is optional; a reviewer may resolve a pending item
//! directly. `resolved` is irreversible.

use crate::models::attempt::ProposedFix;
use chrono::{DateTime, Utc};
use dqa_common::Priority;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InProgress,
    Resolved,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::InProgress => "in_progress",
            QueueStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "in_progress" => Some(QueueStatus::InProgress),
            "resolved" => Some(QueueStatus::Resolved),
            _ => None,
        }
    }

    /// Pending and in-progress items are "active"; one active item per issue
    pub fn is_active(&self) -> bool {
        matches!(self, QueueStatus::Pending | QueueStatus::InProgress)
    }
}

/// Reviewer action on resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionAction {
    Approve,
    Reject,
    Custom,
}

impl ResolutionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionAction::Approve => "approve",
            ResolutionAction::Reject => "reject",
            ResolutionAction::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(ResolutionAction::Approve),
            "reject" => Some(ResolutionAction::Reject),
            "custom" => Some(ResolutionAction::Custom),
            _ => None,
        }
    }
}

/// A pending human task with an SLA deadline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualQueueItem {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub priority: Priority,
    pub status: QueueStatus,
    pub queued_at: DateTime<Utc>,
    /// `queued_at + window(priority)`; breach is recorded, not enforced
    pub sla_deadline: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub time_to_resolve_minutes: Option<i64>,
    pub sla_missed: Option<bool>,
    pub notes: Option<String>,
    pub resolution_action: Option<String>,
    /// The AI's proposed fixes, shown to the reviewer even when not applied
    pub ai_suggestions: Vec<ProposedFix>,
    pub ai_reasoning: Option<String>,
}

impl ManualQueueItem {
    /// Queue a new pending item for an escalated issue
    pub fn new(
        issue_id: Uuid,
        priority: Priority,
        sla_window: chrono::Duration,
        ai_suggestions: Vec<ProposedFix>,
        ai_reasoning: Option<String>,
    ) -> Self {
        let queued_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            issue_id,
            priority,
            status: QueueStatus::Pending,
            queued_at,
            sla_deadline: queued_at + sla_window,
            resolved_at: None,
            time_to_resolve_minutes: None,
            sla_missed: None,
            notes: None,
            resolution_action: None,
            ai_suggestions,
            ai_reasoning,
        }
    }

    /// **[DQA-QUE-030]** Minutes from queue to resolution, rounded
    pub fn time_to_resolve(queued_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> i64 {
        let millis = (resolved_at - queued_at).num_milliseconds();
        (millis as f64 / 60_000.0).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ManualQueueItem {
        ManualQueueItem::new(
            Uuid::new_v4(),
            Priority::P0,
            chrono::Duration::minutes(240),
            vec![],
            None,
        )
    }

    #[test]
    fn new_item_is_pending_with_deadline() {
        let item = item();
        assert_eq!(item.status, QueueStatus::Pending);
        assert!(item.status.is_active());
        assert_eq!(item.sla_deadline - item.queued_at, chrono::Duration::minutes(240));
        assert!(item.resolved_at.is_none());
        assert!(item.sla_missed.is_none());
    }

    #[test]
    fn resolved_is_not_active() {
        assert!(!QueueStatus::Resolved.is_active());
        assert!(QueueStatus::InProgress.is_active());
    }

    #[test]
    fn time_to_resolve_rounds_to_minutes() {
        let queued = Utc::now();
        assert_eq!(
            ManualQueueItem::time_to_resolve(queued, queued + chrono::Duration::seconds(90)),
            2
        );
        assert_eq!(
            ManualQueueItem::time_to_resolve(queued, queued + chrono::Duration::seconds(29)),
            0
        );
        assert_eq!(
            ManualQueueItem::time_to_resolve(queued, queued + chrono::Duration::minutes(61)),
            61
        );
    }
}
