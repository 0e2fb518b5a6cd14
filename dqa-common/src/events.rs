//! Event types for the DQA event system
//!
//! Provides shared event definitions and the EventBus used to notify
//! SSE clients and external learning consumers.

use crate::{Priority, Severity};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// DQA pipeline event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DqaEvent {
    /// Audit run opened; detection is starting
    ///
    /// Triggers:
    /// - SSE: dashboard shows a run in flight
    AuditRunStarted {
        run_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One detector finished its sweep
    DetectorCompleted {
        run_id: Uuid,
        detector: String,
        anomalies: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Issue corrected automatically above the confidence threshold
    IssueAutoFixed {
        run_id: Uuid,
        issue_id: Uuid,
        confidence_score: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Issue routed to the manual intervention queue
    ///
    /// Triggers:
    /// - SSE: queue view refresh
    IssueEscalated {
        run_id: Uuid,
        issue_id: Uuid,
        queue_id: Uuid,
        priority: Priority,
        severity: Severity,
        remediation_failed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audit run finalized with aggregate counters
    ///
    /// Triggers:
    /// - SSE: dashboard refresh with new quality score
    AuditRunCompleted {
        run_id: Uuid,
        total_issues: i64,
        auto_fixed: i64,
        manual_queue: i64,
        data_quality_score: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Reviewer claimed a queue item (pending → in_progress)
    QueueItemClaimed {
        queue_id: Uuid,
        issue_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue item resolved by a human reviewer
    QueueItemResolved {
        queue_id: Uuid,
        issue_id: Uuid,
        action: String,
        sla_missed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Human verdict attached to a remediation attempt
    ///
    /// Triggers:
    /// - External learning consumers: recalibrate confidence weights
    FeedbackRecorded {
        issue_id: Uuid,
        attempt_id: Uuid,
        feedback: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DqaEvent {
    /// Event type name for SSE event framing
    pub fn event_type(&self) -> &'static str {
        match self {
            DqaEvent::AuditRunStarted { .. } => "AuditRunStarted",
            DqaEvent::DetectorCompleted { .. } => "DetectorCompleted",
            DqaEvent::IssueAutoFixed { .. } => "IssueAutoFixed",
            DqaEvent::IssueEscalated { .. } => "IssueEscalated",
            DqaEvent::AuditRunCompleted { .. } => "AuditRunCompleted",
            DqaEvent::QueueItemClaimed { .. } => "QueueItemClaimed",
            DqaEvent::QueueItemResolved { .. } => "QueueItemResolved",
            DqaEvent::FeedbackRecorded { .. } => "FeedbackRecorded",
        }
    }
}

/// Event bus for broadcasting DQA events to all subscribers
///
/// Wraps tokio broadcast channel. Late subscribers miss earlier events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DqaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DqaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DqaEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_lossy(DqaEvent::AuditRunStarted {
            run_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "AuditRunStarted");
    }

    #[test]
    fn emit_without_subscribers_is_lossy() {
        let bus = EventBus::new(4);
        // No panic, no error surfaced
        bus.emit_lossy(DqaEvent::QueueItemClaimed {
            queue_id: Uuid::new_v4(),
            issue_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DqaEvent::FeedbackRecorded {
            issue_id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            feedback: "approved".to_string(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FeedbackRecorded");
        assert_eq!(json["feedback"], "approved");
    }
}
