//! Feedback recorder
//!
//! **[DQA-FBK-010]** Annotates the most recent remediation attempt with the
//! human verdict so external learning consumers can recalibrate confidence.
//! Pure annotation: no new remediation, no effect on the resolved issue or
//! queue item.

use crate::db::attempts;
use crate::models::{HumanFeedback, ResolutionAction};
use chrono::Utc;
use dqa_common::events::{DqaEvent, EventBus};
use dqa_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Records human verdicts against remediation attempts
#[derive(Clone)]
pub struct FeedbackRecorder {
    db: SqlitePool,
    event_bus: EventBus,
}

impl FeedbackRecorder {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Attach the verdict derived from a resolution action
    ///
    /// approve → approved, reject → rejected, custom → modified.
    /// Invoked as the last step of a successful queue resolution.
    pub async fn record_feedback(
        &self,
        issue_id: Uuid,
        action: ResolutionAction,
        notes: Option<&str>,
    ) -> Result<()> {
        let feedback = match action {
            ResolutionAction::Approve => HumanFeedback::Approved,
            ResolutionAction::Reject => HumanFeedback::Rejected,
            ResolutionAction::Custom => HumanFeedback::Modified,
        };

        let Some(attempt) = attempts::latest_attempt_for_issue(&self.db, issue_id).await? else {
            // Escalated issues always carry an attempt; tolerate manual
            // resolutions of issues that never reached the engine.
            tracing::debug!(issue_id = %issue_id, "No remediation attempt to annotate");
            return Ok(());
        };

        attempts::set_feedback(&self.db, attempt.id, feedback, notes).await?;

        tracing::info!(
            issue_id = %issue_id,
            attempt_id = %attempt.id,
            feedback = feedback.as_str(),
            "Human feedback recorded"
        );

        self.event_bus.emit_lossy(DqaEvent::FeedbackRecorded {
            issue_id,
            attempt_id: attempt.id,
            feedback: feedback.as_str().to_string(),
            timestamp: Utc::now(),
        });

        Ok(())
    }
}
