//! Remediation attempt model and typed fix payloads
//!
//! **[DQA-REM-010]** Every reasoning-collaborator invocation produces exactly
//! one attempt row; this is the audit trail and the training signal consumed
//! through the Feedback Recorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a collaborator invocation
///
/// `failure` is reserved for an erroring or timed-out call; a completed
/// low-confidence proposal is still a `success` invocation even though the
/// issue escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(AttemptOutcome::Success),
            "failure" => Some(AttemptOutcome::Failure),
            _ => None,
        }
    }
}

/// Human verdict attached after queue resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanFeedback {
    Approved,
    Rejected,
    Modified,
}

impl HumanFeedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            HumanFeedback::Approved => "approved",
            HumanFeedback::Rejected => "rejected",
            HumanFeedback::Modified => "modified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(HumanFeedback::Approved),
            "rejected" => Some(HumanFeedback::Rejected),
            "modified" => Some(HumanFeedback::Modified),
            _ => None,
        }
    }
}

/// A source consulted by the reasoning collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub name: String,
    pub detail: String,
}

/// **[DQA-REM-030]** Tagged fix payload
///
/// Typed variants instead of opaque JSON, so the engine and report renderer
/// pattern-match on known shapes. Field names are validated against the
/// per-entity-type schema registry before any fix is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposedFix {
    /// Replace an existing field value
    FieldUpdate {
        field: String,
        old_value: String,
        new_value: String,
    },
    /// Populate a missing field
    SetMissing { field: String, value: String },
    /// Canonicalize a field in place (casing, whitespace, formats)
    Normalize { field: String, normalized: String },
    /// Collaborator found nothing actionable
    NoOp,
}

impl ProposedFix {
    /// Field this fix writes to, if any
    pub fn target_field(&self) -> Option<&str> {
        match self {
            ProposedFix::FieldUpdate { field, .. }
            | ProposedFix::SetMissing { field, .. }
            | ProposedFix::Normalize { field, .. } => Some(field),
            ProposedFix::NoOp => None,
        }
    }

    /// Value this fix writes, if any
    pub fn target_value(&self) -> Option<&str> {
        match self {
            ProposedFix::FieldUpdate { new_value, .. } => Some(new_value),
            ProposedFix::SetMissing { value, .. } => Some(value),
            ProposedFix::Normalize { normalized, .. } => Some(normalized),
            ProposedFix::NoOp => None,
        }
    }
}

/// One invocation of the reasoning collaborator for an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationAttempt {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub reasoning: String,
    /// Collaborator certainty, 0-100
    pub confidence_score: u8,
    pub data_sources: Vec<DataSource>,
    pub fixes_applied: Vec<ProposedFix>,
    pub completed_at: DateTime<Utc>,
    pub execution_time_ms: i64,
    pub outcome: AttemptOutcome,
    pub human_feedback: Option<HumanFeedback>,
    pub feedback_notes: Option<String>,
    pub learned: bool,
}

impl RemediationAttempt {
    /// Record a completed invocation
    pub fn new(
        issue_id: Uuid,
        reasoning: String,
        confidence_score: u8,
        data_sources: Vec<DataSource>,
        fixes_applied: Vec<ProposedFix>,
        execution_time_ms: i64,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            issue_id,
            reasoning,
            confidence_score,
            data_sources,
            fixes_applied,
            completed_at: Utc::now(),
            execution_time_ms,
            outcome,
            human_feedback: None,
            feedback_notes: None,
            learned: false,
        }
    }

    /// Record an erroring or timed-out invocation
    ///
    /// **[DQA-REM-040]** `outcome = failure`, `confidence_score = 0`.
    pub fn failed(issue_id: Uuid, error: String, execution_time_ms: i64) -> Self {
        Self::new(
            issue_id,
            error,
            0,
            Vec::new(),
            Vec::new(),
            execution_time_ms,
            AttemptOutcome::Failure,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_payload_serializes_with_kind_tag() {
        let fix = ProposedFix::SetMissing {
            field: "email".to_string(),
            value: "jo@example.com".to_string(),
        };
        let json = serde_json::to_value(&fix).unwrap();
        assert_eq!(json["kind"], "set_missing");
        assert_eq!(json["field"], "email");

        let back: ProposedFix = serde_json::from_value(json).unwrap();
        assert_eq!(back, fix);
    }

    #[test]
    fn noop_has_no_target() {
        assert_eq!(ProposedFix::NoOp.target_field(), None);
        assert_eq!(ProposedFix::NoOp.target_value(), None);
    }

    #[test]
    fn failed_attempt_zeroes_confidence() {
        let attempt = RemediationAttempt::failed(Uuid::new_v4(), "timeout".to_string(), 5000);
        assert_eq!(attempt.outcome, AttemptOutcome::Failure);
        assert_eq!(attempt.confidence_score, 0);
        assert!(attempt.fixes_applied.is_empty());
        assert!(!attempt.learned);
    }
}
