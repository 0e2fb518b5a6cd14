//! Audit issue model
//!
//! **[DQA-ISS-010]** One detected anomaly tied to an entity. Transitions:
//! detected → auto_fixed | escalated (Remediation Engine), escalated →
//! resolved (Queue Manager).

use chrono::{DateTime, Utc};
use dqa_common::Severity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issue lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Detected,
    AutoFixed,
    Escalated,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Detected => "detected",
            IssueStatus::AutoFixed => "auto_fixed",
            IssueStatus::Escalated => "escalated",
            IssueStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "detected" => Some(IssueStatus::Detected),
            "auto_fixed" => Some(IssueStatus::AutoFixed),
            "escalated" => Some(IssueStatus::Escalated),
            "resolved" => Some(IssueStatus::Resolved),
            _ => None,
        }
    }

    /// Terminal classification outcome within a run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IssueStatus::Detected)
    }
}

/// Who resolved the issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedBy {
    Ai,
    Human,
}

impl ResolvedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedBy::Ai => "ai",
            ResolvedBy::Human => "human",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(ResolvedBy::Ai),
            "human" => Some(ResolvedBy::Human),
            _ => None,
        }
    }
}

/// One detected data-integrity anomaly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditIssue {
    pub id: Uuid,
    pub audit_run_id: Uuid,
    pub description: String,
    pub severity: Severity,
    pub status: IssueStatus,
    pub entity_type: String,
    pub entity_id: String,
    pub suggested_fix: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub resolved_by: Option<ResolvedBy>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
}

impl AuditIssue {
    /// Create a freshly detected issue
    pub fn new(
        audit_run_id: Uuid,
        description: String,
        severity: Severity,
        entity_type: String,
        entity_id: String,
        suggested_fix: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            audit_run_id,
            description,
            severity,
            status: IssueStatus::Detected,
            entity_type,
            entity_id,
            suggested_fix,
            detected_at: Utc::now(),
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_issue_starts_detected() {
        let issue = AuditIssue::new(
            Uuid::new_v4(),
            "email missing @".to_string(),
            Severity::Error,
            "candidate".to_string(),
            "c-1".to_string(),
            None,
        );
        assert_eq!(issue.status, IssueStatus::Detected);
        assert!(!issue.status.is_terminal());
        assert!(issue.resolved_by.is_none());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            IssueStatus::Detected,
            IssueStatus::AutoFixed,
            IssueStatus::Escalated,
            IssueStatus::Resolved,
        ] {
            assert_eq!(IssueStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(IssueStatus::parse("fixed"), None);
    }
}
