//! Reasoning collaborator seam
//!
//! **[DQA-REM-070]** The reasoning model is a black box returning
//! `{reasoning, confidenceScore, dataSources, fixesApplied}`. The HTTP
//! client carries a bounded timeout; the engine additionally treats an
//! elapsed call as `outcome = failure`.

use crate::db::records::EntityRecord;
use crate::models::{AuditIssue, DataSource, ProposedFix};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Structured proposal from the reasoning collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningProposal {
    pub reasoning: String,
    /// Certainty in the proposed fix, 0-100
    pub confidence_score: u8,
    pub data_sources: Vec<DataSource>,
    #[serde(rename = "fixesApplied")]
    pub fixes: Vec<ProposedFix>,
}

/// External reasoning collaborator
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Propose a fix for one issue, given the entity context
    async fn propose(
        &self,
        issue: &AuditIssue,
        record: Option<&EntityRecord>,
    ) -> anyhow::Result<ReasoningProposal>;
}

/// Request body posted to the reasoning service
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposeRequest<'a> {
    issue_id: uuid::Uuid,
    description: &'a str,
    severity: &'a str,
    entity_type: &'a str,
    entity_id: &'a str,
    suggested_fix: Option<&'a str>,
    record: Option<&'a serde_json::Value>,
}

/// HTTP client for the reasoning collaborator
pub struct HttpReasoningService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReasoningService {
    /// Build the client with a bounded per-request timeout
    pub fn new(base_url: String, timeout_ms: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningService {
    async fn propose(
        &self,
        issue: &AuditIssue,
        record: Option<&EntityRecord>,
    ) -> anyhow::Result<ReasoningProposal> {
        let request = ProposeRequest {
            issue_id: issue.id,
            description: &issue.description,
            severity: issue.severity.as_str(),
            entity_type: &issue.entity_type,
            entity_id: &issue.entity_id,
            suggested_fix: issue.suggested_fix.as_deref(),
            record: record.map(|r| &r.payload),
        };

        let url = format!("{}/propose", self.base_url.trim_end_matches('/'));
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Reasoning service returned HTTP {}", response.status());
        }

        let proposal: ReasoningProposal = response.json().await?;
        Ok(proposal)
    }
}

/// Stand-in when no reasoning service is configured
///
/// Every call fails, so every issue takes the failure-escalation path into
/// the manual queue instead of being dropped.
pub struct UnavailableReasoningService;

#[async_trait]
impl ReasoningService for UnavailableReasoningService {
    async fn propose(
        &self,
        _issue: &AuditIssue,
        _record: Option<&EntityRecord>,
    ) -> anyhow::Result<ReasoningProposal> {
        anyhow::bail!("reasoning service not configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_deserializes_from_collaborator_wire_shape() {
        let json = serde_json::json!({
            "reasoning": "Email domain matches company website",
            "confidenceScore": 91,
            "dataSources": [{"name": "company_profile", "detail": "acme.example"}],
            "fixesApplied": [
                {"kind": "set_missing", "field": "email", "value": "ada@acme.example"}
            ],
        });

        let proposal: ReasoningProposal = serde_json::from_value(json).unwrap();
        assert_eq!(proposal.confidence_score, 91);
        assert_eq!(proposal.data_sources.len(), 1);
        assert_eq!(
            proposal.fixes[0].target_field(),
            Some("email")
        );
    }
}
