//! Remediation engine
//!
//! **[DQA-REM-010]** Invokes the reasoning collaborator per issue and decides
//! auto-fix vs. escalation. Every invocation (successful, low-confidence, or
//! erroring) produces exactly one attempt row.
//!
//! Fix application, issue status, and the attempt row share one transaction,
//! so a crash cannot leave an issue marked fixed without the record mutation
//! (or the reverse).

use crate::db::records::{self, SchemaRegistry};
use crate::db::{attempts, issues, queue};
use crate::models::{AuditIssue, ManualQueueItem, ProposedFix, RemediationAttempt};
use crate::services::reasoning::{ReasoningProposal, ReasoningService};
use chrono::Utc;
use dqa_common::config::Tuning;
use dqa_common::events::{DqaEvent, EventBus};
use dqa_common::{Priority, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Terminal classification outcome for one issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// Fix applied, issue auto_fixed
    AutoFixed { attempt_id: Uuid },
    /// Issue escalated to the manual queue
    Escalated {
        queue_id: Uuid,
        /// true when the collaborator errored or timed out
        remediation_failed: bool,
    },
}

/// Confidence-gated remediation engine
pub struct RemediationEngine {
    db: SqlitePool,
    event_bus: EventBus,
    reasoning: Arc<dyn ReasoningService>,
    registry: SchemaRegistry,
    tuning: Tuning,
    reasoning_timeout: Duration,
}

impl RemediationEngine {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        reasoning: Arc<dyn ReasoningService>,
        registry: SchemaRegistry,
        tuning: Tuning,
        reasoning_timeout_ms: u64,
    ) -> Self {
        Self {
            db,
            event_bus,
            reasoning,
            registry,
            tuning,
            reasoning_timeout: Duration::from_millis(reasoning_timeout_ms),
        }
    }

    /// **[DQA-REM-020]** Attempt an automated fix for one issue
    ///
    /// The caller owns per-issue serialization: this is only invoked once at
    /// a time per issue, so at most one open attempt exists per issue.
    pub async fn attempt_fix(
        &self,
        issue: &AuditIssue,
        priority: Priority,
    ) -> Result<RemediationOutcome> {
        let started = std::time::Instant::now();

        let record = records::load_record(&self.db, &issue.entity_type, &issue.entity_id).await?;

        let call = self.reasoning.propose(issue, record.as_ref());
        let proposal = match tokio::time::timeout(self.reasoning_timeout, call).await {
            Ok(Ok(proposal)) => proposal,
            Ok(Err(e)) => {
                tracing::warn!(
                    issue_id = %issue.id,
                    error = %e,
                    "Reasoning collaborator failed"
                );
                return self
                    .escalate_failure(issue, priority, format!("Reasoning call failed: {}", e), started)
                    .await;
            }
            Err(_) => {
                tracing::warn!(
                    issue_id = %issue.id,
                    timeout_ms = self.reasoning_timeout.as_millis() as u64,
                    "Reasoning collaborator timed out"
                );
                return self
                    .escalate_failure(
                        issue,
                        priority,
                        format!(
                            "Reasoning call timed out after {} ms",
                            self.reasoning_timeout.as_millis()
                        ),
                        started,
                    )
                    .await;
            }
        };

        let execution_time_ms = started.elapsed().as_millis() as i64;
        let confidence = proposal.confidence_score.min(100);

        if confidence >= self.tuning.auto_fix_threshold && self.fixes_validate(issue, &proposal) {
            self.apply_auto_fix(issue, &proposal, execution_time_ms).await
        } else {
            tracing::info!(
                issue_id = %issue.id,
                confidence,
                threshold = self.tuning.auto_fix_threshold,
                "Confidence below threshold or fix invalid, escalating"
            );
            self.escalate_with_suggestions(issue, priority, &proposal, execution_time_ms)
                .await
        }
    }

    /// Schema-constraint gate for auto-apply
    ///
    /// Requires at least one actionable fix and every fix naming a writable
    /// field of the issue's entity type.
    fn fixes_validate(&self, issue: &AuditIssue, proposal: &ReasoningProposal) -> bool {
        let actionable = proposal
            .fixes
            .iter()
            .any(|fix| fix.target_field().is_some());
        if !actionable {
            return false;
        }
        proposal
            .fixes
            .iter()
            .all(|fix| self.registry.validate_fix(&issue.entity_type, fix).is_ok())
    }

    /// High-confidence path: mutate the record and close the issue as a unit
    async fn apply_auto_fix(
        &self,
        issue: &AuditIssue,
        proposal: &ReasoningProposal,
        execution_time_ms: i64,
    ) -> Result<RemediationOutcome> {
        let attempt = RemediationAttempt::new(
            issue.id,
            proposal.reasoning.clone(),
            proposal.confidence_score,
            proposal.data_sources.clone(),
            proposal.fixes.clone(),
            execution_time_ms,
            crate::models::AttemptOutcome::Success,
        );

        let mut txn = self.db.begin().await?;
        for fix in &proposal.fixes {
            records::apply_fix(&mut *txn, &issue.entity_type, &issue.entity_id, fix).await?;
        }
        issues::mark_auto_fixed(&mut *txn, issue.id, Utc::now()).await?;
        attempts::save_attempt(&mut *txn, &attempt).await?;
        txn.commit().await?;

        tracing::info!(
            issue_id = %issue.id,
            attempt_id = %attempt.id,
            confidence = attempt.confidence_score,
            fixes = proposal.fixes.len(),
            "Issue auto-fixed"
        );

        self.event_bus.emit_lossy(DqaEvent::IssueAutoFixed {
            run_id: issue.audit_run_id,
            issue_id: issue.id,
            confidence_score: attempt.confidence_score,
            timestamp: Utc::now(),
        });

        Ok(RemediationOutcome::AutoFixed {
            attempt_id: attempt.id,
        })
    }

    /// Low-confidence path: record the attempt and queue for a human,
    /// carrying the AI's reasoning and proposed fixes for the reviewer
    async fn escalate_with_suggestions(
        &self,
        issue: &AuditIssue,
        priority: Priority,
        proposal: &ReasoningProposal,
        execution_time_ms: i64,
    ) -> Result<RemediationOutcome> {
        let attempt = RemediationAttempt::new(
            issue.id,
            proposal.reasoning.clone(),
            proposal.confidence_score.min(100),
            proposal.data_sources.clone(),
            proposal.fixes.clone(),
            execution_time_ms,
            crate::models::AttemptOutcome::Success,
        );

        self.escalate(
            issue,
            priority,
            attempt,
            proposal.fixes.clone(),
            Some(proposal.reasoning.clone()),
            false,
        )
        .await
    }

    /// **[DQA-REM-040]** Failure path: collaborator error or timeout
    async fn escalate_failure(
        &self,
        issue: &AuditIssue,
        priority: Priority,
        error: String,
        started: std::time::Instant,
    ) -> Result<RemediationOutcome> {
        let execution_time_ms = started.elapsed().as_millis() as i64;
        let attempt = RemediationAttempt::failed(issue.id, error.clone(), execution_time_ms);

        self.escalate(issue, priority, attempt, Vec::new(), Some(error), true)
            .await
    }

    async fn escalate(
        &self,
        issue: &AuditIssue,
        priority: Priority,
        attempt: RemediationAttempt,
        ai_suggestions: Vec<ProposedFix>,
        ai_reasoning: Option<String>,
        remediation_failed: bool,
    ) -> Result<RemediationOutcome> {
        let item = ManualQueueItem::new(
            issue.id,
            priority,
            self.tuning.sla_window(priority),
            ai_suggestions,
            ai_reasoning,
        );

        let mut txn = self.db.begin().await?;
        attempts::save_attempt(&mut *txn, &attempt).await?;
        issues::mark_escalated(&mut *txn, issue.id).await?;
        queue::save_item(&mut *txn, &item).await?;
        txn.commit().await?;

        tracing::info!(
            issue_id = %issue.id,
            queue_id = %item.id,
            priority = %priority,
            remediation_failed,
            "Issue escalated to manual queue"
        );

        self.event_bus.emit_lossy(DqaEvent::IssueEscalated {
            run_id: issue.audit_run_id,
            issue_id: issue.id,
            queue_id: item.id,
            priority,
            severity: issue.severity,
            remediation_failed,
            timestamp: Utc::now(),
        });

        Ok(RemediationOutcome::Escalated {
            queue_id: item.id,
            remediation_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::records::EntityRecord;
    use crate::models::{AttemptOutcome, DataSource, IssueStatus};
    use async_trait::async_trait;
    use dqa_common::Severity;
    use serde_json::json;

    struct FixedReasoning {
        confidence: u8,
    }

    #[async_trait]
    impl ReasoningService for FixedReasoning {
        async fn propose(
            &self,
            _issue: &AuditIssue,
            _record: Option<&EntityRecord>,
        ) -> anyhow::Result<ReasoningProposal> {
            Ok(ReasoningProposal {
                reasoning: "Inferred from company domain".to_string(),
                confidence_score: self.confidence,
                data_sources: vec![DataSource {
                    name: "company_profile".to_string(),
                    detail: "acme.example".to_string(),
                }],
                fixes: vec![ProposedFix::SetMissing {
                    field: "email".to_string(),
                    value: "ada@acme.example".to_string(),
                }],
            })
        }
    }

    struct ErroringReasoning;

    #[async_trait]
    impl ReasoningService for ErroringReasoning {
        async fn propose(
            &self,
            _issue: &AuditIssue,
            _record: Option<&EntityRecord>,
        ) -> anyhow::Result<ReasoningProposal> {
            anyhow::bail!("model backend unavailable")
        }
    }

    async fn setup(confidence: Option<u8>) -> (SqlitePool, RemediationEngine, AuditIssue) {
        let pool = dqa_common::db::init_memory_pool().await.unwrap();
        db::init_tables(&pool).await.unwrap();

        records::upsert_record(
            &pool,
            &EntityRecord {
                entity_type: "candidate".to_string(),
                entity_id: "c-1".to_string(),
                payload: json!({"full_name": "Ada Quinn"}),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        let issue = AuditIssue::new(
            Uuid::new_v4(),
            "candidate c-1 is missing required field 'email'".to_string(),
            Severity::Warning,
            "candidate".to_string(),
            "c-1".to_string(),
            None,
        );
        let mut conn = pool.acquire().await.unwrap();
        issues::save_issue(&mut *conn, &issue).await.unwrap();
        drop(conn);

        let reasoning: Arc<dyn ReasoningService> = match confidence {
            Some(confidence) => Arc::new(FixedReasoning { confidence }),
            None => Arc::new(ErroringReasoning),
        };

        let engine = RemediationEngine::new(
            pool.clone(),
            EventBus::new(16),
            reasoning,
            SchemaRegistry::default_registry(),
            Tuning::default(),
            5_000,
        );

        (pool, engine, issue)
    }

    #[tokio::test]
    async fn high_confidence_auto_fixes_and_mutates_record() {
        let (pool, engine, issue) = setup(Some(90)).await;

        let outcome = engine.attempt_fix(&issue, Priority::P1).await.unwrap();
        assert!(matches!(outcome, RemediationOutcome::AutoFixed { .. }));

        let issue = issues::load_issue(&pool, issue.id).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::AutoFixed);
        assert_eq!(issue.resolved_by, Some(crate::models::ResolvedBy::Ai));

        let record = records::load_record(&pool, "candidate", "c-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.payload["email"], "ada@acme.example");

        // No queue item for an auto-fixed issue
        assert_eq!(
            queue::active_item_count_for_issue(&pool, issue.id).await.unwrap(),
            0
        );

        let attempt = attempts::latest_attempt_for_issue(&pool, issue.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attempt.outcome, AttemptOutcome::Success);
        assert_eq!(attempt.confidence_score, 90);
    }

    #[tokio::test]
    async fn low_confidence_escalates_with_suggestions() {
        let (pool, engine, issue) = setup(Some(50)).await;

        let outcome = engine.attempt_fix(&issue, Priority::P1).await.unwrap();
        let RemediationOutcome::Escalated {
            queue_id,
            remediation_failed,
        } = outcome
        else {
            panic!("expected escalation");
        };
        assert!(!remediation_failed);

        let issue = issues::load_issue(&pool, issue.id).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::Escalated);

        // Record untouched
        let record = records::load_record(&pool, "candidate", "c-1")
            .await
            .unwrap()
            .unwrap();
        assert!(record.payload.get("email").is_none());

        let item = queue::load_item(&pool, queue_id).await.unwrap().unwrap();
        assert_eq!(item.priority, Priority::P1);
        assert_eq!(item.ai_suggestions.len(), 1);
        assert!(item.ai_reasoning.is_some());
    }

    #[tokio::test]
    async fn collaborator_error_records_failure_and_escalates() {
        let (pool, engine, issue) = setup(None).await;

        let outcome = engine.attempt_fix(&issue, Priority::P0).await.unwrap();
        let RemediationOutcome::Escalated {
            remediation_failed, ..
        } = outcome
        else {
            panic!("expected escalation");
        };
        assert!(remediation_failed);

        let attempt = attempts::latest_attempt_for_issue(&pool, issue.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attempt.outcome, AttemptOutcome::Failure);
        assert_eq!(attempt.confidence_score, 0);

        let issue = issues::load_issue(&pool, issue.id).await.unwrap().unwrap();
        assert_eq!(issue.status, IssueStatus::Escalated);
    }
}
