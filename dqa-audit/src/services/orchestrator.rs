//! Audit orchestrator
//!
//! **[DQA-ORC-010]** Top-level coordinator: opens an audit run, drives the
//! pluggable detectors, classifies every anomaly, fans remediation out over
//! a bounded worker pool, and finalizes the run in one aggregation pass.
//!
//! Failure semantics: a detector failure or a single remediation failure is
//! logged against the specific detector/issue and never aborts the run.

use crate::db::{issues, runs};
use crate::models::run::quality_score;
use crate::models::{AuditIssue, AuditRun};
use crate::services::classifier::IssueClassifier;
use crate::services::detector::AnomalyDetector;
use crate::services::remediation::RemediationEngine;
use chrono::Utc;
use dqa_common::config::Tuning;
use dqa_common::events::{DqaEvent, EventBus};
use dqa_common::{Priority, Result};
use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Audit run coordinator
pub struct AuditOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    detectors: Arc<Vec<Box<dyn AnomalyDetector>>>,
    classifier: IssueClassifier,
    engine: Arc<RemediationEngine>,
    tuning: Tuning,
}

impl AuditOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        detectors: Arc<Vec<Box<dyn AnomalyDetector>>>,
        classifier: IssueClassifier,
        engine: Arc<RemediationEngine>,
        tuning: Tuning,
    ) -> Self {
        Self {
            db,
            event_bus,
            detectors,
            classifier,
            engine,
            tuning,
        }
    }

    /// Execute a full audit for an already-opened run row
    ///
    /// **[DQA-ORC-030]** Issues are created in detection order; remediation
    /// completion order across the worker pool may differ. Counters finalize
    /// only after every spawned issue reached a terminal outcome.
    pub async fn execute_audit(&self, run: AuditRun) -> Result<AuditRun> {
        let started = std::time::Instant::now();

        tracing::info!(run_id = %run.id, "Starting audit run");
        self.event_bus.emit_lossy(DqaEvent::AuditRunStarted {
            run_id: run.id,
            timestamp: Utc::now(),
        });

        let issues = self.detect_and_classify(run.id).await?;

        tracing::info!(
            run_id = %run.id,
            issue_count = issues.len(),
            workers = self.tuning.remediation_workers,
            "Detection complete, starting remediation fan-out"
        );

        // Each issue is owned by exactly one worker, which serializes the
        // single reasoning invocation per issue.
        let engine = Arc::clone(&self.engine);
        let run_id = run.id;
        stream::iter(issues)
            .map(|(issue, priority)| {
                let engine = Arc::clone(&engine);
                async move {
                    if let Err(e) = engine.attempt_fix(&issue, priority).await {
                        // Issue stays in its last-recorded state; the run
                        // continues and the gap shows in the aggregates.
                        tracing::error!(
                            run_id = %run_id,
                            issue_id = %issue.id,
                            error = %e,
                            "Remediation transition failed"
                        );
                    }
                }
            })
            .buffer_unordered(self.tuning.remediation_workers)
            .collect::<Vec<()>>()
            .await;

        let run = self.finalize_run(run.id).await?;

        tracing::info!(
            run_id = %run.id,
            total_issues = run.total_issues,
            auto_fixed = run.auto_fixed,
            manual_queue = run.manual_queue,
            flagged_for_review = run.flagged_for_review,
            data_quality_score = run.data_quality_score,
            duration_ms = started.elapsed().as_millis() as u64,
            "Audit run completed"
        );

        self.event_bus.emit_lossy(DqaEvent::AuditRunCompleted {
            run_id: run.id,
            total_issues: run.total_issues,
            auto_fixed: run.auto_fixed,
            manual_queue: run.manual_queue,
            data_quality_score: run.data_quality_score,
            timestamp: Utc::now(),
        });

        Ok(run)
    }

    /// Detection phase: run every detector, classify, persist issues
    ///
    /// **[DQA-DET-020]** A failing detector is logged and skipped.
    async fn detect_and_classify(&self, run_id: Uuid) -> Result<Vec<(AuditIssue, Priority)>> {
        let mut classified = Vec::new();

        for detector in self.detectors.iter() {
            let anomalies = match detector.detect(&self.db).await {
                Ok(anomalies) => anomalies,
                Err(e) => {
                    tracing::error!(
                        run_id = %run_id,
                        detector = detector.name(),
                        error = %e,
                        "Detector failed, skipping"
                    );
                    continue;
                }
            };

            self.event_bus.emit_lossy(DqaEvent::DetectorCompleted {
                run_id,
                detector: detector.name().to_string(),
                anomalies: anomalies.len(),
                timestamp: Utc::now(),
            });

            let mut conn = self.db.acquire().await?;
            for anomaly in anomalies {
                let classification = self.classifier.classify(&anomaly);
                let issue = AuditIssue::new(
                    run_id,
                    anomaly.description,
                    classification.severity,
                    anomaly.entity_type,
                    anomaly.entity_id,
                    classification.suggested_fix,
                );
                issues::save_issue(&mut *conn, &issue).await?;
                classified.push((issue, classification.priority));
            }
        }

        Ok(classified)
    }

    /// **[DQA-ORC-050]** Finalize a run from its issue set in one pass
    ///
    /// No incremental counter mutation happens during the run; this is the
    /// only writer of the aggregate columns.
    pub async fn finalize_run(&self, run_id: Uuid) -> Result<AuditRun> {
        let counts = issues::aggregate_run_counts(&self.db, run_id).await?;

        let mut run = runs::load_run(&self.db, run_id)
            .await?
            .ok_or_else(|| dqa_common::Error::NotFound(format!("Audit run not found: {}", run_id)))?;

        run.total_issues = counts.total_issues;
        run.errors = counts.errors;
        run.warnings = counts.warnings;
        run.info = counts.info;
        run.auto_fixed = counts.auto_fixed;
        run.flagged_for_review = counts.flagged_for_review;
        run.manual_queue = counts.manual_queue;
        run.data_quality_score =
            quality_score(&self.tuning, counts.errors, counts.warnings, counts.info);
        run.completed_at = Some(Utc::now());

        runs::save_run(&self.db, &run).await?;

        Ok(run)
    }

    /// **[DQA-ORC-060]** Startup sweep for runs a previous process left open
    ///
    /// Issues keep their last-recorded state; the run is finalized from
    /// whatever terminal outcomes were reached before the interruption.
    pub async fn sweep_abandoned_runs(&self) -> Result<usize> {
        let abandoned = runs::unfinished_run_ids(&self.db).await?;
        let count = abandoned.len();

        for run_id in abandoned {
            tracing::warn!(run_id = %run_id, "Finalizing audit run abandoned by a previous process");
            self.finalize_run(run_id).await?;
        }

        Ok(count)
    }
}
