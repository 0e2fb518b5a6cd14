//! HTTP API Tests
//! Test File: api_tests.rs
//! Requirements: DQA-ORC-020 (Async Trigger + Single Flight),
//! DQA-ERR-010 (Status Mapping)

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use dqa_audit::db::records::EntityRecord;
use dqa_audit::models::AuditIssue;
use dqa_audit::services::detector::{AnomalyDetector, RawAnomaly};
use dqa_audit::services::reasoning::{ReasoningProposal, ReasoningService};
use dqa_audit::{build_router, AppState};
use dqa_common::config::DqaConfig;
use dqa_common::events::EventBus;
use dqa_common::Severity;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Detector that takes long enough to observe the in-flight run
struct SlowDetector;

#[async_trait]
impl AnomalyDetector for SlowDetector {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn detect(&self, _pool: &SqlitePool) -> anyhow::Result<Vec<RawAnomaly>> {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        Ok(vec![RawAnomaly {
            entity_type: "candidate".to_string(),
            entity_id: "c-slow".to_string(),
            description: "candidate c-slow is missing required field 'email'".to_string(),
            severity: Severity::Warning,
            suggested_fix: None,
        }])
    }
}

struct ConfidentReasoning;

#[async_trait]
impl ReasoningService for ConfidentReasoning {
    async fn propose(
        &self,
        issue: &AuditIssue,
        _record: Option<&EntityRecord>,
    ) -> anyhow::Result<ReasoningProposal> {
        Ok(ReasoningProposal {
            reasoning: "filled from profile".to_string(),
            confidence_score: 95,
            data_sources: vec![],
            fixes: vec![dqa_audit::models::ProposedFix::SetMissing {
                field: "email".to_string(),
                value: format!("{}@acme.example", issue.entity_id),
            }],
        })
    }
}

async fn build_state() -> AppState {
    let pool = dqa_common::db::init_memory_pool().await.unwrap();
    dqa_audit::db::init_tables(&pool).await.unwrap();

    dqa_audit::db::records::upsert_record(
        &pool,
        &EntityRecord {
            entity_type: "candidate".to_string(),
            entity_id: "c-slow".to_string(),
            payload: json!({"full_name": "Slow Joe"}),
            updated_at: chrono::Utc::now(),
        },
    )
    .await
    .unwrap();

    let detectors: Arc<Vec<Box<dyn AnomalyDetector>>> = Arc::new(vec![Box::new(SlowDetector)]);

    AppState::new(
        pool,
        EventBus::new(64),
        Arc::new(DqaConfig::default()),
        Arc::new(ConfidentReasoning),
        detectors,
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// TC-API-001: Health endpoint
#[tokio::test]
async fn tc_api_001_health() {
    let app = build_router(build_state().await);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "dqa-audit");
}

/// TC-API-002: Dashboard before any run
#[tokio::test]
async fn tc_api_002_dashboard_empty() {
    let app = build_router(build_state().await);

    let response = app
        .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["hasData"], false);
    assert_eq!(json["trend"], "stable");
    assert_eq!(json["improvement"], 0.0);
    assert!(json["latestAudit"].is_null());
    assert_eq!(json["manualQueue"]["pending"], 0);
}

/// TC-API-003: Trigger returns immediately; concurrent trigger is rejected
/// **Requirement:** DQA-ORC-020 | **Type:** Integration | **Priority:** P0
#[tokio::test]
#[serial_test::serial]
async fn tc_api_003_run_audit_single_flight() {
    let app = build_router(build_state().await);

    // When: the audit is triggered
    let response = app
        .clone()
        .oneshot(Request::post("/run-audit").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "running");
    let run_id = json["runId"].as_str().unwrap().to_string();
    assert!(Uuid::parse_str(&run_id).is_ok());

    // Then: a second trigger while the run is in flight gets 409
    let response = app
        .clone()
        .oneshot(Request::post("/run-audit").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // And: once the background task completes, history shows the finished run
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/audit-history?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let runs = json["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["id"], run_id.as_str());
    assert!(!runs[0]["completedAt"].is_null());
    assert_eq!(runs[0]["totalIssues"], 1);
    assert_eq!(runs[0]["autoFixed"], 1);

    // A new trigger is accepted again
    let response = app
        .oneshot(Request::post("/run-audit").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// TC-API-004: Resolving an unknown queue id returns 404
/// **Requirement:** DQA-ERR-010 | **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_api_004_resolve_unknown_returns_404() {
    let app = build_router(build_state().await);

    let body = json!({
        "queueId": Uuid::new_v4(),
        "action": "approve",
        "notes": "n/a",
        "applyAiSuggestion": false,
    });
    let response = app
        .oneshot(
            Request::post("/resolve-issue")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

/// TC-API-005: Invalid enum inputs are 400, not 500
#[tokio::test]
async fn tc_api_005_invalid_inputs_rejected() {
    let app = build_router(build_state().await);

    let body = json!({
        "queueId": Uuid::new_v4(),
        "action": "escalate",
    });
    let response = app
        .clone()
        .oneshot(
            Request::post("/resolve-issue")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::get("/manual-queue?priority=P9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// TC-API-006: Report endpoints 404 on unknown run, render on a known one
#[tokio::test]
async fn tc_api_006_report_endpoints() {
    let state = build_state().await;
    let app = build_router(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/report/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Seed a completed run directly
    let mut run = dqa_audit::models::AuditRun::new();
    run.completed_at = Some(chrono::Utc::now());
    run.data_quality_score = 98.0;
    dqa_audit::db::runs::save_run(&state.db, &run).await.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/report/{}", run.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));

    let response = app
        .oneshot(
            Request::get(format!("/email-preview/{}", run.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"));
}
