//! dqa-audit library interface for testing
//!
//! Exposes the application state, router, and pipeline services for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use dqa_common::config::DqaConfig;
use dqa_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::records::SchemaRegistry;
use crate::report::{PlainReportRenderer, ReportRenderer};
use crate::services::classifier::IssueClassifier;
use crate::services::detector::AnomalyDetector;
use crate::services::feedback::FeedbackRecorder;
use crate::services::orchestrator::AuditOrchestrator;
use crate::services::queue_manager::QueueManager;
use crate::services::reasoning::ReasoningService;
use crate::services::remediation::RemediationEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Resolved service configuration
    pub config: Arc<DqaConfig>,
    /// Reasoning collaborator
    pub reasoning: Arc<dyn ReasoningService>,
    /// Pluggable anomaly detectors, run in registration order
    pub detectors: Arc<Vec<Box<dyn AnomalyDetector>>>,
    /// Report renderer seam
    pub renderer: Arc<dyn ReportRenderer>,
    /// Per-entity-type schema constraints
    pub registry: SchemaRegistry,
    /// **[DQA-ORC-020]** Single-flight guard: the run currently in flight
    pub active_run: Arc<Mutex<Option<Uuid>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        config: Arc<DqaConfig>,
        reasoning: Arc<dyn ReasoningService>,
        detectors: Arc<Vec<Box<dyn AnomalyDetector>>>,
    ) -> Self {
        Self {
            db,
            event_bus,
            config,
            reasoning,
            detectors,
            renderer: Arc::new(PlainReportRenderer),
            registry: SchemaRegistry::default_registry(),
            active_run: Arc::new(Mutex::new(None)),
            startup_time: Utc::now(),
        }
    }

    /// Remediation engine wired from this state
    pub fn engine(&self) -> Arc<RemediationEngine> {
        Arc::new(RemediationEngine::new(
            self.db.clone(),
            self.event_bus.clone(),
            Arc::clone(&self.reasoning),
            self.registry.clone(),
            self.config.tuning.clone(),
            self.config.reasoning.timeout_ms,
        ))
    }

    /// Audit orchestrator wired from this state
    pub fn orchestrator(&self) -> AuditOrchestrator {
        AuditOrchestrator::new(
            self.db.clone(),
            self.event_bus.clone(),
            Arc::clone(&self.detectors),
            IssueClassifier::new(self.config.tuning.severity_mapping),
            self.engine(),
            self.config.tuning.clone(),
        )
    }

    /// Feedback recorder wired from this state
    pub fn feedback_recorder(&self) -> FeedbackRecorder {
        FeedbackRecorder::new(self.db.clone(), self.event_bus.clone())
    }

    /// Queue manager wired from this state
    pub fn queue_manager(&self) -> QueueManager {
        QueueManager::new(
            self.db.clone(),
            self.event_bus.clone(),
            self.registry.clone(),
            self.feedback_recorder(),
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::dashboard_routes())
        .merge(api::audit_routes())
        .merge(api::queue_routes())
        .merge(api::report_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
