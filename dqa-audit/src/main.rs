//! dqa-audit - Data Quality Audit & Remediation service
//!
//! Scans persisted business records for integrity problems, attempts
//! automated correction through a confidence-gated reasoning step, and
//! routes unresolved problems into a human-reviewed queue with SLA
//! deadlines.

use anyhow::Result;
use dqa_common::config::DqaConfig;
use dqa_common::events::EventBus;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dqa_audit::services::detector::{AnomalyDetector, MissingFieldDetector};
use dqa_audit::services::reasoning::{
    HttpReasoningService, ReasoningService, UnavailableReasoningService,
};
use dqa_audit::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting dqa-audit (Data Quality Audit) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(DqaConfig::resolve()?);
    info!("Database: {}", config.database_path.display());

    let db_pool = dqa_common::db::init_pool(&config.database_path).await?;
    dqa_audit::db::init_tables(&db_pool).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(100);

    let reasoning: Arc<dyn ReasoningService> = match &config.reasoning.base_url {
        Some(base_url) => {
            info!("Reasoning service: {}", base_url);
            Arc::new(HttpReasoningService::new(
                base_url.clone(),
                config.reasoning.timeout_ms,
            )?)
        }
        None => {
            warn!("Reasoning service not configured - all issues will escalate to the manual queue");
            Arc::new(UnavailableReasoningService)
        }
    };

    let registry = dqa_audit::db::records::SchemaRegistry::default_registry();
    let detectors: Arc<Vec<Box<dyn AnomalyDetector>>> =
        Arc::new(vec![Box::new(MissingFieldDetector::new(registry))]);

    let state = AppState::new(db_pool, event_bus, config.clone(), reasoning, detectors);

    // Runs left open by a previous process are finalized from their issues'
    // last-recorded states before accepting new triggers.
    let swept = state.orchestrator().sweep_abandoned_runs().await?;
    if swept > 0 {
        info!(swept, "Finalized abandoned audit runs from previous process");
    }

    let app = dqa_audit::build_router(state);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
