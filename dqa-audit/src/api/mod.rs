//! API endpoint handlers

pub mod audit;
pub mod dashboard;
pub mod health;
pub mod queue;
pub mod report;
pub mod sse;

pub use audit::audit_routes;
pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use queue::queue_routes;
pub use report::report_routes;
pub use sse::event_stream;
