//! Pipeline services

pub mod classifier;
pub mod detector;
pub mod feedback;
pub mod orchestrator;
pub mod queue_manager;
pub mod reasoning;
pub mod remediation;

pub use classifier::{Classification, IssueClassifier};
pub use detector::{AnomalyDetector, MissingFieldDetector, RawAnomaly};
pub use feedback::FeedbackRecorder;
pub use orchestrator::AuditOrchestrator;
pub use queue_manager::{QueueEntry, QueueManager, ResolutionResult};
pub use reasoning::{HttpReasoningService, ReasoningProposal, ReasoningService};
pub use remediation::{RemediationEngine, RemediationOutcome};
