//! Domain models for the audit pipeline

pub mod attempt;
pub mod issue;
pub mod queue;
pub mod run;

pub use attempt::{
    AttemptOutcome, DataSource, HumanFeedback, ProposedFix, RemediationAttempt,
};
pub use issue::{AuditIssue, IssueStatus, ResolvedBy};
pub use queue::{ManualQueueItem, QueueStatus, ResolutionAction};
pub use run::AuditRun;
