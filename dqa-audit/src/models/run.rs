//! Audit run model
//!
//! **[DQA-ORC-010]** One audit execution with aggregate counters.
//! Counters are written once, from the finalized issue set, never
//! incremented during the run.

use chrono::{DateTime, Utc};
use dqa_common::config::Tuning;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One audit execution
///
/// Invariants (enforced at finalization):
/// - `total_issues == errors + warnings + info`
/// - `auto_fixed + flagged_for_review + manual_queue <= total_issues`
///
/// Immutable once `completed_at` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_issues: i64,
    pub errors: i64,
    pub warnings: i64,
    pub info: i64,
    /// Issues corrected automatically above the confidence threshold
    pub auto_fixed: i64,
    /// Issues escalated because the reasoning collaborator errored or timed out
    pub flagged_for_review: i64,
    /// Issues escalated on low confidence, waiting in the manual queue
    pub manual_queue: i64,
    pub data_quality_score: f64,
}

impl AuditRun {
    /// Open a new run with zeroed counters
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            total_issues: 0,
            errors: 0,
            warnings: 0,
            info: 0,
            auto_fixed: 0,
            flagged_for_review: 0,
            manual_queue: 0,
            data_quality_score: 100.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl Default for AuditRun {
    fn default() -> Self {
        Self::new()
    }
}

/// **[DQA-ORC-040]** Data quality score from severity counts
///
/// `clamp(100 - (w_err*errors + w_warn*warnings + w_info*info), 0, 100)`.
/// Deterministic and monotonic: more issues never raise the score, and
/// errors weigh heaviest under the default weights.
pub fn quality_score(tuning: &Tuning, errors: i64, warnings: i64, info: i64) -> f64 {
    let penalty = tuning.score_weight_error * errors as f64
        + tuning.score_weight_warning * warnings as f64
        + tuning.score_weight_info * info as f64;
    (100.0 - penalty).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_dataset_scores_100() {
        let tuning = Tuning::default();
        assert_eq!(quality_score(&tuning, 0, 0, 0), 100.0);
    }

    #[test]
    fn score_clamps_to_zero() {
        let tuning = Tuning::default();
        assert_eq!(quality_score(&tuning, 1000, 0, 0), 0.0);
    }

    #[test]
    fn score_is_monotonic_in_each_severity() {
        let tuning = Tuning::default();
        let base = quality_score(&tuning, 2, 2, 2);
        assert!(quality_score(&tuning, 3, 2, 2) < base);
        assert!(quality_score(&tuning, 2, 3, 2) < base);
        assert!(quality_score(&tuning, 2, 2, 3) <= base);
    }

    #[test]
    fn errors_weigh_heaviest() {
        let tuning = Tuning::default();
        let with_error = quality_score(&tuning, 1, 0, 0);
        let with_warning = quality_score(&tuning, 0, 1, 0);
        let with_info = quality_score(&tuning, 0, 0, 1);
        assert!(with_error < with_warning);
        assert!(with_warning < with_info);
    }

    #[test]
    fn new_run_is_open() {
        let run = AuditRun::new();
        assert!(!run.is_completed());
        assert_eq!(run.total_issues, 0);
    }
}
