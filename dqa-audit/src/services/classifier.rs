//! Issue classifier
//!
//! **[DQA-CLS-010]** Pure mapping from a raw anomaly to severity, priority
//! tier, and suggested fix. No side effects, no persistence; called once per
//! anomaly.

use crate::services::detector::RawAnomaly;
use dqa_common::{Priority, Severity, SeverityMapping};

/// Classification result for one anomaly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub severity: Severity,
    pub priority: Priority,
    pub suggested_fix: Option<String>,
}

/// Severity → priority classifier
#[derive(Debug, Clone)]
pub struct IssueClassifier {
    mapping: SeverityMapping,
}

impl IssueClassifier {
    pub fn new(mapping: SeverityMapping) -> Self {
        Self { mapping }
    }

    /// Classify one anomaly
    pub fn classify(&self, anomaly: &RawAnomaly) -> Classification {
        Classification {
            severity: anomaly.severity,
            priority: self.mapping.priority_for(anomaly.severity),
            suggested_fix: anomaly.suggested_fix.clone(),
        }
    }
}

impl Default for IssueClassifier {
    fn default() -> Self {
        Self::new(SeverityMapping::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anomaly(severity: Severity) -> RawAnomaly {
        RawAnomaly {
            entity_type: "candidate".to_string(),
            entity_id: "c-1".to_string(),
            description: "test anomaly".to_string(),
            severity,
            suggested_fix: Some("fill it in".to_string()),
        }
    }

    #[test]
    fn default_mapping_is_one_to_one() {
        let classifier = IssueClassifier::default();
        assert_eq!(classifier.classify(&anomaly(Severity::Error)).priority, Priority::P0);
        assert_eq!(classifier.classify(&anomaly(Severity::Warning)).priority, Priority::P1);
        assert_eq!(classifier.classify(&anomaly(Severity::Info)).priority, Priority::P2);
    }

    #[test]
    fn custom_mapping_is_honored() {
        let classifier = IssueClassifier::new(SeverityMapping {
            error: Priority::P0,
            warning: Priority::P0,
            info: Priority::P1,
        });
        assert_eq!(classifier.classify(&anomaly(Severity::Warning)).priority, Priority::P0);
        assert_eq!(classifier.classify(&anomaly(Severity::Info)).priority, Priority::P1);
    }

    #[test]
    fn suggested_fix_passes_through() {
        let classifier = IssueClassifier::default();
        let classification = classifier.classify(&anomaly(Severity::Info));
        assert_eq!(classification.suggested_fix.as_deref(), Some("fill it in"));
    }
}
