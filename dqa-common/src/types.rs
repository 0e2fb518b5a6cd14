//! Core severity and priority types
//!
//! **[DQA-CLS-010]** Severity classes and the severity → priority mapping
//! shared by the classifier, queue manager, and tuning configuration.

use serde::{Deserialize, Serialize};

/// Issue severity assigned at detection time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tier driving SLA window and queue ordering
///
/// Ordering: P0 sorts before P1 sorts before P2, both in Rust (`Ord`) and
/// in SQL (`'P0' < 'P1' < 'P2'` as TEXT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "P0" => Some(Priority::P0),
            "P1" => Some(Priority::P1),
            "P2" => Some(Priority::P2),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// **[DQA-CLS-020]** Configurable severity → priority mapping
///
/// Default is the 1:1 correspondence error→P0, warning→P1, info→P2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityMapping {
    pub error: Priority,
    pub warning: Priority,
    pub info: Priority,
}

impl SeverityMapping {
    pub fn priority_for(&self, severity: Severity) -> Priority {
        match severity {
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}

impl Default for SeverityMapping {
    fn default() -> Self {
        Self {
            error: Priority::P0,
            warning: Priority::P1,
            info: Priority::P2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_text_ordering_matches_tier_ordering() {
        assert!(Priority::P0 < Priority::P1);
        assert!(Priority::P1 < Priority::P2);
        assert!(Priority::P0.as_str() < Priority::P1.as_str());
        assert!(Priority::P1.as_str() < Priority::P2.as_str());
    }

    #[test]
    fn default_mapping_is_one_to_one() {
        let mapping = SeverityMapping::default();
        assert_eq!(mapping.priority_for(Severity::Error), Priority::P0);
        assert_eq!(mapping.priority_for(Severity::Warning), Priority::P1);
        assert_eq!(mapping.priority_for(Severity::Info), Priority::P2);
    }

    #[test]
    fn severity_round_trips_through_text() {
        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            assert_eq!(Severity::parse(severity.as_str()), Some(severity));
        }
        assert_eq!(Severity::parse("fatal"), None);
    }
}
