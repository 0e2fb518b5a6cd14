//! Configuration loading and tuning parameters
//!
//! **[DQA-CFG-010]** TOML file + environment variable resolution.
//! **[DQA-CFG-020]** Named, overridable tuning constants; no magic numbers
//! in the pipeline code.

use crate::types::SeverityMapping;
use crate::{Error, Priority, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Service configuration
///
/// Resolution priority: environment variables → TOML file → compiled defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DqaConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// SQLite database path
    pub database_path: PathBuf,

    /// Reasoning collaborator settings
    pub reasoning: ReasoningConfig,

    /// Pipeline tuning parameters
    pub tuning: Tuning,
}

impl Default for DqaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5741,
            database_path: PathBuf::from("dqa.db"),
            reasoning: ReasoningConfig::default(),
            tuning: Tuning::default(),
        }
    }
}

/// External reasoning service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Base URL of the reasoning collaborator; None disables the HTTP client
    pub base_url: Option<String>,

    /// Bounded timeout for a single reasoning call
    ///
    /// Valid range: [1000, 300000] ms
    /// Default: 20000 ms
    pub timeout_ms: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 20_000,
        }
    }
}

/// **[DQA-CFG-020]** Pipeline tuning parameters
///
/// All thresholds, weights, and windows the spec leaves open are named here
/// and overridable via the `[tuning]` TOML table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// **[DQA-REM-020]** Confidence cutoff for auto-apply
    ///
    /// Valid range: [0, 100]
    /// Default: 85
    pub auto_fix_threshold: u8,

    /// **[DQA-ORC-040]** Quality score penalty per error issue
    ///
    /// Default: 5.0
    pub score_weight_error: f64,

    /// **[DQA-ORC-040]** Quality score penalty per warning issue
    ///
    /// Default: 2.0
    pub score_weight_warning: f64,

    /// **[DQA-ORC-040]** Quality score penalty per info issue
    ///
    /// Default: 0.5
    pub score_weight_info: f64,

    /// **[DQA-QUE-020]** SLA window for P0 items
    ///
    /// Default: 240 minutes (4 hours)
    pub sla_window_p0_minutes: i64,

    /// **[DQA-QUE-020]** SLA window for P1 items
    ///
    /// Default: 1440 minutes (24 hours)
    pub sla_window_p1_minutes: i64,

    /// **[DQA-QUE-020]** SLA window for P2 items
    ///
    /// Default: 4320 minutes (72 hours)
    pub sla_window_p2_minutes: i64,

    /// **[DQA-ORC-030]** Bounded worker pool size for per-issue remediation
    ///
    /// Valid range: [1, 32]
    /// Default: 4
    pub remediation_workers: usize,

    /// **[DQA-CLS-020]** Severity → priority mapping
    pub severity_mapping: SeverityMapping,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            auto_fix_threshold: 85,
            score_weight_error: 5.0,
            score_weight_warning: 2.0,
            score_weight_info: 0.5,
            sla_window_p0_minutes: 240,
            sla_window_p1_minutes: 1440,
            sla_window_p2_minutes: 4320,
            remediation_workers: 4,
            severity_mapping: SeverityMapping::default(),
        }
    }
}

impl Tuning {
    /// SLA window for a priority tier (shortest for P0)
    pub fn sla_window(&self, priority: Priority) -> chrono::Duration {
        let minutes = match priority {
            Priority::P0 => self.sla_window_p0_minutes,
            Priority::P1 => self.sla_window_p1_minutes,
            Priority::P2 => self.sla_window_p2_minutes,
        };
        chrono::Duration::minutes(minutes)
    }

    /// Validate ranges; rejects configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auto_fix_threshold > 100 {
            return Err(Error::Config(format!(
                "auto_fix_threshold: value {} out of range [0, 100]",
                self.auto_fix_threshold
            )));
        }
        if self.remediation_workers == 0 || self.remediation_workers > 32 {
            return Err(Error::Config(format!(
                "remediation_workers: value {} out of range [1, 32]",
                self.remediation_workers
            )));
        }
        for (name, minutes) in [
            ("sla_window_p0_minutes", self.sla_window_p0_minutes),
            ("sla_window_p1_minutes", self.sla_window_p1_minutes),
            ("sla_window_p2_minutes", self.sla_window_p2_minutes),
        ] {
            if minutes <= 0 {
                return Err(Error::Config(format!("{}: must be positive", name)));
            }
        }
        for (name, weight) in [
            ("score_weight_error", self.score_weight_error),
            ("score_weight_warning", self.score_weight_warning),
            ("score_weight_info", self.score_weight_info),
        ] {
            if weight < 0.0 {
                return Err(Error::Config(format!("{}: must be non-negative", name)));
            }
        }
        Ok(())
    }
}

impl DqaConfig {
    /// Resolve configuration with ENV → TOML → default priority
    ///
    /// **[DQA-CFG-010]** The TOML path itself comes from `DQA_CONFIG`,
    /// falling back to `dqa.toml` in the working directory when present.
    pub fn resolve() -> Result<Self> {
        let mut config = match std::env::var("DQA_CONFIG") {
            Ok(path) => Self::load_file(Path::new(&path))?,
            Err(_) => {
                let default_path = Path::new("dqa.toml");
                if default_path.exists() {
                    Self::load_file(default_path)?
                } else {
                    DqaConfig::default()
                }
            }
        };

        if let Ok(port) = std::env::var("DQA_PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!("DQA_PORT is not a valid port number, ignoring: {}", port),
            }
        }
        if let Ok(path) = std::env::var("DQA_DATABASE") {
            config.database_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("DQA_REASONING_URL") {
            config.reasoning.base_url = Some(url);
        }

        config.tuning.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
        let config: DqaConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }
}
