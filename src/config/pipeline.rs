//! Turn pipeline tuning.

use serde::Deserialize;

/// Knobs for the per-turn stage pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Minimum per-stage confidence before the turn takes the recovery
    /// branch.
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,
    /// Messages of history fed to intent detection.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// In-turn error-recovery loops before the failure surfaces.
    #[serde(default = "default_max_recovery_loops")]
    pub max_recovery_loops: u32,
    /// Deadline for one agent backend invocation.
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
}

fn default_confidence_floor() -> f64 {
    0.3
}

fn default_history_window() -> usize {
    6
}

fn default_max_recovery_loops() -> u32 {
    2
}

fn default_processing_timeout_secs() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            history_window: default_history_window(),
            max_recovery_loops: default_max_recovery_loops(),
            processing_timeout_secs: default_processing_timeout_secs(),
        }
    }
}
