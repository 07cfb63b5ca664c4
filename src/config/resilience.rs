//! Resilience guard tuning.

use serde::Deserialize;

/// Knobs for the circuit breaker and health classification.
#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    /// Rolling window errors are counted over.
    #[serde(default = "default_error_window_secs")]
    pub error_window_secs: u64,
    /// Windowed errors at which the circuit opens.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: usize,
    /// Minimum open duration before a status probe may close the
    /// circuit.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Turn capacity used for overload classification.
    #[serde(default = "default_max_load")]
    pub max_load: u32,
    /// Errors per second above which the system reports degraded.
    #[serde(default = "default_degraded_error_rate")]
    pub degraded_error_rate: f64,
    /// Windowed errors that must have drained before a probe may close
    /// the circuit.
    #[serde(default = "default_close_error_allowance")]
    pub close_error_allowance: usize,
}

fn default_error_window_secs() -> u64 {
    60
}

fn default_error_threshold() -> usize {
    10
}

fn default_probe_timeout_secs() -> u64 {
    300
}

fn default_max_load() -> u32 {
    100
}

fn default_degraded_error_rate() -> f64 {
    0.1
}

fn default_close_error_allowance() -> usize {
    3
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            error_window_secs: default_error_window_secs(),
            error_threshold: default_error_threshold(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_load: default_max_load(),
            degraded_error_rate: default_degraded_error_rate(),
            close_error_allowance: default_close_error_allowance(),
        }
    }
}
