//! Coarse system health classification.

use serde::{Deserialize, Serialize};

use super::CircuitState;

/// One-word health classification for callers deciding whether to even
/// offer a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Normal operation.
    Healthy,
    /// Error density above the configured rate; turns still admitted.
    Degraded,
    /// Load above 90% of capacity; turns still admitted.
    Overloaded,
    /// Circuit open; new turns are denied.
    CircuitBreaker,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Overloaded => "overloaded",
            Self::CircuitBreaker => "circuit_breaker",
        }
    }
}

/// Snapshot returned by the health query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    /// Coarse classification.
    pub status: HealthStatus,
    /// Circuit state at snapshot time (taken after any probe).
    pub circuit: CircuitState,
    /// Errors currently in the rolling window.
    pub windowed_errors: usize,
    /// Windowed errors per second of window span.
    pub error_rate: f64,
    /// Turns currently in flight.
    pub active_turns: u32,
    /// Configured turn capacity.
    pub max_load: u32,
    /// Whether the external store answered its health check, when one
    /// was performed this snapshot.
    pub store_healthy: Option<bool>,
    /// Conditions contributing to a non-healthy status, human-readable.
    /// Empty when healthy.
    pub issues: Vec<String>,
}
