//! Recovery selector tuning.

use serde::Deserialize;

/// Knobs for recovery classification and execution.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryConfig {
    /// Trailing window the attempt cap is counted over.
    #[serde(default = "default_attempt_window_secs")]
    pub attempt_window_secs: u64,
    /// Windowed attempts at which recovery stops retrying and replaces
    /// the conversation.
    #[serde(default = "default_attempt_cap")]
    pub attempt_cap: usize,
    /// Backoff before a same-handler retry.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    /// How long attempt records are kept before pruning.
    #[serde(default = "default_history_ttl_secs")]
    pub history_ttl_secs: u64,
}

fn default_attempt_window_secs() -> u64 {
    300
}

fn default_attempt_cap() -> usize {
    3
}

fn default_retry_backoff_secs() -> u64 {
    2
}

fn default_history_ttl_secs() -> u64 {
    3600
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            attempt_window_secs: default_attempt_window_secs(),
            attempt_cap: default_attempt_cap(),
            retry_backoff_secs: default_retry_backoff_secs(),
            history_ttl_secs: default_history_ttl_secs(),
        }
    }
}
