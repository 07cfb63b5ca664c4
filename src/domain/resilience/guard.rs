//! The resilience guard: a process-wide circuit breaker over turn
//! admission.
//!
//! All mutable state lives behind one mutex so the error window, load
//! counter and circuit state change together at transition points. The
//! circuit has exactly two stored states; the probe that can close an
//! open circuit is transient and runs only inside the health query.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::config::ResilienceConfig;
use crate::domain::foundation::Timestamp;
use crate::ports::ConversationStore;

use super::{HealthStatus, SystemHealth};

/// Stored circuit states. A half-open probe is not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
}

#[derive(Debug)]
struct GuardState {
    circuit: CircuitState,
    /// Timestamps of recorded errors, oldest first.
    errors: VecDeque<Timestamp>,
    /// Turns currently in flight.
    load: u32,
    /// Set while the circuit is open.
    opened_at: Option<Timestamp>,
}

/// Operational counters for logging and the health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardMetrics {
    pub circuit: CircuitState,
    pub windowed_errors: usize,
    pub active_turns: u32,
    pub opened_at: Option<Timestamp>,
}

/// Guards turn admission for the whole process.
pub struct ResilienceGuard {
    config: ResilienceConfig,
    state: Mutex<GuardState>,
}

impl ResilienceGuard {
    pub fn new(config: ResilienceConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(GuardState {
                circuit: CircuitState::Closed,
                errors: VecDeque::new(),
                load: 0,
                opened_at: None,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn prune(state: &mut GuardState, now: &Timestamp, window_secs: u64) {
        while let Some(oldest) = state.errors.front() {
            if oldest.is_within_window(now, window_secs) {
                break;
            }
            state.errors.pop_front();
        }
    }

    /// Records one failure. Opens the circuit when the rolling window
    /// reaches the threshold.
    pub fn record_error(&self) {
        let now = Timestamp::now();
        let mut state = self.lock();
        Self::prune(&mut state, &now, self.config.error_window_secs);
        state.errors.push_back(now);

        if state.circuit == CircuitState::Closed
            && state.errors.len() >= self.config.error_threshold
        {
            state.circuit = CircuitState::Open;
            state.opened_at = Some(now);
            tracing::warn!(
                windowed_errors = state.errors.len(),
                threshold = self.config.error_threshold,
                "circuit opened"
            );
        }
    }

    /// Admission contract: allow while the circuit is closed.
    ///
    /// An allowed admission increments the load counter and returns a
    /// permit that releases it on drop.
    pub fn admit_new_turn(self: &Arc<Self>) -> Option<TurnPermit> {
        let mut state = self.lock();
        if state.circuit == CircuitState::Open {
            return None;
        }
        state.load += 1;
        Some(TurnPermit {
            guard: Arc::clone(self),
        })
    }

    fn release_turn(&self) {
        let mut state = self.lock();
        state.load = state.load.saturating_sub(1);
    }

    /// Current counters, without probing.
    pub fn metrics(&self) -> GuardMetrics {
        let now = Timestamp::now();
        let mut state = self.lock();
        Self::prune(&mut state, &now, self.config.error_window_secs);
        GuardMetrics {
            circuit: state.circuit,
            windowed_errors: state.errors.len(),
            active_turns: state.load,
            opened_at: state.opened_at,
        }
    }

    /// Health snapshot. When the circuit has been open longer than the
    /// probe timeout, probes the store and closes the circuit if the
    /// store is healthy and the window has drained below the allowance.
    pub async fn system_health(&self, store: &dyn ConversationStore) -> SystemHealth {
        let now = Timestamp::now();
        let probe_due = {
            let state = self.lock();
            matches!(
                (state.circuit, state.opened_at),
                (CircuitState::Open, Some(opened))
                    if now.seconds_since(&opened) > self.config.probe_timeout_secs as i64
            )
        };

        // The probe awaits outside the lock; the close decision re-reads
        // the window under it.
        let store_healthy = if probe_due {
            let healthy = match store.health_check().await {
                Ok(health) => health.healthy,
                Err(err) => {
                    tracing::warn!(error = %err, "store probe failed");
                    false
                }
            };
            let mut state = self.lock();
            Self::prune(&mut state, &now, self.config.error_window_secs);
            if healthy
                && state.circuit == CircuitState::Open
                && state.errors.len() < self.config.close_error_allowance
            {
                state.circuit = CircuitState::Closed;
                state.opened_at = None;
                tracing::info!("circuit closed after successful probe");
            }
            Some(healthy)
        } else {
            None
        };

        let metrics = self.metrics();
        let error_rate = metrics.windowed_errors as f64 / self.config.error_window_secs as f64;
        let status = self.classify(&metrics, error_rate);
        let issues = self.issues(&metrics, error_rate);
        SystemHealth {
            status,
            circuit: metrics.circuit,
            windowed_errors: metrics.windowed_errors,
            error_rate,
            active_turns: metrics.active_turns,
            max_load: self.config.max_load,
            store_healthy,
            issues,
        }
    }

    fn classify(&self, metrics: &GuardMetrics, error_rate: f64) -> HealthStatus {
        if metrics.circuit == CircuitState::Open {
            return HealthStatus::CircuitBreaker;
        }
        if f64::from(metrics.active_turns) > f64::from(self.config.max_load) * 0.9 {
            return HealthStatus::Overloaded;
        }
        if error_rate > self.config.degraded_error_rate {
            return HealthStatus::Degraded;
        }
        HealthStatus::Healthy
    }

    fn issues(&self, metrics: &GuardMetrics, error_rate: f64) -> Vec<String> {
        let mut issues = Vec::new();
        if metrics.circuit == CircuitState::Open {
            issues.push("circuit open: new turns are denied".to_string());
        }
        if f64::from(metrics.active_turns) > f64::from(self.config.max_load) * 0.9 {
            issues.push(format!(
                "load {} of {} near capacity",
                metrics.active_turns, self.config.max_load
            ));
        }
        if error_rate > self.config.degraded_error_rate {
            issues.push(format!(
                "error rate {error_rate:.2}/s above the {:.2}/s threshold",
                self.config.degraded_error_rate
            ));
        }
        issues
    }

    #[cfg(test)]
    fn force_opened_at(&self, opened_at: Timestamp) {
        let mut state = self.lock();
        state.opened_at = Some(opened_at);
    }
}

/// Load permit for one in-flight turn.
pub struct TurnPermit {
    guard: Arc<ResilienceGuard>,
}

impl Drop for TurnPermit {
    fn drop(&mut self) {
        self.guard.release_turn();
    }
}
