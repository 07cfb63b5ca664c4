//! System-wide resilience: circuit breaker, load accounting, health
//! classification.

mod guard;
mod health;

pub use guard::{CircuitState, GuardMetrics, ResilienceGuard, TurnPermit};
pub use health::{HealthStatus, SystemHealth};
