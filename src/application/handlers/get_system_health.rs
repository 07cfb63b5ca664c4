//! GetSystemHealthHandler - health query, including the circuit probe.

use std::sync::Arc;

use crate::domain::resilience::{ResilienceGuard, SystemHealth};
use crate::ports::ConversationStore;

/// Handler for the health query.
///
/// This is the only place an open circuit can close: the guard's probe
/// runs inside the query when the open timeout has elapsed.
pub struct GetSystemHealthHandler {
    guard: Arc<ResilienceGuard>,
    store: Arc<dyn ConversationStore>,
}

impl GetSystemHealthHandler {
    pub fn new(guard: Arc<ResilienceGuard>, store: Arc<dyn ConversationStore>) -> Self {
        Self { guard, store }
    }

    pub async fn handle(&self) -> SystemHealth {
        self.guard.system_health(self.store.as_ref()).await
    }
}
