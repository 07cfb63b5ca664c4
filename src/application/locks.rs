//! Per-conversation turn serialization.
//!
//! Turns for different conversations run concurrently; turns for the
//! same conversation never do, since the engine mutates the context and
//! message log in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::foundation::ConversationId;

/// Lock registry keyed by conversation id.
///
/// Entries are pruned lazily once no turn holds them, so the map does
/// not grow with the total number of conversations ever seen.
#[derive(Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for a conversation, creating it on first use.
    pub fn acquire(&self, id: ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.len() > 1024 {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks.entry(id).or_default().clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}
