//! Conversation Store Port - Interface for persisting conversations
//! between turns.

use async_trait::async_trait;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::ConversationId;

/// Errors from the persistence store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("failed to serialize conversation snapshot: {0}")]
    SerializationFailed(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Health report from the store, consumed by the resilience guard's probe.
#[derive(Debug, Clone)]
pub struct StoreHealth {
    /// True when the store can serve reads and writes.
    pub healthy: bool,
    /// Human-readable detail for health reporting.
    pub detail: String,
}

impl StoreHealth {
    /// A healthy report.
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            detail: "ok".into(),
        }
    }

    /// An unhealthy report with detail.
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
        }
    }
}

/// Port for persisting and loading conversation snapshots.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Saves a snapshot, optionally bounded by a TTL in seconds.
    async fn save(&self, snapshot: &Conversation, ttl_secs: Option<u64>) -> Result<(), StoreError>;

    /// Loads a snapshot. `Ok(None)` means the conversation does not exist
    /// (or its TTL expired); only infrastructure faults are errors.
    async fn load(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError>;

    /// Deletes a snapshot. Deleting a missing conversation is not an error.
    async fn delete(&self, id: ConversationId) -> Result<(), StoreError>;

    /// Lists ids of all non-expired conversations.
    async fn list_active(&self) -> Result<Vec<ConversationId>, StoreError>;

    /// Reports store health for the resilience probe.
    async fn health_check(&self) -> Result<StoreHealth, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_constructors_set_flags() {
        assert!(StoreHealth::healthy().healthy);
        let bad = StoreHealth::unhealthy("disk full");
        assert!(!bad.healthy);
        assert_eq!(bad.detail, "disk full");
    }

    #[test]
    fn not_found_displays_conversation_id() {
        let id = ConversationId::new();
        let err = StoreError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
