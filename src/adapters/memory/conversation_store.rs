//! In-memory conversation store with TTL expiry and failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, Timestamp};
use crate::ports::{ConversationStore, StoreError, StoreHealth};

struct Entry {
    snapshot: Conversation,
    expires_at: Option<Timestamp>,
}

impl Entry {
    fn is_expired(&self, now: &Timestamp) -> bool {
        self.expires_at
            .as_ref()
            .map(|expiry| expiry.is_before(now))
            .unwrap_or(false)
    }
}

/// Hash-map backed store. Suitable for single-node deployments and used
/// by every test; failure injection covers the resilience paths.
#[derive(Default)]
pub struct InMemoryConversationStore {
    entries: Mutex<HashMap<ConversationId, Entry>>,
    fail_writes: AtomicBool,
    fail_health: AtomicBool,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent save fail as unavailable.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Makes every subsequent health check report unhealthy.
    pub fn fail_health_checks(&self) {
        self.fail_health.store(true, Ordering::SeqCst);
    }

    /// Restores normal operation.
    pub fn heal(&self) {
        self.fail_writes.store(false, Ordering::SeqCst);
        self.fail_health.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn save(&self, snapshot: &Conversation, ttl_secs: Option<u64>) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        let expires_at = ttl_secs.map(|ttl| Timestamp::now().plus_seconds(ttl as i64));
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            snapshot.id(),
            Entry {
                snapshot: snapshot.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn load(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError> {
        let now = Timestamp::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&id) {
            Some(entry) if entry.is_expired(&now) => {
                entries.remove(&id);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.snapshot.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: ConversationId) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&id);
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<ConversationId>, StoreError> {
        let now = Timestamp::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| !entry.is_expired(&now));
        Ok(entries.keys().copied().collect())
    }

    async fn health_check(&self) -> Result<StoreHealth, StoreError> {
        if self.fail_health.load(Ordering::SeqCst) {
            return Ok(StoreHealth::unhealthy("health checks disabled"));
        }
        Ok(StoreHealth::healthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ConversationMode;
    use crate::domain::foundation::{EndUserId, TenantId};

    fn conversation() -> Conversation {
        Conversation::new(
            ConversationMode::SingleTenant,
            TenantId::new("tenant-1"),
            EndUserId::new("user-1"),
        )
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let store = InMemoryConversationStore::new();
        let convo = conversation();
        store.save(&convo, None).await.unwrap();

        let loaded = store.load(convo.id()).await.unwrap().unwrap();
        assert_eq!(loaded.id(), convo.id());
    }

    #[tokio::test]
    async fn missing_conversation_loads_as_none() {
        let store = InMemoryConversationStore::new();
        assert!(store.load(ConversationId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_snapshot_behaves_like_missing() {
        let store = InMemoryConversationStore::new();
        let convo = conversation();
        store.save(&convo, Some(60)).await.unwrap();

        // Backdate the expiry.
        {
            let mut entries = store.entries.lock().unwrap();
            entries.get_mut(&convo.id()).unwrap().expires_at =
                Some(Timestamp::now().minus_seconds(1));
        }

        assert!(store.load(convo.id()).await.unwrap().is_none());
        assert!(store.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryConversationStore::new();
        let convo = conversation();
        store.save(&convo, None).await.unwrap();

        store.delete(convo.id()).await.unwrap();
        store.delete(convo.id()).await.unwrap();
        assert!(store.load(convo.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failure_injection_covers_writes_and_health() {
        let store = InMemoryConversationStore::new();
        store.fail_writes();
        store.fail_health_checks();

        let err = store.save(&conversation(), None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!store.health_check().await.unwrap().healthy);

        store.heal();
        assert!(store.save(&conversation(), None).await.is_ok());
        assert!(store.health_check().await.unwrap().healthy);
    }
}
