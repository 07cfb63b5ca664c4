//! Immutable recovery attempt records and their per-conversation history.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, Timestamp};

use super::RecoveryStrategy;

/// One recovery attempt. Append-only: once recorded it is never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    /// Conversation the attempt belongs to.
    pub conversation_id: ConversationId,
    /// Strategy that was executed.
    pub strategy: RecoveryStrategy,
    /// When the attempt was made.
    pub at: Timestamp,
    /// Whether the strategy execution succeeded.
    pub success: bool,
    /// The error text that triggered recovery.
    pub error_text: String,
    /// Strategy-specific details (successor id, forced handler, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RecoveryAttempt {
    pub fn new(
        conversation_id: ConversationId,
        strategy: RecoveryStrategy,
        success: bool,
        error_text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            strategy,
            at: Timestamp::now(),
            success,
            error_text: error_text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// In-memory, TTL-pruned recovery history, keyed by conversation.
///
/// Appends happen in invocation order under one lock, so the windowed
/// counts the selector's first rule depends on see attempts
/// chronologically.
#[derive(Debug, Default)]
pub struct RecoveryHistory {
    ttl_secs: u64,
    attempts: Mutex<HashMap<ConversationId, Vec<RecoveryAttempt>>>,
}

impl RecoveryHistory {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Appends an attempt, pruning expired records for the conversation.
    pub fn append(&self, attempt: RecoveryAttempt) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let entry = attempts.entry(attempt.conversation_id).or_default();
        let now = Timestamp::now();
        entry.retain(|a| a.at.is_within_window(&now, self.ttl_secs));
        entry.push(attempt);
    }

    /// Attempts for a conversation within the trailing window, oldest
    /// first.
    pub fn within_window(
        &self,
        conversation_id: ConversationId,
        window_secs: u64,
    ) -> Vec<RecoveryAttempt> {
        let attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Timestamp::now();
        attempts
            .get(&conversation_id)
            .map(|log| {
                log.iter()
                    .filter(|a| a.at.is_within_window(&now, window_secs))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All non-expired attempts for a conversation, oldest first.
    pub fn all(&self, conversation_id: ConversationId) -> Vec<RecoveryAttempt> {
        self.within_window(conversation_id, self.ttl_secs)
    }

    /// Total attempts ever recorded for a conversation (not yet expired).
    pub fn count(&self, conversation_id: ConversationId) -> usize {
        self.all(conversation_id).len()
    }
}
