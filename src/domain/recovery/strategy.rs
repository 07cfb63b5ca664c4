//! Recovery strategies and the error-text vocabularies that select them.

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Transient-failure vocabulary: worth retrying the same handler.
pub(super) static TRANSIENT_VOCAB: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["timed out", "timeout", "deadline", "connection", "unreachable"]);

/// Backend-fault vocabulary: the handler itself looks unhealthy, switch
/// to the fallback.
pub(super) static BACKEND_VOCAB: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["agent backend", "backend error", "agent error", "model error"]);

/// Corruption vocabulary: conversational state is suspect, reset it.
pub(super) static CORRUPTION_VOCAB: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "corrupt",
        "invalid state",
        "invalid context",
        "deserialize",
        "serialization",
    ]
});

/// The bounded remediation actions recovery can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Back off briefly and resubmit to the same handler.
    RetrySameHandler,
    /// Force the fallback handler and resubmit.
    SwitchToFallbackHandler,
    /// Clear conversational state back to the greeting.
    ResetConversation,
    /// Replace the conversation with a fresh one.
    StartNewConversation,
    /// Flag the conversation for human follow-up.
    EscalateToHuman,
}

impl RecoveryStrategy {
    /// Stable snake_case tag used in attempt records and responses.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RetrySameHandler => "retry_same_handler",
            Self::SwitchToFallbackHandler => "switch_to_fallback_handler",
            Self::ResetConversation => "reset_conversation",
            Self::StartNewConversation => "start_new_conversation",
            Self::EscalateToHuman => "escalate_to_human",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

pub(super) fn matches_vocab(error_text: &str, vocab: &[&str]) -> bool {
    let lowered = error_text.to_ascii_lowercase();
    vocab.iter().any(|term| lowered.contains(term))
}
