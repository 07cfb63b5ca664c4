//! The Conversation aggregate.
//!
//! Owned by the turn engine while a turn runs; persisted as a snapshot to
//! the external store between turns.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, EndUserId, TenantId, Timestamp};

use super::{ConversationContext, ConversationMessage, ConversationMode, MessageRole};

/// Human-escalation marker set by the escalation recovery strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    /// When the conversation was flagged.
    pub at: Timestamp,
    /// Why it was flagged.
    pub reason: String,
}

/// A multi-turn conversation between one end user and the platform.
///
/// The mode tag is set once at creation and never changes. Recovery may
/// replace the conversation with a new one, never reclassify this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    tenant_id: Option<TenantId>,
    end_user_id: Option<EndUserId>,
    mode: ConversationMode,
    messages: Vec<ConversationMessage>,
    context: ConversationContext,
    turn_count: u64,
    agent_history: Vec<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
    ended_at: Option<Timestamp>,
    /// Set when recovery replaced this conversation with a new one.
    transferred_to: Option<ConversationId>,
    escalation: Option<Escalation>,
}

impl Conversation {
    /// Creates a new conversation in the given mode.
    pub fn new(
        mode: ConversationMode,
        tenant_id: Option<TenantId>,
        end_user_id: Option<EndUserId>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            tenant_id,
            end_user_id,
            mode,
            messages: Vec::new(),
            context: ConversationContext::default(),
            turn_count: 0,
            agent_history: Vec::new(),
            created_at: now,
            updated_at: now,
            ended_at: None,
            transferred_to: None,
            escalation: None,
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    pub fn end_user_id(&self) -> Option<&EndUserId> {
        self.end_user_id.as_ref()
    }

    /// The mode fixed at creation.
    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ConversationContext {
        self.touch();
        &mut self.context
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    /// Every handler ever invoked for this conversation, in order.
    pub fn agent_history(&self) -> &[String] {
        &self.agent_history
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn transferred_to(&self) -> Option<ConversationId> {
        self.transferred_to
    }

    pub fn escalation(&self) -> Option<&Escalation> {
        self.escalation.as_ref()
    }

    /// True before the first completed turn; greeting fires only here.
    pub fn is_first_turn(&self) -> bool {
        self.turn_count == 0
    }

    /// Appends a message to the ordered log.
    pub fn push_message(&mut self, message: ConversationMessage) {
        self.messages.push(message);
        self.touch();
    }

    /// Records a handler invocation in the agent history.
    pub fn record_handler(&mut self, handler: impl Into<String>) {
        self.agent_history.push(handler.into());
        self.touch();
    }

    /// Marks a turn as completed. The counter only ever increases.
    pub fn complete_turn(&mut self) {
        self.turn_count += 1;
        self.touch();
    }

    /// The most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&ConversationMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }

    /// The trailing `window` messages before the latest one, oldest first.
    /// Used by intent detection for bounded history context.
    pub fn recent_history(&self, window: usize) -> &[ConversationMessage] {
        let len = self.messages.len();
        let end = len.saturating_sub(1);
        let start = end.saturating_sub(window);
        &self.messages[start..end]
    }

    /// Resets conversational state after context corruption: preserves the
    /// allow-listed context subset, rewinds the turn counter so the next
    /// turn re-enters at the greeting stage. The message log is kept as an
    /// audit trail.
    pub fn reset(&mut self) {
        self.context = self.context.reset_preserving_allowed();
        self.turn_count = 0;
        self.touch();
    }

    /// Ends this conversation because recovery replaced it.
    pub fn end_transferred(&mut self, successor: ConversationId) {
        self.ended_at = Some(Timestamp::now());
        self.transferred_to = Some(successor);
        self.touch();
    }

    /// Flags the conversation for human follow-up.
    pub fn escalate(&mut self, reason: impl Into<String>) {
        self.escalation = Some(Escalation {
            at: Timestamp::now(),
            reason: reason.into(),
        });
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation::new(
            ConversationMode::SingleTenant,
            TenantId::new("tenant-1"),
            EndUserId::new("user-1"),
        )
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn new_conversation_starts_at_turn_zero() {
            let convo = conversation();
            assert_eq!(convo.turn_count(), 0);
            assert!(convo.is_first_turn());
            assert!(convo.messages().is_empty());
            assert!(!convo.is_ended());
        }

        #[test]
        fn complete_turn_increments_counter() {
            let mut convo = conversation();
            convo.complete_turn();
            convo.complete_turn();
            assert_eq!(convo.turn_count(), 2);
            assert!(!convo.is_first_turn());
        }

        #[test]
        fn mode_has_no_mutator() {
            // The mode field is private with only a getter; this test pins
            // the creation-time value.
            let convo = conversation();
            assert_eq!(convo.mode(), ConversationMode::SingleTenant);
        }

        #[test]
        fn end_transferred_records_successor() {
            let mut convo = conversation();
            let successor = ConversationId::new();
            convo.end_transferred(successor);
            assert!(convo.is_ended());
            assert_eq!(convo.transferred_to(), Some(successor));
        }

        #[test]
        fn escalate_records_reason_and_time() {
            let mut convo = conversation();
            convo.escalate("backend exhausted");
            let esc = convo.escalation().unwrap();
            assert_eq!(esc.reason, "backend exhausted");
        }
    }

    mod messages {
        use super::*;

        #[test]
        fn last_user_message_skips_assistant_replies() {
            let mut convo = conversation();
            convo.push_message(ConversationMessage::user("first"));
            convo.push_message(ConversationMessage::assistant("reply", "h", 0.9));
            convo.push_message(ConversationMessage::user("second"));
            convo.push_message(ConversationMessage::assistant("reply2", "h", 0.9));

            // Note: "last user message" is relative to the full log.
            assert_eq!(convo.last_user_message().unwrap().content, "second");
        }

        #[test]
        fn recent_history_excludes_latest_message() {
            let mut convo = conversation();
            for i in 0..5 {
                convo.push_message(ConversationMessage::user(format!("m{i}")));
            }
            let history = convo.recent_history(3);
            let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["m1", "m2", "m3"]);
        }

        #[test]
        fn recent_history_handles_short_logs() {
            let mut convo = conversation();
            assert!(convo.recent_history(4).is_empty());
            convo.push_message(ConversationMessage::user("only"));
            assert!(convo.recent_history(4).is_empty());
        }
    }

    mod reset {
        use super::*;

        #[test]
        fn reset_rewinds_turn_counter_and_clears_context() {
            let mut convo = conversation();
            convo.context_mut().record_intent("booking", 0.9, true, "transactional");
            convo
                .context_mut()
                .preferences
                .insert("language".into(), serde_json::json!("fr"));
            convo.complete_turn();

            convo.reset();

            assert_eq!(convo.turn_count(), 0);
            assert!(convo.is_first_turn());
            assert!(convo.context().intent.is_none());
            assert_eq!(
                convo.context().preferences.get("language"),
                Some(&serde_json::json!("fr"))
            );
        }

        #[test]
        fn reset_keeps_message_log() {
            let mut convo = conversation();
            convo.push_message(ConversationMessage::user("hello"));
            convo.reset();
            assert_eq!(convo.messages().len(), 1);
        }

        #[test]
        fn reset_keeps_tenant_user_and_mode() {
            let mut convo = conversation();
            convo.reset();
            assert_eq!(convo.tenant_id().unwrap().as_str(), "tenant-1");
            assert_eq!(convo.end_user_id().unwrap().as_str(), "user-1");
            assert_eq!(convo.mode(), ConversationMode::SingleTenant);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Outside an explicit reset, the turn counter never goes
            /// backwards, whatever mix of messages and completions runs.
            #[test]
            fn turn_counter_never_decreases(ops in proptest::collection::vec(any::<bool>(), 0..40)) {
                let mut convo = conversation();
                let mut last = convo.turn_count();
                for complete in ops {
                    if complete {
                        convo.complete_turn();
                    } else {
                        convo.push_message(ConversationMessage::user("hi"));
                    }
                    prop_assert!(convo.turn_count() >= last);
                    last = convo.turn_count();
                }
            }
        }
    }

    mod snapshots {
        use super::*;

        #[test]
        fn conversation_roundtrips_through_json() {
            let mut convo = conversation();
            convo.push_message(ConversationMessage::user("hello"));
            convo.record_handler("dining_handler");
            convo.complete_turn();

            let json = serde_json::to_string(&convo).unwrap();
            let back: Conversation = serde_json::from_str(&json).unwrap();

            assert_eq!(back.id(), convo.id());
            assert_eq!(back.turn_count(), 1);
            assert_eq!(back.agent_history(), &["dining_handler".to_string()]);
            assert_eq!(back.messages().len(), 1);
        }
    }
}
