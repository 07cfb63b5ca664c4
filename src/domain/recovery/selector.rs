//! Strategy selection and execution.
//!
//! Six ordered rules, first match wins:
//!   1. windowed attempt count at the cap  -> start a new conversation
//!   2. transient (timeout/connection) text -> retry the same handler
//!   3. backend-fault text                  -> switch to the fallback
//!   4. corruption text                     -> reset the conversation
//!   5. first attempt for the conversation  -> retry the same handler
//!   6. anything else                       -> start a new conversation
//!
//! Exactly one strategy is executed per invocation. Every attempt is
//! appended to the history before the outcome is returned, and a failed
//! execution never cascades into a different strategy.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RecoveryConfig;
use crate::domain::conversation::{Conversation, ConversationMessage};
use crate::domain::foundation::ConversationId;
use crate::ports::{AgentError, AgentRequest, ConversationStore, StoreError};
use crate::ports::AgentBackend;

use super::strategy::{matches_vocab, BACKEND_VOCAB, CORRUPTION_VOCAB, TRANSIENT_VOCAB};
use super::{RecoveryAttempt, RecoveryHistory, RecoveryStrategy};

/// Apology returned whenever a strategy execution itself fails.
const FAILURE_APOLOGY: &str =
    "I'm sorry, I'm having trouble on my end right now. Please try again in a moment.";

const RESET_RESPONSE: &str =
    "I'm sorry, something went wrong on our side. Let's start over. How can I help you?";

const NEW_CONVERSATION_RESPONSE: &str =
    "I'm sorry, I wasn't able to continue that conversation. I've started a fresh one for us.";

const ESCALATION_RESPONSE: &str =
    "I'm sorry for the trouble. I've flagged this conversation so a member of our team can follow up.";

/// Internal strategy-execution failures. These never surface raw to the
/// caller; the selector converts them into `success = false` plus an
/// apology.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("conversation not found: {0}")]
    ConversationMissing(ConversationId),

    #[error("conversation has no user message to resubmit")]
    NothingToResubmit,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Result of one recovery invocation.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    /// Whether the executed strategy succeeded.
    pub success: bool,
    /// The strategy that was executed.
    pub strategy: RecoveryStrategy,
    /// Caller-facing text (a real response on success, an apology
    /// otherwise). Never a raw error.
    pub response_text: String,
    /// Set when the conversation was replaced.
    pub new_conversation_id: Option<ConversationId>,
    /// Strategy-specific details.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Classifies turn failures and executes one bounded remediation.
pub struct RecoverySelector {
    backend: Arc<dyn AgentBackend>,
    store: Arc<dyn ConversationStore>,
    history: Arc<RecoveryHistory>,
    config: RecoveryConfig,
}

impl RecoverySelector {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        store: Arc<dyn ConversationStore>,
        config: RecoveryConfig,
    ) -> Self {
        let history = Arc::new(RecoveryHistory::new(config.history_ttl_secs));
        Self {
            backend,
            store,
            history,
            config,
        }
    }

    /// The attempt history, shared with the read-side query handler.
    pub fn history(&self) -> Arc<RecoveryHistory> {
        self.history.clone()
    }

    /// Pure classification: applies the six rules in order.
    pub fn select(&self, conversation_id: ConversationId, error_text: &str) -> RecoveryStrategy {
        let windowed = self
            .history
            .within_window(conversation_id, self.config.attempt_window_secs)
            .len();
        if windowed >= self.config.attempt_cap {
            return RecoveryStrategy::StartNewConversation;
        }
        if matches_vocab(error_text, &TRANSIENT_VOCAB) {
            return RecoveryStrategy::RetrySameHandler;
        }
        if matches_vocab(error_text, &BACKEND_VOCAB) {
            return RecoveryStrategy::SwitchToFallbackHandler;
        }
        if matches_vocab(error_text, &CORRUPTION_VOCAB) {
            return RecoveryStrategy::ResetConversation;
        }
        if self.history.count(conversation_id) == 0 {
            return RecoveryStrategy::RetrySameHandler;
        }
        RecoveryStrategy::StartNewConversation
    }

    /// Classifies the failure, executes the chosen strategy, records the
    /// attempt, and returns the outcome.
    pub async fn select_and_execute(
        &self,
        conversation_id: ConversationId,
        error_text: &str,
    ) -> RecoveryOutcome {
        let strategy = self.select(conversation_id, error_text);
        tracing::info!(
            %conversation_id,
            %strategy,
            error = error_text,
            "executing recovery strategy"
        );
        self.execute(conversation_id, strategy, error_text).await
    }

    /// Explicitly escalates a conversation to a human, recording the
    /// attempt like any other strategy execution.
    pub async fn escalate_to_human(
        &self,
        conversation_id: ConversationId,
        reason: &str,
    ) -> RecoveryOutcome {
        self.execute(conversation_id, RecoveryStrategy::EscalateToHuman, reason)
            .await
    }

    async fn execute(
        &self,
        conversation_id: ConversationId,
        strategy: RecoveryStrategy,
        error_text: &str,
    ) -> RecoveryOutcome {
        let result = match strategy {
            RecoveryStrategy::RetrySameHandler => self.retry_same_handler(conversation_id).await,
            RecoveryStrategy::SwitchToFallbackHandler => {
                self.switch_to_fallback(conversation_id).await
            }
            RecoveryStrategy::ResetConversation => self.reset_conversation(conversation_id).await,
            RecoveryStrategy::StartNewConversation => {
                self.start_new_conversation(conversation_id, error_text).await
            }
            RecoveryStrategy::EscalateToHuman => {
                self.escalate(conversation_id, error_text).await
            }
        };

        let outcome = match result {
            Ok(executed) => RecoveryOutcome {
                success: true,
                strategy,
                response_text: executed.response_text,
                new_conversation_id: executed.new_conversation_id,
                metadata: executed.metadata,
            },
            Err(err) => {
                tracing::warn!(%conversation_id, %strategy, error = %err, "recovery strategy failed");
                RecoveryOutcome {
                    success: false,
                    strategy,
                    response_text: FAILURE_APOLOGY.to_string(),
                    new_conversation_id: None,
                    metadata: BTreeMap::from([(
                        "execution_error".to_string(),
                        serde_json::json!(err.to_string()),
                    )]),
                }
            }
        };

        let mut attempt =
            RecoveryAttempt::new(conversation_id, strategy, outcome.success, error_text);
        attempt.metadata = outcome.metadata.clone();
        self.history.append(attempt);

        outcome
    }

    async fn load_required(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Conversation, RecoveryError> {
        self.store
            .load(conversation_id)
            .await?
            .ok_or(RecoveryError::ConversationMissing(conversation_id))
    }

    /// Backs off, then resubmits the last user message to the handler the
    /// conversation already routed to.
    async fn retry_same_handler(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Executed, RecoveryError> {
        tokio::time::sleep(Duration::from_secs(self.config.retry_backoff_secs)).await;

        let mut conversation = self.load_required(conversation_id).await?;
        let handler = conversation
            .context()
            .selected_handler
            .clone()
            .unwrap_or_else(|| "general_handler".to_string());
        self.resubmit(&mut conversation, &handler).await
    }

    /// Forces the fallback handler for this and the next turn, then
    /// resubmits.
    async fn switch_to_fallback(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Executed, RecoveryError> {
        let mut conversation = self.load_required(conversation_id).await?;
        let fallback = conversation
            .context()
            .fallback_handler
            .clone()
            .unwrap_or_else(|| "general_handler".to_string());
        conversation.context_mut().forced_handler = Some(fallback.clone());
        let mut executed = self.resubmit(&mut conversation, &fallback).await?;
        executed
            .metadata
            .insert("forced_handler".into(), serde_json::json!(fallback));
        Ok(executed)
    }

    async fn resubmit(
        &self,
        conversation: &mut Conversation,
        handler: &str,
    ) -> Result<Executed, RecoveryError> {
        let message = conversation
            .last_user_message()
            .map(|m| m.content.clone())
            .ok_or(RecoveryError::NothingToResubmit)?;

        let mut request = AgentRequest::new(
            conversation.id(),
            handler,
            message,
            conversation.context().clone(),
        );
        if let Some(user) = conversation.end_user_id() {
            request = request.with_end_user(user.clone());
        }

        let response = self.backend.invoke(request).await?;
        conversation.record_handler(handler);
        conversation.push_message(ConversationMessage::assistant(
            response.response_text.clone(),
            response.handler_used.clone(),
            response.confidence,
        ));
        conversation.complete_turn();
        self.store.save(conversation, None).await?;

        Ok(Executed {
            response_text: response.response_text,
            new_conversation_id: None,
            metadata: BTreeMap::from([(
                "handler".to_string(),
                serde_json::json!(response.handler_used),
            )]),
        })
    }

    /// Clears conversational state back to the greeting, keeping only the
    /// allow-listed context subset.
    async fn reset_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Executed, RecoveryError> {
        let mut conversation = self.load_required(conversation_id).await?;
        conversation.reset();
        self.store.save(&conversation, None).await?;

        Ok(Executed {
            response_text: RESET_RESPONSE.to_string(),
            new_conversation_id: None,
            metadata: BTreeMap::new(),
        })
    }

    /// Replaces the conversation: the old one is ended with a forward
    /// reference, the new one carries a back-reference and the transfer
    /// reason.
    async fn start_new_conversation(
        &self,
        conversation_id: ConversationId,
        reason: &str,
    ) -> Result<Executed, RecoveryError> {
        let mut old = self.load_required(conversation_id).await?;

        let mut fresh = Conversation::new(
            old.mode(),
            old.tenant_id().cloned(),
            old.end_user_id().cloned(),
        );
        let context = fresh.context_mut();
        context.preferences = old.context().preferences.clone();
        context.extra.insert(
            "transferred_from".into(),
            serde_json::json!(conversation_id.to_string()),
        );
        context
            .extra
            .insert("transfer_reason".into(), serde_json::json!(reason));

        old.end_transferred(fresh.id());
        self.store.save(&fresh, None).await?;
        self.store.save(&old, None).await?;

        Ok(Executed {
            response_text: NEW_CONVERSATION_RESPONSE.to_string(),
            new_conversation_id: Some(fresh.id()),
            metadata: BTreeMap::from([(
                "new_conversation_id".to_string(),
                serde_json::json!(fresh.id().to_string()),
            )]),
        })
    }

    async fn escalate(
        &self,
        conversation_id: ConversationId,
        reason: &str,
    ) -> Result<Executed, RecoveryError> {
        let mut conversation = self.load_required(conversation_id).await?;
        conversation.escalate(reason);
        self.store.save(&conversation, None).await?;

        Ok(Executed {
            response_text: ESCALATION_RESPONSE.to_string(),
            new_conversation_id: None,
            metadata: BTreeMap::from([("reason".to_string(), serde_json::json!(reason))]),
        })
    }
}

struct Executed {
    response_text: String,
    new_conversation_id: Option<ConversationId>,
    metadata: BTreeMap<String, serde_json::Value>,
}
