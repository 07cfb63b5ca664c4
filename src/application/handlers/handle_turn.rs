//! HandleTurnHandler - the single write-path operation: one user
//! message in, one assistant response out.

use std::sync::Arc;

use crate::application::ConversationLocks;
use crate::config::OrchestratorConfig;
use crate::domain::conversation::{Conversation, ConversationContext};
use crate::domain::flow::{ClassificationError, FlowClassifier, FlowRequest};
use crate::domain::foundation::{ConversationId, EndUserId, WorkflowId};
use crate::domain::recovery::{RecoverySelector, RecoveryStrategy};
use crate::domain::resilience::ResilienceGuard;
use crate::domain::turn::{TurnCancellation, TurnEngine, TurnError};
use crate::ports::{ConversationStore, StoreError};

/// Command for one conversational turn.
#[derive(Debug, Clone)]
pub struct HandleTurnCommand {
    /// The inbound request; its message is the user's utterance.
    pub request: FlowRequest,
    /// Continue this conversation; `None` starts a new one.
    pub conversation_id: Option<ConversationId>,
    /// Authenticated end user, when known.
    pub end_user_id: Option<EndUserId>,
}

/// Machine-readable turn status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The turn completed normally.
    Processed,
    /// The turn completed after a recovery strategy succeeded.
    Recovered,
    /// Recovery failed too; the response text is an apology.
    Error,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Recovered => "recovered",
            Self::Error => "error",
        }
    }
}

/// Caller-facing turn result. Failure paths carry apology text, never a
/// raw error.
#[derive(Debug, Clone)]
pub struct HandleTurnResult {
    /// The conversation the turn ran against.
    pub conversation_id: ConversationId,
    /// Set when recovery replaced the conversation.
    pub new_conversation_id: Option<ConversationId>,
    /// Assistant text (or apology).
    pub response_text: String,
    pub status: TurnStatus,
    /// Completed turns on the conversation after this call.
    pub turn_count: u64,
    /// Context snapshot as of the end of the turn.
    pub context: ConversationContext,
    /// Handler that produced the response, when one did.
    pub handler_used: Option<String>,
    /// Mean stage confidence, when the turn completed.
    pub turn_confidence: Option<f64>,
    /// Workflow started this turn, if any.
    pub workflow_id: Option<WorkflowId>,
    pub needs_confirmation: bool,
    /// The recovery strategy that ran, when one did.
    pub recovery_strategy: Option<RecoveryStrategy>,
}

/// Errors that surface to the caller before or instead of a turn result.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    /// The resilience guard denied admission; retry later.
    #[error("new turns are temporarily not admitted")]
    AdmissionDenied,

    /// The caller supplied a malformed request.
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// The turn was cancelled cooperatively.
    #[error("turn cancelled")]
    Cancelled,

    /// The store failed before any turn work began.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handler for conversational turns.
pub struct HandleTurnHandler {
    classifier: FlowClassifier,
    engine: Arc<TurnEngine>,
    selector: Arc<RecoverySelector>,
    guard: Arc<ResilienceGuard>,
    store: Arc<dyn ConversationStore>,
    locks: Arc<ConversationLocks>,
    conversation_ttl_secs: Option<u64>,
}

impl HandleTurnHandler {
    pub fn new(
        classifier: FlowClassifier,
        engine: Arc<TurnEngine>,
        selector: Arc<RecoverySelector>,
        guard: Arc<ResilienceGuard>,
        store: Arc<dyn ConversationStore>,
        locks: Arc<ConversationLocks>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            classifier,
            engine,
            selector,
            guard,
            store,
            locks,
            conversation_ttl_secs: config.conversation_ttl_secs,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleTurnCommand,
        cancellation: &TurnCancellation,
    ) -> Result<HandleTurnResult, OrchestrationError> {
        // 1. Admission: denied turns never touch any state.
        let _permit = self
            .guard
            .admit_new_turn()
            .ok_or(OrchestrationError::AdmissionDenied)?;

        // 2. Resolve the conversation; classification only runs for new
        //    ones, an existing conversation's mode is fixed.
        let mut conversation = self.resolve_conversation(&cmd).await?;
        let conversation_id = conversation.id();

        // 3. Serialize against other turns for this conversation. The
        //    pre-lock snapshot is stale if another turn committed while
        //    we waited, so re-read it under the lock.
        let lock = self.locks.acquire(conversation_id);
        let _locked = lock.lock().await;
        if let Some(current) = self.store.load(conversation_id).await? {
            if !current.is_ended() {
                conversation = current;
            }
        }

        // 4. Drive the turn.
        match self
            .engine
            .run_turn(&mut conversation, &cmd.request.message, cancellation)
            .await
        {
            Ok(outcome) => {
                self.save_best_effort(&conversation).await;
                let status = if outcome.recovered_in_turn {
                    self.guard.record_error();
                    TurnStatus::Recovered
                } else {
                    TurnStatus::Processed
                };
                Ok(HandleTurnResult {
                    conversation_id,
                    new_conversation_id: None,
                    response_text: outcome.response_text,
                    status,
                    turn_count: conversation.turn_count(),
                    context: conversation.context().clone(),
                    handler_used: Some(outcome.handler_used),
                    turn_confidence: Some(outcome.turn_confidence),
                    workflow_id: outcome.workflow_id,
                    needs_confirmation: outcome.needs_confirmation,
                    recovery_strategy: None,
                })
            }

            // A cancelled turn aborts cleanly: nothing saved, no attempt
            // recorded, lock released on return.
            Err(TurnError::Cancelled) => Err(OrchestrationError::Cancelled),

            // 5. In-turn recovery is exhausted; hand the failure to the
            //    selector.
            Err(TurnError::RecoveryExhausted { last_error, loops }) => {
                tracing::warn!(
                    %conversation_id,
                    loops,
                    error = %last_error,
                    "turn failed, delegating to recovery"
                );
                self.guard.record_error();
                // The selector operates on the stored snapshot, which must
                // include the message that just failed.
                self.save_best_effort(&conversation).await;

                let recovery = self
                    .selector
                    .select_and_execute(conversation_id, &last_error)
                    .await;

                let status = if recovery.success {
                    TurnStatus::Recovered
                } else {
                    self.guard.record_error();
                    TurnStatus::Error
                };
                Ok(HandleTurnResult {
                    conversation_id,
                    new_conversation_id: recovery.new_conversation_id,
                    response_text: recovery.response_text,
                    status,
                    turn_count: conversation.turn_count(),
                    context: conversation.context().clone(),
                    handler_used: None,
                    turn_confidence: None,
                    workflow_id: None,
                    needs_confirmation: false,
                    recovery_strategy: Some(recovery.strategy),
                })
            }
        }
    }

    /// Loads the requested conversation, following at most one transfer
    /// hop; classifies a new one when none exists.
    async fn resolve_conversation(
        &self,
        cmd: &HandleTurnCommand,
    ) -> Result<Conversation, OrchestrationError> {
        if let Some(id) = cmd.conversation_id {
            if let Some(found) = self.store.load(id).await? {
                if !found.is_ended() {
                    return Ok(found);
                }
                if let Some(successor) = found.transferred_to() {
                    if let Some(next) = self.store.load(successor).await? {
                        if !next.is_ended() {
                            tracing::debug!(%id, %successor, "following conversation transfer");
                            return Ok(next);
                        }
                    }
                }
            }
            // Expired or fully ended: fall through to a fresh
            // conversation rather than refusing the message.
            tracing::info!(%id, "conversation unavailable, starting a new one");
        }

        let classification = self.classifier.classify(&cmd.request)?;
        let mut conversation = Conversation::new(
            classification.mode,
            cmd.request.tenant_id.clone(),
            cmd.end_user_id.clone(),
        );
        *conversation.context_mut() = classification.seed_context;
        tracing::info!(
            conversation_id = %conversation.id(),
            mode = ?classification.mode,
            rule = ?classification.rule,
            "conversation created"
        );
        Ok(conversation)
    }

    /// Persistence after a completed turn is best-effort: the response
    /// already exists, losing the snapshot must not fail the turn.
    async fn save_best_effort(&self, conversation: &Conversation) {
        if let Err(err) = self
            .store
            .save(conversation, self.conversation_ttl_secs)
            .await
        {
            tracing::warn!(
                conversation_id = %conversation.id(),
                error = %err,
                "conversation snapshot not saved"
            );
            self.guard.record_error();
        }
    }
}
