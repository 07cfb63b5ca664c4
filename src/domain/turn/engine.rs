//! Turn engine - drives one turn through the stage pipeline.
//!
//! The engine owns the conversation for the duration of a turn. Stages
//! execute strictly in pipeline order; any stage's internal error is
//! caught here, converted into the recovery branch and never propagated
//! raw. Only processing and the recovery selector's retries may block on
//! the agent backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;

use crate::config::PipelineConfig;
use crate::domain::conversation::{Conversation, ConversationMessage, TenantEnrichment};
use crate::domain::foundation::{StateMachine, Timestamp, WorkflowId};
use crate::ports::{
    AgentBackend, AgentError, AgentRequest, AgentResponse, TenantDirectory, WorkflowTrigger,
};

use super::{
    detect_intent, extract_facts, required_fields, select_handler, workflow_for, HandlerSelection,
    TurnStage, TurnState,
};

/// Greeting appended on a conversation's first turn.
const GREETING_TEXT: &str = "Hi there! How can I help you today?";

/// Cooperative cancellation flag for a running turn.
///
/// Checked at every stage boundary; cancelling mid-processing aborts the
/// backend call cleanly and records nothing.
#[derive(Debug, Default)]
pub struct TurnCancellation {
    cancelled: AtomicBool,
    notify: Notify,
}

impl TurnCancellation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Requests cancellation of the turn.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Errors a turn can surface to the application layer.
///
/// Stage failures never appear here directly: the engine absorbs them
/// into the recovery loop and only reports the loop's exhaustion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TurnError {
    /// The per-turn recovery ceiling was hit; the caller should route the
    /// failure to the recovery selector.
    #[error("turn recovery exhausted after {loops} loops: {last_error}")]
    RecoveryExhausted {
        /// Trips through error recovery before giving up.
        loops: u32,
        /// The error that kept the turn failing.
        last_error: String,
    },

    /// The turn was cancelled cooperatively.
    #[error("turn cancelled")]
    Cancelled,
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Assistant response text.
    pub response_text: String,
    /// Handler that produced the response.
    pub handler_used: String,
    /// Mean of per-stage confidences recorded this turn.
    pub turn_confidence: f64,
    /// Whether the turn went through an in-turn recovery loop.
    pub recovered_in_turn: bool,
    /// Workflow started this turn, if any.
    pub workflow_id: Option<WorkflowId>,
    /// Whether the outcome needs explicit user confirmation.
    pub needs_confirmation: bool,
}

/// Drives turns through the stage pipeline.
pub struct TurnEngine {
    backend: Arc<dyn AgentBackend>,
    tenants: Arc<dyn TenantDirectory>,
    workflows: Arc<dyn WorkflowTrigger>,
    config: PipelineConfig,
}

impl TurnEngine {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        tenants: Arc<dyn TenantDirectory>,
        workflows: Arc<dyn WorkflowTrigger>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            backend,
            tenants,
            workflows,
            config,
        }
    }

    /// Runs one turn for the given user message.
    ///
    /// The caller must hold the per-conversation lock; the engine mutates
    /// the message log and context in place.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        user_message: &str,
        cancellation: &TurnCancellation,
    ) -> Result<TurnOutcome, TurnError> {
        let span = tracing::debug_span!(
            "turn",
            conversation_id = %conversation.id(),
            tenant_id = conversation.tenant_id().map(|t| t.as_str()),
            turn = conversation.turn_count() + 1,
        );
        let _guard = span.enter();

        conversation.push_message(ConversationMessage::user(user_message));

        let mut state = TurnState::new();
        let mut response: Option<AgentResponse> = None;
        let mut workflow_id: Option<WorkflowId> = None;

        loop {
            if cancellation.is_cancelled() {
                tracing::debug!(stage = %state.stage, "turn cancelled at stage boundary");
                return Err(TurnError::Cancelled);
            }

            tracing::debug!(stage = %state.stage, "executing stage");

            let next = match state.stage {
                TurnStage::Greeting => {
                    if conversation.is_first_turn() {
                        conversation.push_message(ConversationMessage::system(
                            GREETING_TEXT,
                            TurnStage::Greeting,
                        ));
                    }
                    TurnStage::IntentDetection
                }

                TurnStage::IntentDetection => {
                    let history = conversation.recent_history(self.config.history_window);
                    let signal = detect_intent(user_message, history);
                    state.record_confidence(TurnStage::IntentDetection, signal.confidence);
                    conversation.context_mut().record_intent(
                        signal.label,
                        signal.confidence,
                        signal.requires_scheduling,
                        signal.category,
                    );
                    TurnStage::InformationGathering
                }

                TurnStage::InformationGathering => {
                    let facts = extract_facts(user_message);
                    let context = conversation.context_mut();
                    context.facts.extend(facts);

                    let intent = context.intent.clone().unwrap_or_default();
                    let missing: Vec<String> = required_fields(&intent)
                        .iter()
                        .filter(|field| !context.facts.contains_key(**field))
                        .map(|field| field.to_string())
                        .collect();
                    context.record_missing_fields(missing);
                    TurnStage::AgentRouting
                }

                TurnStage::AgentRouting => {
                    self.enrich_tenant_context(conversation).await;
                    let selection = self.route(conversation);
                    state.record_confidence(TurnStage::AgentRouting, selection.confidence);
                    conversation.record_handler(selection.handler.clone());
                    conversation.context_mut().record_routing(
                        selection.handler,
                        selection.confidence,
                        selection.fallback,
                    );
                    TurnStage::Processing
                }

                TurnStage::Processing => {
                    match self.invoke_backend(conversation, user_message, cancellation).await? {
                        Ok(agent_response) => {
                            state.record_confidence(
                                TurnStage::Processing,
                                agent_response.confidence,
                            );
                            conversation.context_mut().handoff_requested =
                                agent_response.handoff_requested;
                            response = Some(agent_response);
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "processing failed");
                            state.flag_error(err.to_string());
                        }
                    }

                    // The single conditional edge of the pipeline.
                    if state.should_recover(self.config.confidence_floor) {
                        TurnStage::ErrorRecovery
                    } else {
                        TurnStage::Confirmation
                    }
                }

                TurnStage::Confirmation => {
                    let context = conversation.context_mut();
                    let transactional = matches!(
                        context.intent.as_deref(),
                        Some("booking" | "order" | "appointment")
                    );
                    context.needs_confirmation = transactional || context.handoff_requested;
                    TurnStage::WorkflowTrigger
                }

                TurnStage::ErrorRecovery => {
                    if state.recovery_loops() >= self.config.max_recovery_loops {
                        let last_error = state
                            .error()
                            .unwrap_or("confidence below floor")
                            .to_string();
                        tracing::warn!(
                            loops = state.recovery_loops(),
                            %last_error,
                            "in-turn recovery ceiling hit"
                        );
                        return Err(TurnError::RecoveryExhausted {
                            loops: state.recovery_loops(),
                            last_error,
                        });
                    }
                    conversation.context_mut().recovery_attempted_at = Some(Timestamp::now());
                    state.begin_recovery_loop();
                    response = None;
                    TurnStage::IntentDetection
                }

                TurnStage::WorkflowTrigger => {
                    workflow_id = self.maybe_start_workflow(conversation).await;
                    TurnStage::Completion
                }

                TurnStage::Completion => {
                    conversation.complete_turn();
                    let agent_response = response.take().unwrap_or_else(|| {
                        // Processing can be skipped only if confidence
                        // stayed above the floor with no backend output,
                        // which cannot happen on the normal path; answer
                        // defensively anyway.
                        AgentResponse::new("", 0.0, "none")
                    });
                    conversation.push_message(ConversationMessage::assistant(
                        agent_response.response_text.clone(),
                        agent_response.handler_used.clone(),
                        agent_response.confidence,
                    ));
                    return Ok(TurnOutcome {
                        response_text: agent_response.response_text,
                        handler_used: agent_response.handler_used,
                        turn_confidence: state.mean_confidence(),
                        recovered_in_turn: state.recovery_loops() > 0,
                        workflow_id,
                        needs_confirmation: conversation.context().needs_confirmation,
                    });
                }
            };

            // The recovery branch is forced by the driver; normal
            // progression must follow the pipeline topology.
            if next != TurnStage::ErrorRecovery {
                debug_assert!(
                    state.stage.can_transition_to(&next),
                    "stage {} cannot reach {}",
                    state.stage,
                    next
                );
            }
            state.stage = next;
        }
    }

    /// Best-effort tenant enrichment; failures degrade to no enrichment.
    async fn enrich_tenant_context(&self, conversation: &mut Conversation) {
        if conversation.context().tenant_enrichment.is_some() {
            return;
        }
        let Some(tenant_id) = conversation.tenant_id().cloned() else {
            return;
        };
        match self.tenants.get_profile(&tenant_id).await {
            Ok(profile) => {
                conversation.context_mut().tenant_enrichment = Some(TenantEnrichment {
                    name: profile.name,
                    category: profile.category,
                    booking_enabled: profile.booking_enabled,
                });
            }
            Err(err) => {
                tracing::debug!(%tenant_id, error = %err, "tenant lookup degraded");
            }
        }
    }

    fn route(&self, conversation: &mut Conversation) -> HandlerSelection {
        // A recovery strategy may have pinned the next handler.
        if let Some(forced) = conversation.context_mut().forced_handler.take() {
            tracing::debug!(handler = %forced, "routing to forced handler");
            return HandlerSelection {
                handler: forced,
                confidence: 0.7,
                fallback: super::routing::GENERAL_HANDLER.to_string(),
            };
        }

        let context = conversation.context();
        let intent = context.intent.clone().unwrap_or_default();
        let category = context
            .tenant_enrichment
            .as_ref()
            .map(|e| e.category.clone());
        select_handler(&intent, conversation.mode(), category.as_deref())
    }

    /// Invokes the agent backend under the configured timeout, racing the
    /// cancellation flag. The outer error is cancellation; the inner
    /// result is the backend outcome fed into the recover edge.
    async fn invoke_backend(
        &self,
        conversation: &Conversation,
        user_message: &str,
        cancellation: &TurnCancellation,
    ) -> Result<Result<AgentResponse, AgentError>, TurnError> {
        let handler = conversation
            .context()
            .selected_handler
            .clone()
            .unwrap_or_else(|| super::routing::GENERAL_HANDLER.to_string());

        let mut request = AgentRequest::new(
            conversation.id(),
            handler,
            user_message,
            conversation.context().clone(),
        );
        if let Some(user) = conversation.end_user_id() {
            request = request.with_end_user(user.clone());
        }

        let deadline = Duration::from_secs(self.config.processing_timeout_secs);
        tokio::select! {
            _ = cancellation.cancelled() => Err(TurnError::Cancelled),
            invoked = timeout(deadline, self.backend.invoke(request)) => Ok(match invoked {
                Ok(result) => result,
                Err(_elapsed) => Err(AgentError::Timeout {
                    timeout_secs: self.config.processing_timeout_secs,
                }),
            }),
        }
    }

    /// Starts a workflow when the intent maps to one. Trigger failures
    /// degrade: the turn completes without a workflow.
    async fn maybe_start_workflow(&self, conversation: &mut Conversation) -> Option<WorkflowId> {
        let context = conversation.context();
        if context.workflow_triggered {
            return context.workflow_id.clone();
        }
        let intent = context.intent.clone().unwrap_or_default();
        let kind = workflow_for(context.requires_scheduling, &intent)?;

        let payload = serde_json::json!({
            "intent": intent,
            "facts": &context.facts,
            "tenant_id": conversation.tenant_id().map(|t| t.as_str()),
            "end_user_id": conversation.end_user_id().map(|u| u.as_str()),
        });

        match self
            .workflows
            .start(kind, payload, conversation.id())
            .await
        {
            Ok(id) => {
                let context = conversation.context_mut();
                context.workflow_triggered = true;
                context.workflow_id = Some(id.clone());
                tracing::info!(workflow = %kind, workflow_id = %id, "workflow started");
                Some(id)
            }
            Err(err) => {
                tracing::warn!(workflow = %kind, error = %err, "workflow trigger degraded");
                None
            }
        }
    }
}
