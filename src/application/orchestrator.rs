//! The orchestrator facade: wires the core once at startup.
//!
//! Every collaborator is injected explicitly; there are no module-level
//! singletons. A transport layer (HTTP, queue consumer, ...) holds one
//! `Orchestrator` and calls its three operations.

use std::sync::Arc;

use crate::application::handlers::{
    GetRecoveryHistoryHandler, GetSystemHealthHandler, HandleTurnCommand, HandleTurnHandler,
    HandleTurnResult, OrchestrationError,
};
use crate::application::ConversationLocks;
use crate::config::OrchestratorConfig;
use crate::domain::flow::FlowClassifier;
use crate::domain::foundation::ConversationId;
use crate::domain::recovery::{RecoveryAttempt, RecoverySelector};
use crate::domain::resilience::{ResilienceGuard, SystemHealth};
use crate::domain::turn::{TurnCancellation, TurnEngine};
use crate::ports::{AgentBackend, ConversationStore, TenantDirectory, WorkflowTrigger};

/// The assembled orchestration core.
pub struct Orchestrator {
    handle_turn: HandleTurnHandler,
    get_system_health: GetSystemHealthHandler,
    get_recovery_history: GetRecoveryHistoryHandler,
}

impl Orchestrator {
    /// Builds the core from its four external collaborators and a
    /// validated configuration.
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        store: Arc<dyn ConversationStore>,
        tenants: Arc<dyn TenantDirectory>,
        workflows: Arc<dyn WorkflowTrigger>,
        config: OrchestratorConfig,
    ) -> Self {
        let guard = ResilienceGuard::new(config.resilience.clone());
        let engine = Arc::new(TurnEngine::new(
            backend.clone(),
            tenants,
            workflows,
            config.pipeline.clone(),
        ));
        let selector = Arc::new(RecoverySelector::new(
            backend,
            store.clone(),
            config.recovery.clone(),
        ));
        let history = selector.history();

        let handle_turn = HandleTurnHandler::new(
            FlowClassifier::new(),
            engine,
            selector,
            guard.clone(),
            store.clone(),
            Arc::new(ConversationLocks::new()),
            &config,
        );
        let get_system_health = GetSystemHealthHandler::new(guard, store);
        let get_recovery_history = GetRecoveryHistoryHandler::new(history);

        Self {
            handle_turn,
            get_system_health,
            get_recovery_history,
        }
    }

    /// Runs one conversational turn.
    pub async fn handle_turn(
        &self,
        cmd: HandleTurnCommand,
        cancellation: &TurnCancellation,
    ) -> Result<HandleTurnResult, OrchestrationError> {
        self.handle_turn.handle(cmd, cancellation).await
    }

    /// Reports system health, probing the circuit when due.
    pub async fn get_system_health(&self) -> SystemHealth {
        self.get_system_health.handle().await
    }

    /// Returns a conversation's recovery attempts, oldest first.
    pub fn get_recovery_history(&self, conversation_id: ConversationId) -> Vec<RecoveryAttempt> {
        self.get_recovery_history.handle(conversation_id)
    }
}
