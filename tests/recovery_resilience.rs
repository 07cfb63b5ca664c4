//! Recovery and resilience scenarios against the assembled orchestrator.

use std::sync::Arc;

use switchboard::adapters::memory::{
    InMemoryConversationStore, MockAgentBackend, RecordingWorkflowTrigger, StaticTenantDirectory,
};
use switchboard::application::handlers::{HandleTurnCommand, OrchestrationError, TurnStatus};
use switchboard::application::Orchestrator;
use switchboard::config::OrchestratorConfig;
use switchboard::domain::flow::FlowRequest;
use switchboard::domain::recovery::RecoveryStrategy;
use switchboard::domain::resilience::HealthStatus;
use switchboard::domain::turn::TurnCancellation;
use switchboard::ports::{AgentError, ConversationStore};

fn orchestrator(backend: MockAgentBackend) -> (Orchestrator, Arc<InMemoryConversationStore>) {
    let store = Arc::new(InMemoryConversationStore::new());
    let orchestrator = Orchestrator::new(
        Arc::new(backend),
        store.clone(),
        Arc::new(StaticTenantDirectory::new()),
        Arc::new(RecordingWorkflowTrigger::new()),
        OrchestratorConfig::default(),
    );
    (orchestrator, store)
}

fn command(message: &str) -> HandleTurnCommand {
    HandleTurnCommand {
        request: FlowRequest {
            message: message.into(),
            ..FlowRequest::default()
        },
        conversation_id: None,
        end_user_id: None,
    }
}

#[tokio::test(start_paused = true)]
async fn repeated_timeouts_recover_with_a_same_handler_retry() {
    // The engine burns through its in-turn loops, then the selector's
    // backoff-and-retry lands the reply.
    let backend = MockAgentBackend::new()
        .with_error(AgentError::Timeout { timeout_secs: 30 })
        .with_error(AgentError::Timeout { timeout_secs: 30 })
        .with_error(AgentError::Timeout { timeout_secs: 30 })
        .with_response("back on track", 0.8);
    let (orchestrator, _) = orchestrator(backend);

    let result = orchestrator
        .handle_turn(command("hello there"), &TurnCancellation::new())
        .await
        .unwrap();

    assert_eq!(result.status, TurnStatus::Recovered);
    assert_eq!(
        result.recovery_strategy,
        Some(RecoveryStrategy::RetrySameHandler)
    );
    assert_eq!(result.response_text, "back on track");

    let history = orchestrator.get_recovery_history(result.conversation_id);
    assert_eq!(history.len(), 1);
    assert!(history[0].success);
    assert!(history[0].error_text.contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn attempt_cap_forces_a_new_conversation_even_for_timeouts() {
    // Backend never responds; every turn fails, every recovery fails,
    // until the windowed cap flips the selector to replacement.
    let (orchestrator, store) = orchestrator(MockAgentBackend::new());

    let first = orchestrator
        .handle_turn(command("hello"), &TurnCancellation::new())
        .await
        .unwrap();
    let conversation_id = first.conversation_id;
    assert_eq!(first.status, TurnStatus::Error);

    let mut last = first;
    for _ in 0..3 {
        let mut cmd = command("hello again");
        cmd.conversation_id = Some(conversation_id);
        last = orchestrator
            .handle_turn(cmd, &TurnCancellation::new())
            .await
            .unwrap();
        if last.new_conversation_id.is_some() {
            break;
        }
    }

    assert_eq!(
        last.recovery_strategy,
        Some(RecoveryStrategy::StartNewConversation)
    );
    assert_eq!(last.status, TurnStatus::Recovered);
    let new_id = last.new_conversation_id.unwrap();
    assert_ne!(new_id, conversation_id);

    let old = store.load(conversation_id).await.unwrap().unwrap();
    assert!(old.is_ended());
    assert_eq!(old.transferred_to(), Some(new_id));

    let history = orchestrator.get_recovery_history(conversation_id);
    assert!(history.len() >= 3);
    assert_eq!(
        history.last().unwrap().strategy,
        RecoveryStrategy::StartNewConversation
    );
}

#[tokio::test(start_paused = true)]
async fn backend_faults_switch_to_the_fallback_handler() {
    let backend = MockAgentBackend::new()
        .with_error(AgentError::Backend("model crashed".into()))
        .with_error(AgentError::Backend("model crashed".into()))
        .with_error(AgentError::Backend("model crashed".into()))
        .with_response("fallback took over", 0.7);
    let (orchestrator, store) = orchestrator(backend);

    let result = orchestrator
        .handle_turn(command("book a table for 4 tonight"), &TurnCancellation::new())
        .await
        .unwrap();

    assert_eq!(result.status, TurnStatus::Recovered);
    assert_eq!(
        result.recovery_strategy,
        Some(RecoveryStrategy::SwitchToFallbackHandler)
    );

    let saved = store.load(result.conversation_id).await.unwrap().unwrap();
    assert_eq!(
        saved.agent_history().last().map(String::as_str),
        Some("general_handler")
    );
}

#[tokio::test(start_paused = true)]
async fn sustained_failures_open_the_circuit_and_deny_admission() {
    let (orchestrator, _) = orchestrator(MockAgentBackend::new());

    let mut denied = false;
    for _ in 0..10 {
        match orchestrator
            .handle_turn(command("hello"), &TurnCancellation::new())
            .await
        {
            Ok(result) => assert_eq!(result.status, TurnStatus::Error),
            Err(OrchestrationError::AdmissionDenied) => {
                denied = true;
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(denied, "circuit never opened");

    let health = orchestrator.get_system_health().await;
    assert_eq!(health.status, HealthStatus::CircuitBreaker);

    // Still denied: the probe timeout has not elapsed.
    let err = orchestrator
        .handle_turn(command("hello"), &TurnCancellation::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::AdmissionDenied));
}

#[tokio::test]
async fn health_reports_healthy_before_any_failures() {
    let (orchestrator, _) = orchestrator(MockAgentBackend::new().with_response("ok", 0.9));

    orchestrator
        .handle_turn(command("hello"), &TurnCancellation::new())
        .await
        .unwrap();

    let health = orchestrator.get_system_health().await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.windowed_errors, 0);
    assert_eq!(health.active_turns, 0);
}
