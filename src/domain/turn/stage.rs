//! Turn pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// The stages of one conversational turn, in fixed order.
///
/// The only conditional edge leaves `Processing`: `Confirmation` on the
/// normal path, `ErrorRecovery` on failure. `ErrorRecovery` always loops
/// back to `IntentDetection`. `Completion` is terminal for the turn; the
/// conversation itself persists across turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    /// Greets the user on the conversation's first turn.
    Greeting,
    /// Detects intent, confidence, scheduling need and category.
    IntentDetection,
    /// Diffs required fields for the intent against known facts.
    InformationGathering,
    /// Selects the handler that will answer.
    AgentRouting,
    /// Invokes the agent backend. The only stage that can fail.
    Processing,
    /// Decides whether the outcome needs user confirmation.
    Confirmation,
    /// Error exit from processing; loops back to intent detection.
    ErrorRecovery,
    /// Starts a business workflow when one applies.
    WorkflowTrigger,
    /// Finalizes the turn and computes turn-level confidence.
    Completion,
}

impl StateMachine for TurnStage {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TurnStage::*;
        match self {
            Greeting => vec![IntentDetection],
            IntentDetection => vec![InformationGathering],
            InformationGathering => vec![AgentRouting],
            AgentRouting => vec![Processing],
            Processing => vec![Confirmation, ErrorRecovery],
            Confirmation => vec![WorkflowTrigger],
            ErrorRecovery => vec![IntentDetection],
            WorkflowTrigger => vec![Completion],
            Completion => vec![],
        }
    }
}

impl TurnStage {
    /// The entry stage of every turn.
    pub fn entry() -> Self {
        Self::Greeting
    }

    /// Short label for logs and message metadata.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::IntentDetection => "intent_detection",
            Self::InformationGathering => "information_gathering",
            Self::AgentRouting => "agent_routing",
            Self::Processing => "processing",
            Self::Confirmation => "confirmation",
            Self::ErrorRecovery => "error_recovery",
            Self::WorkflowTrigger => "workflow_trigger",
            Self::Completion => "completion",
        }
    }
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_path_is_linear() {
        use TurnStage::*;
        assert_eq!(Greeting.valid_transitions(), vec![IntentDetection]);
        assert_eq!(IntentDetection.valid_transitions(), vec![InformationGathering]);
        assert_eq!(InformationGathering.valid_transitions(), vec![AgentRouting]);
        assert_eq!(AgentRouting.valid_transitions(), vec![Processing]);
        assert_eq!(Confirmation.valid_transitions(), vec![WorkflowTrigger]);
        assert_eq!(WorkflowTrigger.valid_transitions(), vec![Completion]);
    }

    #[test]
    fn processing_is_the_only_branch_point() {
        use TurnStage::*;
        assert_eq!(Processing.valid_transitions(), vec![Confirmation, ErrorRecovery]);
        for stage in [
            Greeting,
            IntentDetection,
            InformationGathering,
            AgentRouting,
            Confirmation,
            ErrorRecovery,
            WorkflowTrigger,
        ] {
            assert_eq!(stage.valid_transitions().len(), 1, "{stage} should be linear");
        }
    }

    #[test]
    fn error_recovery_loops_to_intent_detection() {
        assert!(TurnStage::ErrorRecovery.can_transition_to(&TurnStage::IntentDetection));
        assert!(!TurnStage::ErrorRecovery.can_transition_to(&TurnStage::Processing));
    }

    #[test]
    fn completion_is_terminal() {
        assert!(TurnStage::Completion.is_terminal());
        assert!(!TurnStage::Processing.is_terminal());
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let err = TurnStage::Greeting
            .transition_to(TurnStage::Completion)
            .unwrap_err();
        assert_eq!(err.from, "Greeting");
    }

    #[test]
    fn serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&TurnStage::IntentDetection).unwrap(),
            "\"intent_detection\""
        );
    }
}
