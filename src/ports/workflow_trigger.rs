//! Workflow Trigger Port - Interface for starting long-running business
//! workflows (appointment or order processing).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ConversationId, WorkflowId};

/// The workflow kinds a turn can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Appointment or booking processing.
    Appointment,
    /// Order processing.
    Order,
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Appointment => f.write_str("appointment"),
            Self::Order => f.write_str("order"),
        }
    }
}

/// Workflow engine failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow engine rejected {kind} payload: {detail}")]
    Rejected {
        kind: WorkflowKind,
        detail: String,
    },

    #[error("workflow engine unavailable: {0}")]
    Unavailable(String),
}

/// Port for starting workflows.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Starts a workflow of the given kind with a serialized payload,
    /// correlated to the conversation that produced it.
    async fn start(
        &self,
        kind: WorkflowKind,
        payload: serde_json::Value,
        correlation_id: ConversationId,
    ) -> Result<WorkflowId, WorkflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_displays_snake_case() {
        assert_eq!(WorkflowKind::Appointment.to_string(), "appointment");
        assert_eq!(WorkflowKind::Order.to_string(), "order");
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&WorkflowKind::Appointment).unwrap(),
            "\"appointment\""
        );
    }
}
