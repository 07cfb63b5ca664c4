//! Recording workflow trigger for tests and local development.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{ConversationId, WorkflowId};
use crate::ports::{WorkflowError, WorkflowKind, WorkflowTrigger};

/// One recorded workflow start.
#[derive(Debug, Clone)]
pub struct StartedWorkflow {
    pub id: WorkflowId,
    pub kind: WorkflowKind,
    pub payload: serde_json::Value,
    pub correlation_id: ConversationId,
}

/// Trigger that records starts and mints sequential workflow ids.
#[derive(Default)]
pub struct RecordingWorkflowTrigger {
    started: Mutex<Vec<StartedWorkflow>>,
    next_seq: AtomicU64,
    fail: AtomicBool,
}

impl RecordingWorkflowTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every start fail as unavailable.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Workflow starts recorded so far, in order.
    pub async fn started(&self) -> Vec<StartedWorkflow> {
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl WorkflowTrigger for RecordingWorkflowTrigger {
    async fn start(
        &self,
        kind: WorkflowKind,
        payload: serde_json::Value,
        correlation_id: ConversationId,
    ) -> Result<WorkflowId, WorkflowError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WorkflowError::Unavailable("trigger disabled".into()));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let id = WorkflowId::new(format!("wf-{kind}-{seq}"));
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(StartedWorkflow {
                id: id.clone(),
                kind,
                payload,
                correlation_id,
            });
        Ok(id)
    }
}
