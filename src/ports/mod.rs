//! Ports - traits for the fallible external collaborators.
//!
//! The orchestration core never holds collaborator connection state
//! directly; everything external sits behind these narrow interfaces.

mod agent_backend;
mod conversation_store;
mod tenant_directory;
mod workflow_trigger;

pub use agent_backend::{AgentBackend, AgentError, AgentRequest, AgentResponse};
pub use conversation_store::{ConversationStore, StoreError, StoreHealth};
pub use tenant_directory::{TenantDirectory, TenantError, TenantProfile};
pub use workflow_trigger::{WorkflowError, WorkflowKind, WorkflowTrigger};
