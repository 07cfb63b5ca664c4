//! In-memory adapters.
//!
//! The store and tenant directory are production-usable for single-node
//! deployments; the agent backend and workflow trigger are scripted test
//! doubles with failure injection.

mod agent_backend;
mod conversation_store;
mod tenant_directory;
mod workflow_trigger;

pub use agent_backend::MockAgentBackend;
pub use conversation_store::InMemoryConversationStore;
pub use tenant_directory::StaticTenantDirectory;
pub use workflow_trigger::{RecordingWorkflowTrigger, StartedWorkflow};
