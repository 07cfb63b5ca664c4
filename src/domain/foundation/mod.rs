//! Foundation value objects shared across the domain.

mod ids;
mod state_machine;
mod timestamp;

pub use ids::{ConversationId, EndUserId, TenantId, WorkflowId};
pub use state_machine::{StateMachine, TransitionError};
pub use timestamp::Timestamp;
