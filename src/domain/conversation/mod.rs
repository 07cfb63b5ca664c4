//! Conversation aggregate and its value objects.

mod context;
mod conversation;
mod message;
mod mode;

pub use context::{ConversationContext, TenantEnrichment};
pub use conversation::{Conversation, Escalation};
pub use message::{ConversationMessage, MessageRole};
pub use mode::ConversationMode;
