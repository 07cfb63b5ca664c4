//! Application layer - command handlers and the orchestrator facade.

pub mod handlers;
mod locks;
mod orchestrator;

pub use locks::ConversationLocks;
pub use orchestrator::Orchestrator;
