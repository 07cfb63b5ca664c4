//! Command and query handlers, one file per operation.

mod get_recovery_history;
mod get_system_health;
mod handle_turn;

pub use get_recovery_history::GetRecoveryHistoryHandler;
pub use get_system_health::GetSystemHealthHandler;
pub use handle_turn::{
    HandleTurnCommand, HandleTurnHandler, HandleTurnResult, OrchestrationError, TurnStatus,
};
