//! The per-turn stage pipeline.
//!
//! A turn drives one user message through a fixed sequence of stages,
//! with a single conditional branch after processing into error recovery.

mod engine;
mod intent;
mod routing;
mod stage;
mod state;

pub use engine::{TurnCancellation, TurnEngine, TurnError, TurnOutcome};
pub use intent::{detect_intent, extract_facts, required_fields, workflow_for, IntentSignal};
pub use routing::{select_handler, HandlerSelection};
pub use stage::TurnStage;
pub use state::TurnState;
