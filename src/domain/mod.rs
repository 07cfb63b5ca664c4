//! Domain layer - pure orchestration logic.
//!
//! No I/O happens here except through the port traits injected into the
//! turn engine and recovery selector.

pub mod conversation;
pub mod flow;
pub mod foundation;
pub mod recovery;
pub mod resilience;
pub mod turn;
