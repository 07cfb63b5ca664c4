//! Failure recovery: strategy classification and bounded execution.
//!
//! When a turn exhausts its in-pipeline recovery loop, the failure lands
//! here. The selector classifies the error text, executes exactly one
//! strategy, and records the attempt. It never cascades strategies.

mod attempt;
mod selector;
mod strategy;

pub use attempt::{RecoveryAttempt, RecoveryHistory};
pub use selector::{RecoveryError, RecoveryOutcome, RecoverySelector};
pub use strategy::RecoveryStrategy;
