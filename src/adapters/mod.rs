//! Adapter implementations of the outbound ports.

pub mod memory;
