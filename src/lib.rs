//! Switchboard - Multi-Tenant Conversational Orchestration Core
//!
//! This crate implements the deterministic control logic of a multi-tenant
//! conversational assistant platform: flow classification, the per-turn
//! stage pipeline, failure recovery, and system-wide resilience guarding.
//!
//! The transport layer, the language-model backend, persistent storage and
//! business workflows live outside this crate, behind the traits in
//! [`ports`].

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
