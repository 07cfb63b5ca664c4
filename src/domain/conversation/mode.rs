//! Conversation modes.
//!
//! A conversation's mode is fixed at creation and never changes; recovery
//! may replace a conversation entirely but never reclassifies an existing
//! one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three conversation modes a request can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Customer talking to one tenant's assistant.
    SingleTenant,

    /// Tenant staff managing their own business (dashboards, settings).
    Management,

    /// Cross-tenant discovery and comparison for users without a tenant
    /// affiliation.
    MultiTenant,
}

impl ConversationMode {
    /// Human-readable label, suitable for response metadata.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SingleTenant => "single_tenant",
            Self::Management => "management",
            Self::MultiTenant => "multi_tenant",
        }
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ConversationMode {
    type Err = ();

    /// Parses an explicit mode tag. Accepts the canonical snake_case tags
    /// plus the "discovery" alias callers use for multi-tenant mode.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single_tenant" | "single-tenant" => Ok(Self::SingleTenant),
            "management" => Ok(Self::Management),
            "multi_tenant" | "multi-tenant" | "discovery" => Ok(Self::MultiTenant),
            _ => Err(()),
        }
    }
}
