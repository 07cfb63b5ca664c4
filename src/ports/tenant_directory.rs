//! Tenant Directory Port - Read-only business profile lookups.
//!
//! Lookup failures degrade to empty enrichment and never fail a turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::TenantId;

/// A tenant's business profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantProfile {
    /// Display name.
    pub name: String,
    /// Coarse business category ("restaurant", "clinic", ...).
    pub category: String,
    /// Opening hours, free-form lines.
    #[serde(default)]
    pub hours: Vec<String>,
    /// Services offered.
    #[serde(default)]
    pub services: Vec<String>,
    /// Contact details, free-form.
    #[serde(default)]
    pub contact: String,
    /// Whether the tenant accepts bookings.
    #[serde(default)]
    pub booking_enabled: bool,
}

/// Tenant directory failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TenantError {
    #[error("tenant not found: {0}")]
    NotFound(TenantId),

    #[error("tenant directory unavailable: {0}")]
    Unavailable(String),
}

/// Port for tenant profile lookups.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Fetches a tenant's profile.
    async fn get_profile(&self, tenant_id: &TenantId) -> Result<TenantProfile, TenantError>;
}
