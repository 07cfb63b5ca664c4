//! Static tenant directory backed by a map of seeded profiles.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::TenantId;
use crate::ports::{TenantDirectory, TenantError, TenantProfile};

/// Directory seeded at construction time. Lookups for unknown tenants
/// fail with `NotFound`, which the turn engine degrades to no
/// enrichment.
#[derive(Default)]
pub struct StaticTenantDirectory {
    profiles: Mutex<HashMap<TenantId, TenantProfile>>,
}

impl StaticTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, tenant_id: TenantId, profile: TenantProfile) -> Self {
        self.profiles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tenant_id, profile);
        self
    }

    pub fn insert(&self, tenant_id: TenantId, profile: TenantProfile) {
        self.profiles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tenant_id, profile);
    }
}

#[async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn get_profile(&self, tenant_id: &TenantId) -> Result<TenantProfile, TenantError> {
        self.profiles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| TenantError::NotFound(tenant_id.clone()))
    }
}
