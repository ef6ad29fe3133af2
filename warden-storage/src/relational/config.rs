//! Relational configuration store.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{EntitlementError, EntitlementResult, TenantId};

use crate::backend::ConfigBackend;
use crate::store::ConfigStore;

pub struct RelationalConfigStore {
    backend: Arc<dyn ConfigBackend>,
}

impl RelationalConfigStore {
    pub fn new(backend: Arc<dyn ConfigBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ConfigStore for RelationalConfigStore {
    async fn get_global_policy_algorithm_name(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Option<String>> {
        let name = self.backend.get_policy_combining_algorithm(tenant).await?;
        Ok(name.filter(|n| !n.trim().is_empty()))
    }

    async fn set_global_policy_algorithm(
        &self,
        name: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        if name.trim().is_empty() {
            return Err(EntitlementError::new("policy combining algorithm must not be empty"));
        }
        let stored = self.backend.get_policy_combining_algorithm(tenant).await?;
        if stored.is_some() {
            self.backend.update_policy_combining_algorithm(name, tenant).await
        } else {
            self.backend.insert_policy_combining_algorithm(name, tenant).await
        }
    }

    /// The relational setting can only be replaced.
    async fn delete_global_policy_algorithm(&self, tenant: TenantId) -> EntitlementResult<()> {
        Err(EntitlementError::new(format!(
            "policy combining algorithm of tenant {tenant} cannot be deleted, only replaced"
        )))
    }
}
