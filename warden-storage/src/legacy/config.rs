//! Legacy configuration store. The algorithm is a property of the PDP root.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{EntitlementError, EntitlementResult, TenantId};

use crate::resource::{Resource, ResourceStore, PDP_POLICY_ROOT, POLICY_COMBINING_ALGORITHM_PROPERTY};
use crate::store::ConfigStore;

pub struct LegacyConfigStore {
    resources: Arc<dyn ResourceStore>,
}

impl LegacyConfigStore {
    pub fn new(resources: Arc<dyn ResourceStore>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl ConfigStore for LegacyConfigStore {
    async fn get_global_policy_algorithm_name(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Option<String>> {
        let root = self.resources.get(PDP_POLICY_ROOT, tenant).await?;
        Ok(root
            .as_ref()
            .and_then(|r| r.property(POLICY_COMBINING_ALGORITHM_PROPERTY))
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string))
    }

    async fn set_global_policy_algorithm(
        &self,
        name: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        if name.trim().is_empty() {
            return Err(EntitlementError::new("policy combining algorithm must not be empty"));
        }
        let mut root = self
            .resources
            .get(PDP_POLICY_ROOT, tenant)
            .await?
            .unwrap_or_else(Resource::new);
        root.set_property(POLICY_COMBINING_ALGORITHM_PROPERTY, name);
        self.resources.put(PDP_POLICY_ROOT, root, tenant).await
    }

    async fn delete_global_policy_algorithm(&self, tenant: TenantId) -> EntitlementResult<()> {
        let Some(mut root) = self.resources.get(PDP_POLICY_ROOT, tenant).await? else {
            return Ok(());
        };
        if root.remove_property(POLICY_COMBINING_ALGORITHM_PROPERTY) {
            self.resources.put(PDP_POLICY_ROOT, root, tenant).await?;
        }
        Ok(())
    }
}
