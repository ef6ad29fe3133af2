//! Hybrid configuration store.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{EntitlementResult, TenantId};

use crate::store::ConfigStore;

pub struct HybridConfigStore<P: ?Sized, S: ?Sized> {
    primary: Arc<P>,
    secondary: Arc<S>,
}

impl<P, S> HybridConfigStore<P, S>
where
    P: ConfigStore + ?Sized,
    S: ConfigStore + ?Sized,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>) -> Self {
        Self { primary, secondary }
    }

    /// Drop the legacy copy once the primary holds the value. Failures only
    /// leave a shadowed value behind, so they are logged.
    async fn clear_legacy(&self, tenant: TenantId) {
        if let Err(e) = self.secondary.delete_global_policy_algorithm(tenant).await {
            tracing::warn!(
                tenant = %tenant,
                error = %e,
                "failed to remove legacy policy combining algorithm"
            );
        }
    }
}

#[async_trait]
impl<P, S> ConfigStore for HybridConfigStore<P, S>
where
    P: ConfigStore + ?Sized,
    S: ConfigStore + ?Sized,
{
    async fn get_global_policy_algorithm_name(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Option<String>> {
        match self.primary.get_global_policy_algorithm_name(tenant).await? {
            Some(name) if !name.trim().is_empty() => Ok(Some(name)),
            _ => self.secondary.get_global_policy_algorithm_name(tenant).await,
        }
    }

    async fn set_global_policy_algorithm(
        &self,
        name: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.primary.set_global_policy_algorithm(name, tenant).await?;
        self.clear_legacy(tenant).await;
        Ok(())
    }

    async fn delete_global_policy_algorithm(&self, tenant: TenantId) -> EntitlementResult<()> {
        self.primary.delete_global_policy_algorithm(tenant).await
    }
}
