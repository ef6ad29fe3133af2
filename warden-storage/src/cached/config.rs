//! Cache-backed configuration backend.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{EntitlementResult, TenantId};

use crate::backend::ConfigBackend;
use crate::cache::StoreCaches;

const ALGORITHM_ENTRY: &str = "policy_combining_algorithm";

pub struct CachedConfigBackend {
    inner: Arc<dyn ConfigBackend>,
    caches: Arc<StoreCaches>,
}

impl CachedConfigBackend {
    pub fn new(inner: Arc<dyn ConfigBackend>, caches: Arc<StoreCaches>) -> Self {
        Self { inner, caches }
    }
}

#[async_trait]
impl ConfigBackend for CachedConfigBackend {
    async fn get_policy_combining_algorithm(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Option<String>> {
        if let Some(cached) = self.caches.config.get(ALGORITHM_ENTRY, tenant).await {
            return Ok(cached);
        }
        let generation = self.caches.config.generation(tenant);
        let algorithm = self.inner.get_policy_combining_algorithm(tenant).await?;
        self.caches
            .config
            .populate(ALGORITHM_ENTRY, tenant, generation, &algorithm)
            .await?;
        Ok(algorithm)
    }

    async fn insert_policy_combining_algorithm(
        &self,
        algorithm: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.inner
            .insert_policy_combining_algorithm(algorithm, tenant)
            .await?;
        self.caches
            .config
            .put(ALGORITHM_ENTRY, tenant, &Some(algorithm.to_string()))
            .await
    }

    async fn update_policy_combining_algorithm(
        &self,
        algorithm: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.inner
            .update_policy_combining_algorithm(algorithm, tenant)
            .await?;
        self.caches
            .config
            .put(ALGORITHM_ENTRY, tenant, &Some(algorithm.to_string()))
            .await
    }
}
