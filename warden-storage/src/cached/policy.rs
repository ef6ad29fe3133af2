//! Cache-backed policy backend.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{EntitlementResult, PolicyRecord, PublishedPolicy, TenantId};

use crate::backend::PolicyBackend;
use crate::cache::{StoreCaches, LIST_ENTRY};

/// Wraps a [`PolicyBackend`] with the PAP and PDP cache regions.
pub struct CachedPolicyBackend {
    inner: Arc<dyn PolicyBackend>,
    caches: Arc<StoreCaches>,
}

impl CachedPolicyBackend {
    pub fn new(inner: Arc<dyn PolicyBackend>, caches: Arc<StoreCaches>) -> Self {
        Self { inner, caches }
    }

    async fn invalidate_pap(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.caches.pap_policy.invalidate(policy_id, tenant).await?;
        self.caches.pap_policy_list.invalidate(LIST_ENTRY, tenant).await
    }

    async fn invalidate_pdp_list(&self, tenant: TenantId) -> EntitlementResult<()> {
        self.caches.pdp_policy_list.invalidate(LIST_ENTRY, tenant).await
    }
}

#[async_trait]
impl PolicyBackend for CachedPolicyBackend {
    async fn insert_policy(&self, policy: &PolicyRecord, tenant: TenantId) -> EntitlementResult<()> {
        self.inner.insert_policy(policy, tenant).await?;
        self.caches
            .pap_policy
            .put(&policy.policy_id, tenant, &Some(policy.clone()))
            .await?;
        self.caches.pap_policy_list.invalidate(LIST_ENTRY, tenant).await
    }

    async fn replace_policy(&self, policy: &PolicyRecord, tenant: TenantId) -> EntitlementResult<()> {
        self.inner.replace_policy(policy, tenant).await?;
        self.caches
            .pap_policy
            .put(&policy.policy_id, tenant, &Some(policy.clone()))
            .await?;
        self.caches.pap_policy_list.invalidate(LIST_ENTRY, tenant).await
    }

    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        if let Some(cached) = self.caches.pap_policy.get(policy_id, tenant).await {
            return Ok(cached);
        }
        let generation = self.caches.pap_policy.generation(tenant);
        let policy = self.inner.get_pap_policy(policy_id, tenant).await?;
        self.caches
            .pap_policy
            .populate(policy_id, tenant, generation, &policy)
            .await?;
        Ok(policy)
    }

    async fn get_policy_version(
        &self,
        policy_id: &str,
        version: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        self.inner.get_policy_version(policy_id, version, tenant).await
    }

    async fn get_all_pap_policies(&self, tenant: TenantId) -> EntitlementResult<Vec<PolicyRecord>> {
        if let Some(cached) = self.caches.pap_policy_list.get(LIST_ENTRY, tenant).await {
            return Ok(cached);
        }
        let generation = self.caches.pap_policy_list.generation(tenant);
        let policies = self.inner.get_all_pap_policies(tenant).await?;
        self.caches
            .pap_policy_list
            .populate(LIST_ENTRY, tenant, generation, &policies)
            .await?;
        Ok(policies)
    }

    async fn get_versions(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        self.inner.get_versions(policy_id, tenant).await
    }

    async fn delete_pap_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        let deleted = self.inner.delete_pap_policy(policy_id, tenant).await?;
        self.invalidate_pap(policy_id, tenant).await?;
        Ok(deleted)
    }

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        if let Some(cached) = self.caches.pap_policy.get(policy_id, tenant).await {
            return Ok(cached.is_some());
        }
        self.inner.exists(policy_id, tenant).await
    }

    async fn get_pdp_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>> {
        if let Some(cached) = self.caches.pdp_policy.get(policy_id, tenant).await {
            return Ok(cached);
        }
        let generation = self.caches.pdp_policy.generation(tenant);
        let policy = self.inner.get_pdp_policy(policy_id, tenant).await?;
        self.caches
            .pdp_policy
            .populate(policy_id, tenant, generation, &policy)
            .await?;
        Ok(policy)
    }

    async fn get_all_pdp_policies(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<PublishedPolicy>> {
        if let Some(cached) = self.caches.pdp_policy_list.get(LIST_ENTRY, tenant).await {
            return Ok(cached);
        }
        let generation = self.caches.pdp_policy_list.generation(tenant);
        let policies = self.inner.get_all_pdp_policies(tenant).await?;
        self.caches
            .pdp_policy_list
            .populate(LIST_ENTRY, tenant, generation, &policies)
            .await?;
        Ok(policies)
    }

    async fn publish_policy(
        &self,
        policy: &PublishedPolicy,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.inner.publish_policy(policy, tenant).await?;
        self.caches
            .pdp_policy
            .put(&policy.policy_id, tenant, &Some(policy.clone()))
            .await?;
        self.invalidate_pdp_list(tenant).await?;
        // Publishing flips the published flag on the PAP rows.
        self.invalidate_pap(&policy.policy_id, tenant).await
    }

    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        let removed = self.inner.unpublish_policy(policy_id, tenant).await?;
        self.caches.pdp_policy.invalidate(policy_id, tenant).await?;
        self.invalidate_pdp_list(tenant).await?;
        self.invalidate_pap(policy_id, tenant).await?;
        Ok(removed)
    }
}
