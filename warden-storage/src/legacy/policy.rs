//! Legacy policy store.
//!
//! Layout:
//! - `policy/pap/{id}`: latest administration copy
//! - `policy/version/{id}/{version}`: every stored version
//! - `policy/pdp/{id}`: published copy

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use warden_core::{parse_version, EntitlementResult, PolicyRecord, PublishedPolicy, TenantId};

use super::{child_names, read_json};
use crate::relational::policy::next_version;
use crate::resource::{
    child_path, Resource, ResourceStore, PAP_POLICY_ROOT, PDP_POLICY_ROOT, POLICY_VERSION_ROOT,
};
use crate::store::PolicyStore;

pub struct LegacyPolicyStore {
    resources: Arc<dyn ResourceStore>,
}

impl LegacyPolicyStore {
    pub fn new(resources: Arc<dyn ResourceStore>) -> Self {
        Self { resources }
    }

    fn pap_path(policy_id: &str) -> String {
        child_path(PAP_POLICY_ROOT, policy_id)
    }

    fn versions_path(policy_id: &str) -> String {
        child_path(POLICY_VERSION_ROOT, policy_id)
    }

    fn pdp_path(policy_id: &str) -> String {
        child_path(PDP_POLICY_ROOT, policy_id)
    }

    async fn write_pap(&self, record: &PolicyRecord, tenant: TenantId) -> EntitlementResult<()> {
        self.resources
            .put(&Self::pap_path(&record.policy_id), Resource::from_json(record)?, tenant)
            .await
    }

    async fn set_published_flag(
        &self,
        policy_id: &str,
        published: bool,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        let current: Option<PolicyRecord> =
            read_json(self.resources.as_ref(), &Self::pap_path(policy_id), tenant).await?;
        match current {
            Some(mut record) if record.published != published => {
                record.published = published;
                self.write_pap(&record, tenant).await
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PolicyStore for LegacyPolicyStore {
    async fn add_or_update_policy(
        &self,
        policy: &PolicyRecord,
        enable_versioning: bool,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        let existing: Option<PolicyRecord> = read_json(
            self.resources.as_ref(),
            &Self::pap_path(&policy.policy_id),
            tenant,
        )
        .await?;

        let mut record = policy.clone();
        record.version = next_version(policy, existing.as_ref(), enable_versioning);
        record.last_modified_at = Utc::now();
        record.published = match (&existing, enable_versioning) {
            (Some(current), false) => current.published,
            _ => false,
        };

        let versions = Self::versions_path(&policy.policy_id);
        if !enable_versioning {
            self.resources.delete(&versions, tenant).await?;
        }
        self.resources
            .put(
                &child_path(&versions, &record.version),
                Resource::from_json(&record)?,
                tenant,
            )
            .await?;
        self.write_pap(&record, tenant).await
    }

    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        read_json(self.resources.as_ref(), &Self::pap_path(policy_id), tenant).await
    }

    async fn get_pap_policies(
        &self,
        policy_ids: &[String],
        tenant: TenantId,
    ) -> EntitlementResult<Vec<PolicyRecord>> {
        let ids = if policy_ids.is_empty() {
            self.list_policy_ids(tenant).await?
        } else {
            policy_ids.to_vec()
        };
        let mut policies = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(policy) = self.get_pap_policy(id, tenant).await? {
                policies.push(policy);
            }
        }
        Ok(policies)
    }

    async fn get_policy(
        &self,
        policy_id: &str,
        version: Option<&str>,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        let Some(version) = version.map(str::trim).filter(|v| !v.is_empty()) else {
            return self.get_pap_policy(policy_id, tenant).await;
        };
        let path = child_path(&Self::versions_path(policy_id), version);
        if let Some(record) = read_json(self.resources.as_ref(), &path, tenant).await? {
            return Ok(Some(record));
        }
        // Records written before versions were tracked only have the PAP copy.
        let latest = self.get_pap_policy(policy_id, tenant).await?;
        Ok(latest.filter(|p| parse_version(&p.version) == parse_version(version)))
    }

    async fn get_versions(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        let mut versions =
            child_names(self.resources.as_ref(), &Self::versions_path(policy_id), tenant).await?;
        if versions.is_empty() {
            if let Some(latest) = self.get_pap_policy(policy_id, tenant).await? {
                versions.push(latest.version);
            }
        }
        versions.sort_by_key(|v| parse_version(v));
        Ok(versions)
    }

    async fn list_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        child_names(self.resources.as_ref(), PAP_POLICY_ROOT, tenant).await
    }

    async fn remove_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.resources.delete(&Self::pap_path(policy_id), tenant).await?;
        self.resources
            .delete(&Self::versions_path(policy_id), tenant)
            .await
    }

    async fn publish_policy(
        &self,
        policy: &PublishedPolicy,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.resources
            .put(&Self::pdp_path(&policy.policy_id), Resource::from_json(policy)?, tenant)
            .await?;
        self.set_published_flag(&policy.policy_id, true, tenant).await
    }

    async fn is_published(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.resources.exists(&Self::pdp_path(policy_id), tenant).await
    }

    async fn get_published_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>> {
        read_json(self.resources.as_ref(), &Self::pdp_path(policy_id), tenant).await
    }

    async fn list_published_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        child_names(self.resources.as_ref(), PDP_POLICY_ROOT, tenant).await
    }

    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.resources.delete(&Self::pdp_path(policy_id), tenant).await?;
        self.set_published_flag(policy_id, false, tenant).await
    }

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.resources.exists(&Self::pap_path(policy_id), tenant).await
    }
}
