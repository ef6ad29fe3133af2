//! Relational policy store with version management.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use warden_core::{EntitlementResult, PolicyRecord, PublishedPolicy, TenantId};

use crate::backend::PolicyBackend;
use crate::store::PolicyStore;

pub struct RelationalPolicyStore {
    backend: Arc<dyn PolicyBackend>,
}

impl RelationalPolicyStore {
    pub fn new(backend: Arc<dyn PolicyBackend>) -> Self {
        Self { backend }
    }
}

/// Version assigned to a write, given the currently stored latest copy.
pub(crate) fn next_version(
    incoming: &PolicyRecord,
    existing: Option<&PolicyRecord>,
    enable_versioning: bool,
) -> String {
    match (existing, enable_versioning) {
        (Some(current), true) => (current.version_number() + 1).to_string(),
        (Some(current), false) => current.version.clone(),
        (None, _) if incoming.version_number() > 0 => incoming.version_number().to_string(),
        (None, _) => "1".to_string(),
    }
}

#[async_trait]
impl PolicyStore for RelationalPolicyStore {
    async fn add_or_update_policy(
        &self,
        policy: &PolicyRecord,
        enable_versioning: bool,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        let existing = self.backend.get_pap_policy(&policy.policy_id, tenant).await?;

        let mut record = policy.clone();
        record.version = next_version(policy, existing.as_ref(), enable_versioning);
        record.last_modified_at = Utc::now();

        tracing::debug!(
            %tenant,
            policy_id = %record.policy_id,
            version = %record.version,
            "storing policy in relational store"
        );
        match existing {
            // Overwrite in place; the stored copy survives a failed write.
            Some(current) if !enable_versioning => {
                record.published = current.published;
                self.backend.replace_policy(&record, tenant).await
            }
            _ => {
                record.published = false;
                self.backend.insert_policy(&record, tenant).await
            }
        }
    }

    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        self.backend.get_pap_policy(policy_id, tenant).await
    }

    async fn get_pap_policies(
        &self,
        policy_ids: &[String],
        tenant: TenantId,
    ) -> EntitlementResult<Vec<PolicyRecord>> {
        if policy_ids.is_empty() {
            return self.backend.get_all_pap_policies(tenant).await;
        }
        let mut policies = Vec::with_capacity(policy_ids.len());
        for id in policy_ids {
            if let Some(policy) = self.backend.get_pap_policy(id, tenant).await? {
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
        match version.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => self.backend.get_policy_version(policy_id, v, tenant).await,
            None => self.backend.get_pap_policy(policy_id, tenant).await,
        }
    }

    async fn get_versions(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        self.backend.get_versions(policy_id, tenant).await
    }

    async fn list_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        let policies = self.backend.get_all_pap_policies(tenant).await?;
        Ok(policies.into_iter().map(|p| p.policy_id).collect())
    }

    async fn remove_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.backend.delete_pap_policy(policy_id, tenant).await?;
        Ok(())
    }

    async fn publish_policy(
        &self,
        policy: &PublishedPolicy,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.backend.publish_policy(policy, tenant).await
    }

    async fn is_published(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        Ok(self.backend.get_pdp_policy(policy_id, tenant).await?.is_some())
    }

    async fn get_published_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>> {
        self.backend.get_pdp_policy(policy_id, tenant).await
    }

    async fn list_published_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        let policies = self.backend.get_all_pdp_policies(tenant).await?;
        Ok(policies.into_iter().map(|p| p.policy_id).collect())
    }

    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.backend.unpublish_policy(policy_id, tenant).await?;
        Ok(())
    }

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.backend.exists(policy_id, tenant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryRelationalStore;
    use warden_core::EntitlementError;

    const TENANT: TenantId = TenantId::new(1);

    /// Serves reads from `inner` and rejects policy writes.
    struct ReadOnlyPolicyBackend {
        inner: InMemoryRelationalStore,
    }

    #[async_trait]
    impl PolicyBackend for ReadOnlyPolicyBackend {
        async fn insert_policy(&self, _: &PolicyRecord, _: TenantId) -> EntitlementResult<()> {
            Err(EntitlementError::new("insert rejected"))
        }
        async fn replace_policy(&self, _: &PolicyRecord, _: TenantId) -> EntitlementResult<()> {
            Err(EntitlementError::new("replace rejected"))
        }
        async fn get_pap_policy(&self, id: &str, tenant: TenantId) -> EntitlementResult<Option<PolicyRecord>> {
            self.inner.get_pap_policy(id, tenant).await
        }
        async fn get_policy_version(
            &self,
            id: &str,
            version: &str,
            tenant: TenantId,
        ) -> EntitlementResult<Option<PolicyRecord>> {
            self.inner.get_policy_version(id, version, tenant).await
        }
        async fn get_all_pap_policies(&self, tenant: TenantId) -> EntitlementResult<Vec<PolicyRecord>> {
            self.inner.get_all_pap_policies(tenant).await
        }
        async fn get_versions(&self, id: &str, tenant: TenantId) -> EntitlementResult<Vec<String>> {
            self.inner.get_versions(id, tenant).await
        }
        async fn delete_pap_policy(&self, id: &str, tenant: TenantId) -> EntitlementResult<bool> {
            self.inner.delete_pap_policy(id, tenant).await
        }
        async fn exists(&self, id: &str, tenant: TenantId) -> EntitlementResult<bool> {
            self.inner.exists(id, tenant).await
        }
        async fn get_pdp_policy(&self, id: &str, tenant: TenantId) -> EntitlementResult<Option<PublishedPolicy>> {
            self.inner.get_pdp_policy(id, tenant).await
        }
        async fn get_all_pdp_policies(&self, tenant: TenantId) -> EntitlementResult<Vec<PublishedPolicy>> {
            self.inner.get_all_pdp_policies(tenant).await
        }
        async fn publish_policy(&self, policy: &PublishedPolicy, tenant: TenantId) -> EntitlementResult<()> {
            self.inner.publish_policy(policy, tenant).await
        }
        async fn unpublish_policy(&self, id: &str, tenant: TenantId) -> EntitlementResult<bool> {
            self.inner.unpublish_policy(id, tenant).await
        }
    }

    fn store() -> RelationalPolicyStore {
        RelationalPolicyStore::new(Arc::new(InMemoryRelationalStore::new()))
    }

    #[test]
    fn test_next_version() {
        let incoming = PolicyRecord::new("p", "b");
        let current = PolicyRecord::new("p", "b").with_version("4");
        assert_eq!(next_version(&incoming, Some(&current), true), "5");
        assert_eq!(next_version(&incoming, Some(&current), false), "4");
        assert_eq!(next_version(&incoming, None, true), "1");
        assert_eq!(next_version(&incoming.clone().with_version("7"), None, false), "7");
        assert_eq!(next_version(&incoming.with_version("draft"), None, false), "1");
    }

    #[tokio::test]
    async fn test_versioning_accumulates() {
        let store = store();
        store.add_or_update_policy(&PolicyRecord::new("p", "a"), true, TENANT).await.unwrap();
        store.add_or_update_policy(&PolicyRecord::new("p", "b"), true, TENANT).await.unwrap();
        store.add_or_update_policy(&PolicyRecord::new("p", "c"), true, TENANT).await.unwrap();

        assert_eq!(store.get_versions("p", TENANT).await.unwrap(), vec!["1", "2", "3"]);
        assert_eq!(store.get_pap_policy("p", TENANT).await.unwrap().unwrap().body, "c");
        assert_eq!(
            store.get_policy("p", Some("2"), TENANT).await.unwrap().unwrap().body,
            "b"
        );
        assert_eq!(store.get_policy("p", Some(" "), TENANT).await.unwrap().unwrap().body, "c");
    }

    #[tokio::test]
    async fn test_unversioned_update_replaces_single_copy() {
        let store = store();
        store.add_or_update_policy(&PolicyRecord::new("p", "a"), false, TENANT).await.unwrap();
        store
            .publish_policy(&PolicyRecord::new("p", "a").to_published(), TENANT)
            .await
            .unwrap();
        store.add_or_update_policy(&PolicyRecord::new("p", "b"), false, TENANT).await.unwrap();

        assert_eq!(store.get_versions("p", TENANT).await.unwrap(), vec!["1"]);
        let latest = store.get_pap_policy("p", TENANT).await.unwrap().unwrap();
        assert_eq!(latest.body, "b");
        assert!(latest.published);
    }

    #[tokio::test]
    async fn test_failed_unversioned_update_keeps_stored_policy() {
        let raw = InMemoryRelationalStore::new();
        RelationalPolicyStore::new(Arc::new(raw.clone()))
            .add_or_update_policy(&PolicyRecord::new("p", "a"), false, TENANT)
            .await
            .unwrap();

        let store = RelationalPolicyStore::new(Arc::new(ReadOnlyPolicyBackend { inner: raw.clone() }));
        let err = store
            .add_or_update_policy(&PolicyRecord::new("p", "b"), false, TENANT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));

        let kept = store.get_pap_policy("p", TENANT).await.unwrap().unwrap();
        assert_eq!(kept.body, "a");
        assert_eq!(raw.call_count("delete_pap_policy"), 0);
    }

    #[tokio::test]
    async fn test_unversioned_update_uses_single_replace() {
        let raw = InMemoryRelationalStore::new();
        let store = RelationalPolicyStore::new(Arc::new(raw.clone()));
        store.add_or_update_policy(&PolicyRecord::new("p", "a"), false, TENANT).await.unwrap();
        raw.reset_call_counts();

        store.add_or_update_policy(&PolicyRecord::new("p", "b"), false, TENANT).await.unwrap();
        assert_eq!(raw.call_count("replace_policy"), 1);
        assert_eq!(raw.call_count("insert_policy"), 0);
        assert_eq!(raw.call_count("delete_pap_policy"), 0);
    }

    #[tokio::test]
    async fn test_get_pap_policies_by_ids_and_all() {
        let store = store();
        for id in ["a", "b", "c"] {
            store.add_or_update_policy(&PolicyRecord::new(id, id), false, TENANT).await.unwrap();
        }
        let some = store
            .get_pap_policies(&["c".to_string(), "zz".to_string(), "a".to_string()], TENANT)
            .await
            .unwrap();
        assert_eq!(some.iter().map(|p| p.policy_id.as_str()).collect::<Vec<_>>(), vec!["c", "a"]);
        assert_eq!(store.get_pap_policies(&[], TENANT).await.unwrap().len(), 3);
        assert_eq!(store.list_policy_ids(TENANT).await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_publish_lifecycle() {
        let store = store();
        let p = PolicyRecord::new("p", "a");
        store.add_or_update_policy(&p, false, TENANT).await.unwrap();
        assert!(!store.is_published("p", TENANT).await.unwrap());

        store.publish_policy(&p.to_published(), TENANT).await.unwrap();
        assert!(store.is_published("p", TENANT).await.unwrap());
        assert_eq!(store.list_published_policy_ids(TENANT).await.unwrap(), vec!["p"]);

        store.unpublish_policy("p", TENANT).await.unwrap();
        assert!(store.get_published_policy("p", TENANT).await.unwrap().is_none());

        store.remove_policy("p", TENANT).await.unwrap();
        store.remove_policy("p", TENANT).await.unwrap();
        assert!(!store.exists("p", TENANT).await.unwrap());
    }
}
