//! Hybrid policy store.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{merge_dedup, EntitlementResult, PolicyRecord, PublishedPolicy, TenantId};

use crate::store::PolicyStore;

pub struct HybridPolicyStore<P: ?Sized, S: ?Sized> {
    primary: Arc<P>,
    secondary: Arc<S>,
}

impl<P, S> HybridPolicyStore<P, S>
where
    P: PolicyStore + ?Sized,
    S: PolicyStore + ?Sized,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, S> PolicyStore for HybridPolicyStore<P, S>
where
    P: PolicyStore + ?Sized,
    S: PolicyStore + ?Sized,
{
    /// A policy the primary has never seen is mirrored into the legacy store
    /// when versioning is off, so legacy readers keep seeing it.
    async fn add_or_update_policy(
        &self,
        policy: &PolicyRecord,
        enable_versioning: bool,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        if !enable_versioning && !self.primary.exists(&policy.policy_id, tenant).await? {
            self.secondary
                .add_or_update_policy(policy, enable_versioning, tenant)
                .await?;
        }
        self.primary
            .add_or_update_policy(policy, enable_versioning, tenant)
            .await
    }

    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        match self.primary.get_pap_policy(policy_id, tenant).await? {
            Some(policy) => Ok(Some(policy)),
            None => self.secondary.get_pap_policy(policy_id, tenant).await,
        }
    }

    async fn get_pap_policies(
        &self,
        policy_ids: &[String],
        tenant: TenantId,
    ) -> EntitlementResult<Vec<PolicyRecord>> {
        let primary = self.primary.get_pap_policies(policy_ids, tenant).await?;
        let secondary = self.secondary.get_pap_policies(policy_ids, tenant).await?;
        Ok(merge_dedup(&primary, &secondary))
    }

    async fn get_policy(
        &self,
        policy_id: &str,
        version: Option<&str>,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        match self.primary.get_policy(policy_id, version, tenant).await {
            Ok(Some(policy)) => return Ok(Some(policy)),
            Ok(None) => {}
            Err(e) => tracing::debug!(
                tenant = %tenant,
                policy_id,
                error = %e,
                "primary policy lookup failed, trying legacy store"
            ),
        }
        self.secondary.get_policy(policy_id, version, tenant).await
    }

    async fn get_versions(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        let primary = self.primary.get_versions(policy_id, tenant).await?;
        let secondary = self.secondary.get_versions(policy_id, tenant).await?;
        Ok(merge_dedup(&primary, &secondary))
    }

    async fn list_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        let primary = self.primary.list_policy_ids(tenant).await?;
        let secondary = self.secondary.list_policy_ids(tenant).await?;
        Ok(merge_dedup(&primary, &secondary))
    }

    async fn remove_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        if self.primary.exists(policy_id, tenant).await? {
            self.primary.remove_policy(policy_id, tenant).await?;
        }
        self.secondary.remove_policy(policy_id, tenant).await
    }

    async fn publish_policy(
        &self,
        policy: &PublishedPolicy,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        if self.primary.exists(&policy.policy_id, tenant).await? {
            self.primary.publish_policy(policy, tenant).await
        } else {
            self.secondary.publish_policy(policy, tenant).await
        }
    }

    async fn is_published(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        if self.primary.is_published(policy_id, tenant).await? {
            return Ok(true);
        }
        self.secondary.is_published(policy_id, tenant).await
    }

    async fn get_published_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>> {
        match self.primary.get_published_policy(policy_id, tenant).await? {
            Some(policy) => Ok(Some(policy)),
            None => self.secondary.get_published_policy(policy_id, tenant).await,
        }
    }

    async fn list_published_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        let primary = self.primary.list_published_policy_ids(tenant).await?;
        let secondary = self.secondary.list_published_policy_ids(tenant).await?;
        Ok(merge_dedup(&primary, &secondary))
    }

    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        if self.primary.exists(policy_id, tenant).await? {
            self.primary.unpublish_policy(policy_id, tenant).await
        } else {
            self.secondary.unpublish_policy(policy_id, tenant).await
        }
    }

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        if self.primary.exists(policy_id, tenant).await? {
            return Ok(true);
        }
        self.secondary.exists(policy_id, tenant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryRelationalStore;
    use crate::legacy::LegacyPolicyStore;
    use crate::relational::RelationalPolicyStore;
    use crate::resource::InMemoryResourceStore;
    use warden_core::EntitlementError;

    const TENANT: TenantId = TenantId::new(1);

    type Hybrid = HybridPolicyStore<RelationalPolicyStore, LegacyPolicyStore>;

    fn hybrid() -> (Hybrid, Arc<RelationalPolicyStore>, Arc<LegacyPolicyStore>) {
        let primary = Arc::new(RelationalPolicyStore::new(Arc::new(InMemoryRelationalStore::new())));
        let secondary = Arc::new(LegacyPolicyStore::new(Arc::new(InMemoryResourceStore::new())));
        (HybridPolicyStore::new(primary.clone(), secondary.clone()), primary, secondary)
    }

    #[tokio::test]
    async fn test_new_policy_is_mirrored_once() {
        let (store, primary, secondary) = hybrid();
        store.add_or_update_policy(&PolicyRecord::new("p", "v1"), false, TENANT).await.unwrap();
        store.add_or_update_policy(&PolicyRecord::new("p", "v2"), false, TENANT).await.unwrap();

        assert_eq!(primary.get_pap_policy("p", TENANT).await.unwrap().unwrap().body, "v2");
        // The mirror is written only while the primary lacks the record.
        assert_eq!(secondary.get_pap_policy("p", TENANT).await.unwrap().unwrap().body, "v1");
        assert_eq!(store.list_policy_ids(TENANT).await.unwrap(), vec!["p"]);
        assert_eq!(store.get_pap_policy("p", TENANT).await.unwrap().unwrap().body, "v2");
    }

    #[tokio::test]
    async fn test_versioned_add_skips_legacy() {
        let (store, _, secondary) = hybrid();
        store.add_or_update_policy(&PolicyRecord::new("p", "v1"), true, TENANT).await.unwrap();
        assert!(!secondary.exists("p", TENANT).await.unwrap());
        assert!(store.exists("p", TENANT).await.unwrap());
    }

    #[tokio::test]
    async fn test_legacy_only_records_remain_visible() {
        let (store, primary, secondary) = hybrid();
        secondary.add_or_update_policy(&PolicyRecord::new("old", "legacy"), false, TENANT).await.unwrap();
        primary.add_or_update_policy(&PolicyRecord::new("new", "fresh"), false, TENANT).await.unwrap();

        assert_eq!(store.list_policy_ids(TENANT).await.unwrap(), vec!["new", "old"]);
        assert_eq!(store.get_pap_policies(&[], TENANT).await.unwrap().len(), 2);
        assert_eq!(store.get_policy("old", None, TENANT).await.unwrap().unwrap().body, "legacy");
        assert_eq!(store.get_versions("old", TENANT).await.unwrap(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_publish_routes_by_primary_presence() {
        let (store, primary, secondary) = hybrid();
        let old = PolicyRecord::new("old", "legacy");
        secondary.add_or_update_policy(&old, false, TENANT).await.unwrap();
        let new = PolicyRecord::new("new", "fresh");
        primary.add_or_update_policy(&new, false, TENANT).await.unwrap();

        store.publish_policy(&old.to_published(), TENANT).await.unwrap();
        store.publish_policy(&new.to_published(), TENANT).await.unwrap();
        assert!(secondary.is_published("old", TENANT).await.unwrap());
        assert!(!primary.is_published("old", TENANT).await.unwrap());
        assert!(primary.is_published("new", TENANT).await.unwrap());

        assert!(store.is_published("old", TENANT).await.unwrap());
        assert_eq!(store.get_published_policy("old", TENANT).await.unwrap().unwrap().body, "legacy");
        assert_eq!(store.list_published_policy_ids(TENANT).await.unwrap(), vec!["new", "old"]);

        store.unpublish_policy("old", TENANT).await.unwrap();
        assert!(!store.is_published("old", TENANT).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_clears_both() {
        let (store, primary, secondary) = hybrid();
        store.add_or_update_policy(&PolicyRecord::new("p", "v1"), false, TENANT).await.unwrap();
        store.remove_policy("p", TENANT).await.unwrap();
        assert!(!primary.exists("p", TENANT).await.unwrap());
        assert!(!secondary.exists("p", TENANT).await.unwrap());
        store.remove_policy("p", TENANT).await.unwrap();
    }

    struct Unavailable;

    #[async_trait]
    impl PolicyStore for Unavailable {
        async fn add_or_update_policy(&self, _: &PolicyRecord, _: bool, _: TenantId) -> EntitlementResult<()> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn get_pap_policy(&self, _: &str, _: TenantId) -> EntitlementResult<Option<PolicyRecord>> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn get_pap_policies(&self, _: &[String], _: TenantId) -> EntitlementResult<Vec<PolicyRecord>> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn get_policy(&self, _: &str, _: Option<&str>, _: TenantId) -> EntitlementResult<Option<PolicyRecord>> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn get_versions(&self, _: &str, _: TenantId) -> EntitlementResult<Vec<String>> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn list_policy_ids(&self, _: TenantId) -> EntitlementResult<Vec<String>> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn remove_policy(&self, _: &str, _: TenantId) -> EntitlementResult<()> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn publish_policy(&self, _: &PublishedPolicy, _: TenantId) -> EntitlementResult<()> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn is_published(&self, _: &str, _: TenantId) -> EntitlementResult<bool> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn get_published_policy(&self, _: &str, _: TenantId) -> EntitlementResult<Option<PublishedPolicy>> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn list_published_policy_ids(&self, _: TenantId) -> EntitlementResult<Vec<String>> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn unpublish_policy(&self, _: &str, _: TenantId) -> EntitlementResult<()> {
            Err(EntitlementError::new("unavailable"))
        }
        async fn exists(&self, _: &str, _: TenantId) -> EntitlementResult<bool> {
            Err(EntitlementError::new("unavailable"))
        }
    }

    #[tokio::test]
    async fn test_get_policy_falls_back_on_primary_error() {
        let secondary = Arc::new(LegacyPolicyStore::new(Arc::new(InMemoryResourceStore::new())));
        secondary.add_or_update_policy(&PolicyRecord::new("p", "legacy"), false, TENANT).await.unwrap();
        let store = HybridPolicyStore::new(Arc::new(Unavailable), secondary);

        let found = store.get_policy("p", Some("1"), TENANT).await.unwrap().unwrap();
        assert_eq!(found.body, "legacy");
        // Other reads do not swallow primary failures.
        assert!(store.get_pap_policy("p", TENANT).await.is_err());
    }
}
