//! Entity-family store traits.
//!
//! Every family has three implementations: relational (over the backend
//! traits, optionally cache-backed), legacy (over a [`crate::ResourceStore`])
//! and hybrid (composing a primary and a secondary store of the same family).

use async_trait::async_trait;
use warden_core::{
    CombiningAlgorithm, EntitlementResult, PolicyRecord, PublishedPolicy, StatusAbout,
    StatusEntry, StatusType, Subscriber, TenantId,
};

// ============================================================================
// POLICY STORE
// ============================================================================

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Store a policy. With versioning enabled every call creates the next
    /// version; without it the single stored copy is replaced.
    async fn add_or_update_policy(
        &self,
        policy: &PolicyRecord,
        enable_versioning: bool,
        tenant: TenantId,
    ) -> EntitlementResult<()>;

    /// Latest version of a policy.
    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>>;

    /// Latest versions of the given policies. An empty id list selects every
    /// policy of the tenant.
    async fn get_pap_policies(
        &self,
        policy_ids: &[String],
        tenant: TenantId,
    ) -> EntitlementResult<Vec<PolicyRecord>>;

    /// A specific version, or the latest when `version` is `None` or blank.
    async fn get_policy(
        &self,
        policy_id: &str,
        version: Option<&str>,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>>;

    async fn get_versions(&self, policy_id: &str, tenant: TenantId)
        -> EntitlementResult<Vec<String>>;

    async fn list_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>>;

    /// Remove every version of a policy. Absent policies are not an error.
    async fn remove_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()>;

    async fn publish_policy(&self, policy: &PublishedPolicy, tenant: TenantId)
        -> EntitlementResult<()>;

    async fn is_published(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool>;

    async fn get_published_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>>;

    async fn list_published_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>>;

    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()>;

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool>;
}

// ============================================================================
// CONFIG STORE
// ============================================================================

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The tenant's algorithm, or the default when none is stored.
    async fn get_global_policy_algorithm(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<CombiningAlgorithm> {
        let name = self.get_global_policy_algorithm_name(tenant).await?;
        Ok(CombiningAlgorithm::resolve(name.as_deref()))
    }

    /// The stored algorithm name. Blank values are reported as `None`.
    async fn get_global_policy_algorithm_name(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Option<String>>;

    async fn set_global_policy_algorithm(&self, name: &str, tenant: TenantId)
        -> EntitlementResult<()>;

    async fn delete_global_policy_algorithm(&self, tenant: TenantId) -> EntitlementResult<()>;
}

// ============================================================================
// SUBSCRIBER STORE
// ============================================================================

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn add_subscriber(&self, subscriber: &Subscriber, tenant: TenantId)
        -> EntitlementResult<()>;

    /// With `reveal_secrets` the secret property values are decrypted.
    async fn get_subscriber(
        &self,
        subscriber_id: &str,
        reveal_secrets: bool,
        tenant: TenantId,
    ) -> EntitlementResult<Option<Subscriber>>;

    /// Subscriber ids matching a wildcard pattern (`*` matches any run).
    async fn list_subscriber_ids(&self, filter: &str, tenant: TenantId)
        -> EntitlementResult<Vec<String>>;

    /// Overlay the given properties onto an existing subscriber.
    async fn update_subscriber(&self, subscriber: &Subscriber, tenant: TenantId)
        -> EntitlementResult<()>;

    async fn remove_subscriber(&self, subscriber_id: &str, tenant: TenantId)
        -> EntitlementResult<()>;

    async fn subscriber_exists(&self, subscriber_id: &str, tenant: TenantId)
        -> EntitlementResult<bool>;
}

// ============================================================================
// STATUS STORE
// ============================================================================

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Record entries for `(about, key)`. A delete entry anywhere in the batch
    /// purges the key's history instead.
    async fn handle(
        &self,
        about: StatusAbout,
        key: &str,
        entries: &[StatusEntry],
        tenant: TenantId,
    ) -> EntitlementResult<()>;

    /// Record a single entry under its own key.
    async fn handle_entry(
        &self,
        about: StatusAbout,
        entry: &StatusEntry,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.handle(about, &entry.key, std::slice::from_ref(entry), tenant)
            .await
    }

    /// Entries for `(about, key)`, newest first, optionally restricted to one
    /// type and to targets matching a wildcard `search`.
    async fn get_status_data(
        &self,
        about: StatusAbout,
        key: &str,
        status_type: Option<StatusType>,
        search: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<StatusEntry>>;

    async fn delete_status(&self, about: StatusAbout, key: &str, tenant: TenantId)
        -> EntitlementResult<()>;
}

/// Apply the type filter and wildcard target search, newest first.
pub(crate) fn select_status(
    history: Vec<StatusEntry>,
    status_type: Option<StatusType>,
    search: &str,
) -> EntitlementResult<Vec<StatusEntry>> {
    let filter = warden_core::WildcardFilter::new(search)?;
    Ok(history
        .into_iter()
        .rev()
        .filter(|e| status_type.map_or(true, |t| e.status_type == t))
        .filter(|e| filter.matches_opt(e.target.as_deref()))
        .collect())
}

/// Whether a batch contains a delete entry.
pub(crate) fn contains_delete(entries: &[StatusEntry]) -> bool {
    entries.iter().any(StatusEntry::is_delete)
}
