//! Relational backend traits.
//!
//! These are the leaf operations of the primary store: one row-level call per
//! method, no caching and no cross-store logic. Not-found is `Ok(None)` or an
//! empty collection; any I/O failure is an `EntitlementError`.

pub mod memory;

pub use memory::InMemoryRelationalStore;

use async_trait::async_trait;
use warden_core::{
    EntitlementResult, PolicyRecord, PublishedPolicy, StatusAbout, StatusEntry, Subscriber,
    TenantId,
};

// ============================================================================
// POLICY BACKEND
// ============================================================================

/// Administration-time (PAP) and decision-time (PDP) policy rows.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// Insert one policy version, replacing a row with the same id and version.
    async fn insert_policy(&self, policy: &PolicyRecord, tenant: TenantId) -> EntitlementResult<()>;

    /// Replace every stored version of a policy with `policy` in one step.
    /// On failure the previously stored versions are left as they were.
    async fn replace_policy(&self, policy: &PolicyRecord, tenant: TenantId) -> EntitlementResult<()>;

    /// Latest version of a policy.
    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>>;

    async fn get_policy_version(
        &self,
        policy_id: &str,
        version: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>>;

    /// Latest version of every policy, ordered by policy id.
    async fn get_all_pap_policies(&self, tenant: TenantId) -> EntitlementResult<Vec<PolicyRecord>>;

    /// Stored versions of a policy in ascending numeric order.
    async fn get_versions(&self, policy_id: &str, tenant: TenantId)
        -> EntitlementResult<Vec<String>>;

    /// Remove every version of a policy. Returns whether anything was removed.
    async fn delete_pap_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool>;

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool>;

    async fn get_pdp_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>>;

    /// Every published policy, ordered by policy id.
    async fn get_all_pdp_policies(&self, tenant: TenantId)
        -> EntitlementResult<Vec<PublishedPolicy>>;

    /// Insert or replace the published copy and flag the PAP rows as published.
    async fn publish_policy(&self, policy: &PublishedPolicy, tenant: TenantId)
        -> EntitlementResult<()>;

    /// Remove the published copy and clear the PAP published flag.
    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool>;
}

// ============================================================================
// CONFIG BACKEND
// ============================================================================

/// Per-tenant configuration values.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    async fn get_policy_combining_algorithm(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Option<String>>;

    /// Fails when a value already exists.
    async fn insert_policy_combining_algorithm(
        &self,
        algorithm: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()>;

    /// Fails when no value exists.
    async fn update_policy_combining_algorithm(
        &self,
        algorithm: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()>;
}

// ============================================================================
// SUBSCRIBER BACKEND
// ============================================================================

/// Publisher subscriber rows. Secret values are stored as given (ciphertext).
#[async_trait]
pub trait SubscriberBackend: Send + Sync {
    async fn get_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<Subscriber>>;

    /// Ids matching a wildcard pattern, sorted.
    async fn get_subscriber_ids(
        &self,
        filter: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>>;

    /// Fails when the subscriber has no id or already exists.
    async fn insert_subscriber(&self, subscriber: &Subscriber, tenant: TenantId)
        -> EntitlementResult<()>;

    /// Replace a stored subscriber. Fails when it does not exist.
    async fn update_subscriber(&self, subscriber: &Subscriber, tenant: TenantId)
        -> EntitlementResult<()>;

    async fn delete_subscriber(&self, subscriber_id: &str, tenant: TenantId)
        -> EntitlementResult<bool>;

    async fn subscriber_exists(&self, subscriber_id: &str, tenant: TenantId)
        -> EntitlementResult<bool>;
}

// ============================================================================
// STATUS BACKEND
// ============================================================================

/// Audit status rows, kept per `(about, key)` in insertion order.
#[async_trait]
pub trait StatusBackend: Send + Sync {
    async fn insert_status(
        &self,
        about: StatusAbout,
        key: &str,
        entries: &[StatusEntry],
        tenant: TenantId,
    ) -> EntitlementResult<()>;

    /// Full history, oldest first.
    async fn get_status(
        &self,
        about: StatusAbout,
        key: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<StatusEntry>>;

    async fn delete_status(&self, about: StatusAbout, key: &str, tenant: TenantId)
        -> EntitlementResult<()>;

    /// Drop the oldest entries so that at most `keep` remain.
    async fn trim_status(
        &self,
        about: StatusAbout,
        key: &str,
        keep: usize,
        tenant: TenantId,
    ) -> EntitlementResult<()>;
}
