//! In-memory relational backend for tests and embedding.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use warden_core::{
    EntitlementError, EntitlementResult, PolicyRecord, PublishedPolicy, StatusAbout, StatusEntry,
    Subscriber, TenantId, WildcardFilter,
};

use super::{ConfigBackend, PolicyBackend, StatusBackend, SubscriberBackend};

type PolicyVersions = BTreeMap<u64, PolicyRecord>;

#[derive(Debug, Default)]
struct Tables {
    policies: BTreeMap<(TenantId, String), PolicyVersions>,
    published: BTreeMap<(TenantId, String), PublishedPolicy>,
    algorithms: HashMap<TenantId, String>,
    subscribers: BTreeMap<(TenantId, String), Subscriber>,
    status: HashMap<(TenantId, StatusAbout, String), Vec<StatusEntry>>,
}

/// Implements every relational backend trait over shared in-memory tables.
///
/// Each trait call is counted by operation name so tests can tell whether a
/// caching layer reached the backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelationalStore {
    tables: Arc<RwLock<Tables>>,
    calls: Arc<Mutex<HashMap<&'static str, u64>>>,
}

impl InMemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `operation` (the trait method name) was called.
    pub fn call_count(&self, operation: &str) -> u64 {
        self.calls
            .lock()
            .map(|calls| calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn reset_call_counts(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, operation: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(operation).or_insert(0) += 1;
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> EntitlementResult<R> {
        let tables = self
            .tables
            .read()
            .map_err(|_| EntitlementError::lock_poisoned("relational tables"))?;
        Ok(f(&tables))
    }

    fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> EntitlementResult<R> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| EntitlementError::lock_poisoned("relational tables"))?;
        Ok(f(&mut tables))
    }
}

fn policy_key(policy_id: &str, tenant: TenantId) -> (TenantId, String) {
    (tenant, policy_id.to_string())
}

// ============================================================================
// POLICY
// ============================================================================

#[async_trait]
impl PolicyBackend for InMemoryRelationalStore {
    async fn insert_policy(&self, policy: &PolicyRecord, tenant: TenantId) -> EntitlementResult<()> {
        self.record("insert_policy");
        if policy.policy_id.trim().is_empty() {
            return Err(EntitlementError::new("policy id must not be empty"));
        }
        self.write(|t| {
            t.policies
                .entry(policy_key(&policy.policy_id, tenant))
                .or_default()
                .insert(policy.version_number(), policy.clone());
        })
    }

    async fn replace_policy(&self, policy: &PolicyRecord, tenant: TenantId) -> EntitlementResult<()> {
        self.record("replace_policy");
        if policy.policy_id.trim().is_empty() {
            return Err(EntitlementError::new("policy id must not be empty"));
        }
        self.write(|t| {
            let versions = BTreeMap::from([(policy.version_number(), policy.clone())]);
            t.policies.insert(policy_key(&policy.policy_id, tenant), versions);
        })
    }

    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        self.record("get_pap_policy");
        self.read(|t| {
            t.policies
                .get(&policy_key(policy_id, tenant))
                .and_then(|versions| versions.values().next_back().cloned())
        })
    }

    async fn get_policy_version(
        &self,
        policy_id: &str,
        version: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        self.record("get_policy_version");
        let number = warden_core::parse_version(version);
        self.read(|t| {
            t.policies
                .get(&policy_key(policy_id, tenant))
                .and_then(|versions| versions.get(&number).cloned())
        })
    }

    async fn get_all_pap_policies(&self, tenant: TenantId) -> EntitlementResult<Vec<PolicyRecord>> {
        self.record("get_all_pap_policies");
        self.read(|t| {
            t.policies
                .iter()
                .filter(|((owner, _), _)| *owner == tenant)
                .filter_map(|(_, versions)| versions.values().next_back().cloned())
                .collect()
        })
    }

    async fn get_versions(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        self.record("get_versions");
        self.read(|t| {
            t.policies
                .get(&policy_key(policy_id, tenant))
                .map(|versions| versions.values().map(|p| p.version.clone()).collect())
                .unwrap_or_default()
        })
    }

    async fn delete_pap_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.record("delete_pap_policy");
        self.write(|t| t.policies.remove(&policy_key(policy_id, tenant)).is_some())
    }

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.record("exists");
        self.read(|t| t.policies.contains_key(&policy_key(policy_id, tenant)))
    }

    async fn get_pdp_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>> {
        self.record("get_pdp_policy");
        self.read(|t| t.published.get(&policy_key(policy_id, tenant)).cloned())
    }

    async fn get_all_pdp_policies(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<PublishedPolicy>> {
        self.record("get_all_pdp_policies");
        self.read(|t| {
            t.published
                .iter()
                .filter(|((owner, _), _)| *owner == tenant)
                .map(|(_, p)| p.clone())
                .collect()
        })
    }

    async fn publish_policy(
        &self,
        policy: &PublishedPolicy,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("publish_policy");
        let key = policy_key(&policy.policy_id, tenant);
        self.write(|t| {
            if let Some(versions) = t.policies.get_mut(&key) {
                for record in versions.values_mut() {
                    record.published = record.version == policy.version;
                }
            }
            t.published.insert(key, policy.clone());
        })
    }

    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.record("unpublish_policy");
        let key = policy_key(policy_id, tenant);
        self.write(|t| {
            if let Some(versions) = t.policies.get_mut(&key) {
                for record in versions.values_mut() {
                    record.published = false;
                }
            }
            t.published.remove(&key).is_some()
        })
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[async_trait]
impl ConfigBackend for InMemoryRelationalStore {
    async fn get_policy_combining_algorithm(
        &self,
        tenant: TenantId,
    ) -> EntitlementResult<Option<String>> {
        self.record("get_policy_combining_algorithm");
        self.read(|t| t.algorithms.get(&tenant).cloned())
    }

    async fn insert_policy_combining_algorithm(
        &self,
        algorithm: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("insert_policy_combining_algorithm");
        let inserted = self.write(|t| {
            if t.algorithms.contains_key(&tenant) {
                false
            } else {
                t.algorithms.insert(tenant, algorithm.to_string());
                true
            }
        })?;
        if inserted {
            Ok(())
        } else {
            Err(EntitlementError::new(format!(
                "policy combining algorithm already set for tenant {tenant}"
            )))
        }
    }

    async fn update_policy_combining_algorithm(
        &self,
        algorithm: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("update_policy_combining_algorithm");
        let updated = self.write(|t| match t.algorithms.get_mut(&tenant) {
            Some(existing) => {
                *existing = algorithm.to_string();
                true
            }
            None => false,
        })?;
        if updated {
            Ok(())
        } else {
            Err(EntitlementError::new(format!(
                "no policy combining algorithm to update for tenant {tenant}"
            )))
        }
    }
}

// ============================================================================
// SUBSCRIBER
// ============================================================================

#[async_trait]
impl SubscriberBackend for InMemoryRelationalStore {
    async fn get_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<Subscriber>> {
        self.record("get_subscriber");
        self.read(|t| t.subscribers.get(&(tenant, subscriber_id.to_string())).cloned())
    }

    async fn get_subscriber_ids(
        &self,
        filter: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        self.record("get_subscriber_ids");
        let filter = WildcardFilter::new(filter)?;
        self.read(|t| {
            t.subscribers
                .keys()
                .filter(|(owner, id)| *owner == tenant && filter.matches(id))
                .map(|(_, id)| id.clone())
                .collect()
        })
    }

    async fn insert_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("insert_subscriber");
        let id = subscriber
            .subscriber_id()
            .ok_or_else(|| EntitlementError::new("subscriber id must not be empty"))?
            .to_string();
        let inserted = self.write(|t| {
            let key = (tenant, id.clone());
            if t.subscribers.contains_key(&key) {
                false
            } else {
                t.subscribers.insert(key, subscriber.clone());
                true
            }
        })?;
        if inserted {
            Ok(())
        } else {
            Err(EntitlementError::new(format!("subscriber '{id}' already exists")))
        }
    }

    async fn update_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("update_subscriber");
        let id = subscriber
            .subscriber_id()
            .ok_or_else(|| EntitlementError::new("subscriber id must not be empty"))?
            .to_string();
        let updated = self.write(|t| match t.subscribers.get_mut(&(tenant, id.clone())) {
            Some(existing) => {
                *existing = subscriber.clone();
                true
            }
            None => false,
        })?;
        if updated {
            Ok(())
        } else {
            Err(EntitlementError::new(format!("subscriber '{id}' does not exist")))
        }
    }

    async fn delete_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<bool> {
        self.record("delete_subscriber");
        self.write(|t| t.subscribers.remove(&(tenant, subscriber_id.to_string())).is_some())
    }

    async fn subscriber_exists(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<bool> {
        self.record("subscriber_exists");
        self.read(|t| t.subscribers.contains_key(&(tenant, subscriber_id.to_string())))
    }
}

// ============================================================================
// STATUS
// ============================================================================

#[async_trait]
impl StatusBackend for InMemoryRelationalStore {
    async fn insert_status(
        &self,
        about: StatusAbout,
        key: &str,
        entries: &[StatusEntry],
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("insert_status");
        self.write(|t| {
            t.status
                .entry((tenant, about, key.to_string()))
                .or_default()
                .extend_from_slice(entries);
        })
    }

    async fn get_status(
        &self,
        about: StatusAbout,
        key: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<StatusEntry>> {
        self.record("get_status");
        self.read(|t| {
            t.status
                .get(&(tenant, about, key.to_string()))
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn delete_status(
        &self,
        about: StatusAbout,
        key: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("delete_status");
        self.write(|t| {
            t.status.remove(&(tenant, about, key.to_string()));
        })
    }

    async fn trim_status(
        &self,
        about: StatusAbout,
        key: &str,
        keep: usize,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.record("trim_status");
        self.write(|t| {
            if let Some(entries) = t.status.get_mut(&(tenant, about, key.to_string())) {
                if entries.len() > keep {
                    let excess = entries.len() - keep;
                    entries.drain(..excess);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{StatusType, SubscriberProperty};

    const T1: TenantId = TenantId::new(1);
    const T2: TenantId = TenantId::new(2);

    #[tokio::test]
    async fn test_policy_versions_and_latest() {
        let store = InMemoryRelationalStore::new();
        store.insert_policy(&PolicyRecord::new("p", "v1"), T1).await.unwrap();
        store
            .insert_policy(&PolicyRecord::new("p", "v10").with_version("10"), T1)
            .await
            .unwrap();
        store
            .insert_policy(&PolicyRecord::new("p", "v2").with_version("2"), T1)
            .await
            .unwrap();

        assert_eq!(store.get_pap_policy("p", T1).await.unwrap().unwrap().body, "v10");
        assert_eq!(store.get_versions("p", T1).await.unwrap(), vec!["1", "2", "10"]);
        assert_eq!(
            store.get_policy_version("p", "2", T1).await.unwrap().unwrap().body,
            "v2"
        );
        assert!(store.get_policy_version("p", "3", T1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = InMemoryRelationalStore::new();
        store.insert_policy(&PolicyRecord::new("p", "t1"), T1).await.unwrap();

        assert!(store.exists("p", T1).await.unwrap());
        assert!(!store.exists("p", T2).await.unwrap());
        assert!(store.get_all_pap_policies(T2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_flags_matching_version() {
        let store = InMemoryRelationalStore::new();
        let p1 = PolicyRecord::new("p", "v1");
        let p2 = PolicyRecord::new("p", "v2").with_version("2");
        store.insert_policy(&p1, T1).await.unwrap();
        store.insert_policy(&p2, T1).await.unwrap();

        store.publish_policy(&p1.to_published(), T1).await.unwrap();
        assert!(store.get_policy_version("p", "1", T1).await.unwrap().unwrap().published);
        assert!(!store.get_pap_policy("p", T1).await.unwrap().unwrap().published);
        assert_eq!(store.get_all_pdp_policies(T1).await.unwrap().len(), 1);

        assert!(store.unpublish_policy("p", T1).await.unwrap());
        assert!(!store.unpublish_policy("p", T1).await.unwrap());
        assert!(!store.get_policy_version("p", "1", T1).await.unwrap().unwrap().published);
    }

    #[tokio::test]
    async fn test_algorithm_insert_then_update() {
        let store = InMemoryRelationalStore::new();
        assert!(store.update_policy_combining_algorithm("a", T1).await.is_err());
        store.insert_policy_combining_algorithm("a", T1).await.unwrap();
        assert!(store.insert_policy_combining_algorithm("b", T1).await.is_err());
        store.update_policy_combining_algorithm("b", T1).await.unwrap();
        assert_eq!(
            store.get_policy_combining_algorithm(T1).await.unwrap().as_deref(),
            Some("b")
        );
    }

    #[tokio::test]
    async fn test_subscriber_crud_and_filter() {
        let store = InMemoryRelationalStore::new();
        store.insert_subscriber(&Subscriber::with_id("http", "pdp-east"), T1).await.unwrap();
        store.insert_subscriber(&Subscriber::with_id("http", "pdp-west"), T1).await.unwrap();
        store.insert_subscriber(&Subscriber::with_id("http", "audit"), T1).await.unwrap();

        assert!(store.insert_subscriber(&Subscriber::with_id("http", "audit"), T1).await.is_err());
        assert!(store.insert_subscriber(&Subscriber::new("http"), T1).await.is_err());
        assert_eq!(
            store.get_subscriber_ids("pdp-*", T1).await.unwrap(),
            vec!["pdp-east", "pdp-west"]
        );

        let updated = Subscriber::with_id("http", "audit")
            .with_property(SubscriberProperty::new("url", "https://audit"));
        store.update_subscriber(&updated, T1).await.unwrap();
        assert_eq!(store.get_subscriber("audit", T1).await.unwrap(), Some(updated));

        assert!(store.delete_subscriber("audit", T1).await.unwrap());
        assert!(!store.subscriber_exists("audit", T1).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_trim_drops_oldest() {
        let store = InMemoryRelationalStore::new();
        let entries: Vec<StatusEntry> = (0..5)
            .map(|i| StatusEntry::new(StatusType::UpdatePolicy, "p").with_version(i.to_string()))
            .collect();
        store.insert_status(StatusAbout::Policy, "p", &entries, T1).await.unwrap();
        store.trim_status(StatusAbout::Policy, "p", 2, T1).await.unwrap();

        let kept = store.get_status(StatusAbout::Policy, "p", T1).await.unwrap();
        assert_eq!(kept, entries[3..].to_vec());
        assert!(store.get_status(StatusAbout::Publisher, "p", T1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_call_counts() {
        let store = InMemoryRelationalStore::new();
        store.get_pap_policy("p", T1).await.unwrap();
        store.get_pap_policy("p", T1).await.unwrap();
        assert_eq!(store.call_count("get_pap_policy"), 2);
        assert_eq!(store.call_count("insert_policy"), 0);
        store.reset_call_counts();
        assert_eq!(store.call_count("get_pap_policy"), 0);
    }
}
