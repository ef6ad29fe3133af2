//! Cache-backed adapter behavior against a call-counting relational store.

use std::sync::Arc;
use tempfile::TempDir;
use warden_core::{CacheConfig, StoreConfig, TenantId};
use warden_storage::{
    CachedPolicyBackend, InMemoryRelationalStore, PolicyBackend, StoreCaches, StoreCollaborators,
    StoreFactory,
};
use warden_test_utils::{fixtures, init_test_tracing};

const TENANT: TenantId = TenantId::new(5);

#[tokio::test]
async fn insert_is_served_from_cache_and_list_is_refetched_once() {
    init_test_tracing();
    let backend = Arc::new(InMemoryRelationalStore::new());
    let caches = Arc::new(StoreCaches::in_memory());
    let cached = CachedPolicyBackend::new(backend.clone(), caches);

    cached.insert_policy(&fixtures::policy("p1"), TENANT).await.unwrap();

    let p1 = cached.get_pap_policy("p1", TENANT).await.unwrap().unwrap();
    assert_eq!(p1.policy_id, "p1");
    assert_eq!(backend.call_count("get_pap_policy"), 0);

    let first = cached.get_all_pap_policies(TENANT).await.unwrap();
    let second = cached.get_all_pap_policies(TENANT).await.unwrap();
    assert_eq!(backend.call_count("get_all_pap_policies"), 1);
    assert!(first.iter().any(|p| p.policy_id == "p1"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn writes_invalidate_list_entries() {
    let backend = Arc::new(InMemoryRelationalStore::new());
    let cached = CachedPolicyBackend::new(backend.clone(), Arc::new(StoreCaches::in_memory()));

    cached.insert_policy(&fixtures::policy("p1"), TENANT).await.unwrap();
    assert_eq!(cached.get_all_pap_policies(TENANT).await.unwrap().len(), 1);

    cached.insert_policy(&fixtures::policy("p2"), TENANT).await.unwrap();
    assert_eq!(cached.get_all_pap_policies(TENANT).await.unwrap().len(), 2);
    assert_eq!(backend.call_count("get_all_pap_policies"), 2);

    cached.delete_pap_policy("p1", TENANT).await.unwrap();
    assert!(cached.get_pap_policy("p1", TENANT).await.unwrap().is_none());
    assert_eq!(cached.get_all_pap_policies(TENANT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn negative_lookups_are_cached_per_tenant() {
    let backend = Arc::new(InMemoryRelationalStore::new());
    let cached = CachedPolicyBackend::new(backend.clone(), Arc::new(StoreCaches::in_memory()));

    assert!(cached.get_pap_policy("ghost", TENANT).await.unwrap().is_none());
    assert!(cached.get_pap_policy("ghost", TENANT).await.unwrap().is_none());
    assert_eq!(backend.call_count("get_pap_policy"), 1);

    assert!(cached.get_pap_policy("ghost", TenantId::new(6)).await.unwrap().is_none());
    assert_eq!(backend.call_count("get_pap_policy"), 2);
}

#[tokio::test]
async fn factory_stores_share_an_lmdb_cache() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(InMemoryRelationalStore::new());
    let config = StoreConfig::default()
        .with_cache(CacheConfig::default().with_lmdb_path(dir.path().join("cache")));
    let factory = StoreFactory::new(&config, StoreCollaborators::from_relational(backend.clone()));
    let store = factory.policy_store();

    store.add_or_update_policy(&fixtures::policy("p1"), false, TENANT).await.unwrap();
    backend.reset_call_counts();

    assert!(store.get_pap_policy("p1", TENANT).await.unwrap().is_some());
    assert_eq!(backend.call_count("get_pap_policy"), 0);

    let caches = factory.caches().unwrap();
    assert!(caches.clear_tenant(TENANT).await.unwrap() > 0);
    assert!(store.get_pap_policy("p1", TENANT).await.unwrap().is_some());
    assert_eq!(backend.call_count("get_pap_policy"), 1);
}
