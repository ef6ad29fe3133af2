//! End-to-end hybrid store scenarios over in-memory leaves.

use std::sync::Arc;
use warden_core::{PolicyRecord, StatusAbout, StorageMode, StoreConfig};
use warden_storage::{
    HybridPolicyStore, InMemoryRelationalStore, InMemoryResourceStore, LegacyPolicyStore,
    PolicyStore, RelationalPolicyStore, ResourceStore, StoreCollaborators, StoreFactory,
};
use warden_test_utils::{assertions, fixtures, init_test_tracing, FailingPolicyStore};

struct Setup {
    factory: StoreFactory,
    legacy: LegacyPolicyStore,
}

fn hybrid_setup() -> Setup {
    init_test_tracing();
    let resources: Arc<dyn ResourceStore> = Arc::new(InMemoryResourceStore::new());
    let collaborators = StoreCollaborators::from_relational(Arc::new(InMemoryRelationalStore::new()))
        .with_resources(resources.clone());
    let factory = StoreFactory::new(
        &StoreConfig::default().with_storage_mode("hybrid"),
        collaborators,
    );
    assert_eq!(factory.mode(), StorageMode::Hybrid);
    Setup {
        factory,
        legacy: LegacyPolicyStore::new(resources),
    }
}

#[tokio::test]
async fn allow_admin_update_supersedes_legacy_copy() {
    let setup = hybrid_setup();
    let tenant = fixtures::TENANT;
    setup
        .legacy
        .add_or_update_policy(&fixtures::allow_admin(fixtures::ALLOW_ADMIN_LEGACY_BODY), false, tenant)
        .await
        .unwrap();

    let store = setup.factory.policy_store();
    store
        .add_or_update_policy(&fixtures::allow_admin(fixtures::ALLOW_ADMIN_BODY), false, tenant)
        .await
        .unwrap();

    assert_eq!(store.list_policy_ids(tenant).await.unwrap(), vec!["allow-admin"]);
    let current = store.get_pap_policy("allow-admin", tenant).await.unwrap().unwrap();
    assert_eq!(current.body, fixtures::ALLOW_ADMIN_BODY);
    assertions::assert_unique_keys(&store.get_pap_policies(&[], tenant).await.unwrap());
}

#[tokio::test]
async fn new_policy_is_mirrored_to_legacy_and_listed_once() {
    let setup = hybrid_setup();
    let tenant = fixtures::TENANT;
    let store = setup.factory.policy_store();

    store.add_or_update_policy(&fixtures::policy("p1"), false, tenant).await.unwrap();

    assert!(setup.legacy.exists("p1", tenant).await.unwrap());
    assert_eq!(store.list_policy_ids(tenant).await.unwrap(), vec!["p1"]);
    assertions::assert_unique_keys(&store.get_pap_policies(&[], tenant).await.unwrap());
}

#[tokio::test]
async fn primary_value_wins_over_stale_legacy_copy() {
    let setup = hybrid_setup();
    let tenant = fixtures::TENANT;
    let store = setup.factory.policy_store();

    store.add_or_update_policy(&PolicyRecord::new("p", "first"), false, tenant).await.unwrap();
    store.add_or_update_policy(&PolicyRecord::new("p", "second"), false, tenant).await.unwrap();

    assert_eq!(setup.legacy.get_pap_policy("p", tenant).await.unwrap().unwrap().body, "first");
    assert_eq!(store.get_pap_policy("p", tenant).await.unwrap().unwrap().body, "second");
    assert_eq!(store.get_policy("p", None, tenant).await.unwrap().unwrap().body, "second");
    let all = store.get_pap_policies(&["p".to_string()], tenant).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].body, "second");
}

#[tokio::test]
async fn tenants_do_not_see_each_other() {
    let setup = hybrid_setup();
    let store = setup.factory.policy_store();

    store.add_or_update_policy(&fixtures::policy("p"), false, fixtures::TENANT).await.unwrap();

    assert!(store.list_policy_ids(fixtures::OTHER_TENANT).await.unwrap().is_empty());
    assert!(store.get_pap_policy("p", fixtures::OTHER_TENANT).await.unwrap().is_none());
}

#[tokio::test]
async fn failing_primary_lookup_falls_back_to_legacy() {
    init_test_tracing();
    let tenant = fixtures::TENANT;
    let primary = Arc::new(FailingPolicyStore::new(Arc::new(RelationalPolicyStore::new(
        Arc::new(InMemoryRelationalStore::new()),
    ))));
    let legacy = Arc::new(LegacyPolicyStore::new(Arc::new(InMemoryResourceStore::new())));
    legacy.add_or_update_policy(&fixtures::policy("p"), false, tenant).await.unwrap();
    let store = HybridPolicyStore::new(primary.clone(), legacy);

    primary.fail_reads(true);
    let found = store.get_policy("p", Some("1"), tenant).await.unwrap();
    assert!(found.is_some());
    assertions::assert_err(&store.list_policy_ids(tenant).await);

    primary.fail_reads(false);
    assert_eq!(store.list_policy_ids(tenant).await.unwrap(), vec!["p"]);
}

#[tokio::test]
async fn hybrid_status_history_follows_the_key() {
    let setup = hybrid_setup();
    let status = setup.factory.status_store();
    let tenant = fixtures::TENANT;

    let first = fixtures::publish_status("p", "pdp-1");
    let second = fixtures::publish_status("p", "pdp-2");
    status.handle_entry(StatusAbout::Policy, &first, tenant).await.unwrap();
    status.handle_entry(StatusAbout::Policy, &second, tenant).await.unwrap();

    let history = status
        .get_status_data(StatusAbout::Policy, "p", None, "pdp-*", tenant)
        .await
        .unwrap();
    assert_eq!(history, vec![second, first]);
}
