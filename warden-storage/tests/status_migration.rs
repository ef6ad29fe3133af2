//! Legacy status migration through the hybrid status store.

use std::sync::Arc;
use warden_core::{StatusAbout, StatusEntry, StatusSettings, StatusType};
use warden_storage::{
    HybridStatusStore, InMemoryRelationalStore, InMemoryResourceStore, LegacyStatusStore,
    RelationalStatusStore, ResourceStore, StatusStore,
};
use warden_test_utils::{fixtures, init_test_tracing, FailingResourceStore};

const ABOUT: StatusAbout = StatusAbout::Policy;

async fn history(store: &dyn StatusStore, key: &str) -> Vec<StatusEntry> {
    store
        .get_status_data(ABOUT, key, None, "*", fixtures::TENANT)
        .await
        .unwrap()
}

fn relational() -> Arc<RelationalStatusStore> {
    Arc::new(RelationalStatusStore::new(
        Arc::new(InMemoryRelationalStore::new()),
        StatusSettings::default(),
    ))
}

#[tokio::test]
async fn migration_is_idempotent_when_legacy_delete_fails() {
    init_test_tracing();
    let resources = Arc::new(FailingResourceStore::new(Arc::new(InMemoryResourceStore::new())));
    let legacy = Arc::new(LegacyStatusStore::new(
        resources.clone() as Arc<dyn ResourceStore>,
        StatusSettings::default(),
    ));
    let primary = relational();
    let store = HybridStatusStore::new(primary.clone(), legacy.clone());

    let old = fixtures::publish_status("p", "pdp-old");
    legacy.handle_entry(ABOUT, &old, fixtures::TENANT).await.unwrap();

    resources.fail_deletes(true);
    store
        .handle_entry(ABOUT, &fixtures::publish_status("p", "pdp-1"), fixtures::TENANT)
        .await
        .unwrap();
    assert_eq!(history(legacy.as_ref(), "p").await.len(), 1);

    resources.fail_deletes(false);
    store
        .handle_entry(ABOUT, &fixtures::publish_status("p", "pdp-2"), fixtures::TENANT)
        .await
        .unwrap();

    let migrated = history(primary.as_ref(), "p").await;
    assert_eq!(migrated.len(), 3);
    assert_eq!(migrated.iter().filter(|e| e.entry_id == old.entry_id).count(), 1);
    assert!(history(legacy.as_ref(), "p").await.is_empty());
    assert_eq!(history(&store, "p").await, migrated);
}

#[tokio::test]
async fn delete_entry_short_circuits_migration() {
    let resources: Arc<dyn ResourceStore> = Arc::new(InMemoryResourceStore::new());
    let legacy = Arc::new(LegacyStatusStore::new(resources, StatusSettings::default()));
    let primary = relational();
    let store = HybridStatusStore::new(primary.clone(), legacy.clone());

    legacy
        .handle_entry(ABOUT, &fixtures::publish_status("p", "pdp-old"), fixtures::TENANT)
        .await
        .unwrap();
    primary
        .handle_entry(ABOUT, &fixtures::publish_status("p", "pdp-new"), fixtures::TENANT)
        .await
        .unwrap();

    store
        .handle_entry(ABOUT, &StatusEntry::new(StatusType::DeletePolicy, "p"), fixtures::TENANT)
        .await
        .unwrap();

    assert!(history(primary.as_ref(), "p").await.is_empty());
    assert!(history(legacy.as_ref(), "p").await.is_empty());
}

#[tokio::test]
async fn failed_legacy_read_still_records_new_entries() {
    let resources = Arc::new(FailingResourceStore::new(Arc::new(InMemoryResourceStore::new())));
    let legacy = Arc::new(LegacyStatusStore::new(
        resources.clone() as Arc<dyn ResourceStore>,
        StatusSettings::default(),
    ));
    let primary = relational();
    let store = HybridStatusStore::new(primary.clone(), legacy);

    resources.fail_reads(true);
    store
        .handle_entry(ABOUT, &fixtures::publish_status("p", "pdp-1"), fixtures::TENANT)
        .await
        .unwrap();
    assert_eq!(history(primary.as_ref(), "p").await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_migrate_legacy_history_once() {
    let resources: Arc<dyn ResourceStore> = Arc::new(InMemoryResourceStore::new());
    let legacy = Arc::new(LegacyStatusStore::new(resources, StatusSettings::default()));
    let primary = relational();
    let store = Arc::new(HybridStatusStore::new(primary.clone(), legacy.clone()));

    let old: Vec<_> = (0..10)
        .map(|i| fixtures::publish_status("p", &format!("old-{i}")))
        .collect();
    legacy.handle(ABOUT, "p", &old, fixtures::TENANT).await.unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let entry = fixtures::publish_status("p", &format!("new-{i}"));
                store.handle_entry(ABOUT, &entry, fixtures::TENANT).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let migrated = history(primary.as_ref(), "p").await;
    assert_eq!(migrated.len(), 26);
    for entry in &old {
        assert_eq!(migrated.iter().filter(|e| e.entry_id == entry.entry_id).count(), 1);
    }
}
