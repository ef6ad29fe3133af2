//! Relational status store with per-key retention.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{
    EntitlementResult, StatusAbout, StatusEntry, StatusSettings, StatusType, TenantId,
};

use crate::backend::StatusBackend;
use crate::store::{contains_delete, select_status, StatusStore};

pub struct RelationalStatusStore {
    backend: Arc<dyn StatusBackend>,
    settings: StatusSettings,
}

impl RelationalStatusStore {
    pub fn new(backend: Arc<dyn StatusBackend>, settings: StatusSettings) -> Self {
        Self { backend, settings }
    }
}

#[async_trait]
impl StatusStore for RelationalStatusStore {
    async fn handle(
        &self,
        about: StatusAbout,
        key: &str,
        entries: &[StatusEntry],
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        if contains_delete(entries) {
            return self.backend.delete_status(about, key, tenant).await;
        }
        if entries.is_empty() {
            return Ok(());
        }
        self.backend.insert_status(about, key, entries, tenant).await?;
        self.backend
            .trim_status(about, key, self.settings.max_records, tenant)
            .await
    }

    async fn get_status_data(
        &self,
        about: StatusAbout,
        key: &str,
        status_type: Option<StatusType>,
        search: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<StatusEntry>> {
        let history = self.backend.get_status(about, key, tenant).await?;
        select_status(history, status_type, search)
    }

    async fn delete_status(
        &self,
        about: StatusAbout,
        key: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.backend.delete_status(about, key, tenant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryRelationalStore;

    const TENANT: TenantId = TenantId::new(1);

    fn store(max_records: usize) -> RelationalStatusStore {
        RelationalStatusStore::new(
            Arc::new(InMemoryRelationalStore::new()),
            StatusSettings { max_records },
        )
    }

    #[tokio::test]
    async fn test_retention_keeps_newest() {
        let store = store(3);
        let entries: Vec<StatusEntry> = (0..5)
            .map(|i| StatusEntry::new(StatusType::UpdatePolicy, "p").with_version(i.to_string()))
            .collect();
        for entry in &entries {
            store.handle_entry(StatusAbout::Policy, entry, TENANT).await.unwrap();
        }

        let kept = store
            .get_status_data(StatusAbout::Policy, "p", None, "*", TENANT)
            .await
            .unwrap();
        let versions: Vec<_> = kept.iter().filter_map(|e| e.version.as_deref()).collect();
        assert_eq!(versions, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn test_delete_entry_purges_history() {
        let store = store(50);
        store
            .handle_entry(StatusAbout::Publisher, &StatusEntry::new(StatusType::AddPolicy, "s1"), TENANT)
            .await
            .unwrap();
        store
            .handle(
                StatusAbout::Publisher,
                "s1",
                &[
                    StatusEntry::new(StatusType::UpdatePolicy, "s1"),
                    StatusEntry::new(StatusType::DeletePolicy, "s1"),
                ],
                TENANT,
            )
            .await
            .unwrap();
        assert!(store
            .get_status_data(StatusAbout::Publisher, "s1", None, "", TENANT)
            .await
            .unwrap()
            .is_empty());
    }
}
