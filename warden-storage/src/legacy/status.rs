//! Legacy status store. A key's history is one JSON array, oldest first.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{
    EntitlementResult, StatusAbout, StatusEntry, StatusSettings, StatusType, TenantId,
};

use super::read_json;
use crate::resource::{child_path, status_root, Resource, ResourceStore};
use crate::store::{contains_delete, select_status, StatusStore};

pub struct LegacyStatusStore {
    resources: Arc<dyn ResourceStore>,
    settings: StatusSettings,
}

impl LegacyStatusStore {
    pub fn new(resources: Arc<dyn ResourceStore>, settings: StatusSettings) -> Self {
        Self { resources, settings }
    }

    fn path(about: StatusAbout, key: &str) -> String {
        child_path(status_root(about), key)
    }

    async fn history(
        &self,
        about: StatusAbout,
        key: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<StatusEntry>> {
        let stored: Option<Vec<StatusEntry>> =
            read_json(self.resources.as_ref(), &Self::path(about, key), tenant).await?;
        Ok(stored.unwrap_or_default())
    }
}

#[async_trait]
impl StatusStore for LegacyStatusStore {
    async fn handle(
        &self,
        about: StatusAbout,
        key: &str,
        entries: &[StatusEntry],
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        if contains_delete(entries) {
            return self.delete_status(about, key, tenant).await;
        }
        if entries.is_empty() {
            return Ok(());
        }
        let mut history = self.history(about, key, tenant).await?;
        history.extend_from_slice(entries);
        let excess = history.len().saturating_sub(self.settings.max_records);
        history.drain(..excess);
        self.resources
            .put(&Self::path(about, key), Resource::from_json(&history)?, tenant)
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
        let history = self.history(about, key, tenant).await?;
        select_status(history, status_type, search)
    }

    async fn delete_status(
        &self,
        about: StatusAbout,
        key: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.resources.delete(&Self::path(about, key), tenant).await
    }
}
