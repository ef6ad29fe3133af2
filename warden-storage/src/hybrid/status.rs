//! Hybrid status store.
//!
//! Legacy history for a key is moved into the primary store the first time
//! the key is written through this store. Moves are serialized per
//! `(tenant, about, key)` so concurrent writers cannot copy it twice.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use warden_core::{
    merge_dedup, EntitlementResult, StatusAbout, StatusEntry, StatusType, TenantId,
};

use super::locks::KeyedLocks;
use crate::store::{contains_delete, StatusStore};

type MigrationKey = (TenantId, StatusAbout, String);

pub struct HybridStatusStore<P: ?Sized, S: ?Sized> {
    primary: Arc<P>,
    secondary: Arc<S>,
    migrations: KeyedLocks<MigrationKey>,
}

impl<P, S> HybridStatusStore<P, S>
where
    P: StatusStore + ?Sized,
    S: StatusStore + ?Sized,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>) -> Self {
        Self {
            primary,
            secondary,
            migrations: KeyedLocks::new(),
        }
    }

    /// Copy the key's legacy history into the primary store, then drop it
    /// from the legacy store. Failures are logged and leave the legacy copy
    /// in place for the next attempt.
    async fn migrate(&self, about: StatusAbout, key: &str, tenant: TenantId) {
        let legacy = match self
            .secondary
            .get_status_data(about, key, None, "*", tenant)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(tenant = %tenant, %about, key, error = %e, "failed to read legacy status");
                return;
            }
        };
        if legacy.is_empty() {
            return;
        }

        // Entries copied by an attempt whose legacy delete failed are
        // already in the primary store.
        let copied: HashSet<Uuid> = match self
            .primary
            .get_status_data(about, key, None, "*", tenant)
            .await
        {
            Ok(entries) => entries.into_iter().map(|e| e.entry_id).collect(),
            Err(e) => {
                tracing::warn!(tenant = %tenant, %about, key, error = %e, "failed to read primary status");
                return;
            }
        };
        let oldest_first: Vec<StatusEntry> = legacy
            .into_iter()
            .rev()
            .filter(|e| !e.is_delete() && !copied.contains(&e.entry_id))
            .collect();
        if !oldest_first.is_empty() {
            if let Err(e) = self.primary.handle(about, key, &oldest_first, tenant).await {
                tracing::error!(tenant = %tenant, %about, key, error = %e, "failed to migrate legacy status");
                return;
            }
        }
        if let Err(e) = self.secondary.delete_status(about, key, tenant).await {
            tracing::warn!(
                tenant = %tenant,
                %about,
                key,
                error = %e,
                "migrated legacy status could not be removed"
            );
            return;
        }
        tracing::info!(
            tenant = %tenant,
            %about,
            key,
            entries = oldest_first.len(),
            "migrated legacy status"
        );
    }
}

#[async_trait]
impl<P, S> StatusStore for HybridStatusStore<P, S>
where
    P: StatusStore + ?Sized,
    S: StatusStore + ?Sized,
{
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

        let _guard = self
            .migrations
            .lock((tenant, about, key.to_string()))
            .await?;
        self.migrate(about, key, tenant).await;
        self.primary.handle(about, key, entries, tenant).await
    }

    async fn get_status_data(
        &self,
        about: StatusAbout,
        key: &str,
        status_type: Option<StatusType>,
        search: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<StatusEntry>> {
        let primary = self
            .primary
            .get_status_data(about, key, status_type, search, tenant)
            .await?;
        let secondary = self
            .secondary
            .get_status_data(about, key, status_type, search, tenant)
            .await?;
        // Each side is newest first; interleave them by time. The sort is
        // stable, so equal timestamps keep the primary copy ahead.
        let mut merged = merge_dedup(&primary, &secondary);
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(merged)
    }

    async fn delete_status(
        &self,
        about: StatusAbout,
        key: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.primary.delete_status(about, key, tenant).await?;
        self.secondary.delete_status(about, key, tenant).await
    }
}
