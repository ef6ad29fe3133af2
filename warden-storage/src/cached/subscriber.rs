//! Cache-backed subscriber backend. Cached subscribers hold ciphertext.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{EntitlementError, EntitlementResult, Subscriber, TenantId};

use crate::backend::SubscriberBackend;
use crate::cache::StoreCaches;

pub struct CachedSubscriberBackend {
    inner: Arc<dyn SubscriberBackend>,
    caches: Arc<StoreCaches>,
}

impl CachedSubscriberBackend {
    pub fn new(inner: Arc<dyn SubscriberBackend>, caches: Arc<StoreCaches>) -> Self {
        Self { inner, caches }
    }

    async fn write_through(&self, subscriber: &Subscriber, tenant: TenantId) -> EntitlementResult<()> {
        let id = subscriber
            .subscriber_id()
            .ok_or_else(|| EntitlementError::new("subscriber id must not be empty"))?;
        self.caches
            .subscriber
            .put(id, tenant, &Some(subscriber.clone()))
            .await?;
        self.caches.subscriber_list.clear(tenant).await?;
        Ok(())
    }
}

/// Listing cache entries are keyed by the normalized pattern.
fn list_entry(filter: &str) -> &str {
    match filter.trim() {
        "" => "*",
        trimmed => trimmed,
    }
}

#[async_trait]
impl SubscriberBackend for CachedSubscriberBackend {
    async fn get_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<Subscriber>> {
        if let Some(cached) = self.caches.subscriber.get(subscriber_id, tenant).await {
            return Ok(cached);
        }
        let generation = self.caches.subscriber.generation(tenant);
        let subscriber = self.inner.get_subscriber(subscriber_id, tenant).await?;
        self.caches
            .subscriber
            .populate(subscriber_id, tenant, generation, &subscriber)
            .await?;
        Ok(subscriber)
    }

    async fn get_subscriber_ids(
        &self,
        filter: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        let entry = list_entry(filter);
        if let Some(cached) = self.caches.subscriber_list.get(entry, tenant).await {
            return Ok(cached);
        }
        let generation = self.caches.subscriber_list.generation(tenant);
        let ids = self.inner.get_subscriber_ids(filter, tenant).await?;
        self.caches
            .subscriber_list
            .populate(entry, tenant, generation, &ids)
            .await?;
        Ok(ids)
    }

    async fn insert_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.inner.insert_subscriber(subscriber, tenant).await?;
        self.write_through(subscriber, tenant).await
    }

    async fn update_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.inner.update_subscriber(subscriber, tenant).await?;
        self.write_through(subscriber, tenant).await
    }

    async fn delete_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<bool> {
        let deleted = self.inner.delete_subscriber(subscriber_id, tenant).await?;
        self.caches.subscriber.invalidate(subscriber_id, tenant).await?;
        self.caches.subscriber_list.clear(tenant).await?;
        Ok(deleted)
    }

    async fn subscriber_exists(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<bool> {
        if let Some(cached) = self.caches.subscriber.get(subscriber_id, tenant).await {
            return Ok(cached.is_some());
        }
        self.inner.subscriber_exists(subscriber_id, tenant).await
    }
}
