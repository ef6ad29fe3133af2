//! Hybrid subscriber store.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{merge_dedup, EntitlementResult, Subscriber, TenantId};

use crate::relational::subscriber::require_id;
use crate::store::SubscriberStore;

pub struct HybridSubscriberStore<P: ?Sized, S: ?Sized> {
    primary: Arc<P>,
    secondary: Arc<S>,
}

impl<P, S> HybridSubscriberStore<P, S>
where
    P: SubscriberStore + ?Sized,
    S: SubscriberStore + ?Sized,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, S> SubscriberStore for HybridSubscriberStore<P, S>
where
    P: SubscriberStore + ?Sized,
    S: SubscriberStore + ?Sized,
{
    async fn add_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.primary.add_subscriber(subscriber, tenant).await
    }

    async fn get_subscriber(
        &self,
        subscriber_id: &str,
        reveal_secrets: bool,
        tenant: TenantId,
    ) -> EntitlementResult<Option<Subscriber>> {
        match self
            .primary
            .get_subscriber(subscriber_id, reveal_secrets, tenant)
            .await?
        {
            Some(subscriber) => Ok(Some(subscriber)),
            None => {
                self.secondary
                    .get_subscriber(subscriber_id, reveal_secrets, tenant)
                    .await
            }
        }
    }

    async fn list_subscriber_ids(
        &self,
        filter: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        let primary = self.primary.list_subscriber_ids(filter, tenant).await?;
        let secondary = self.secondary.list_subscriber_ids(filter, tenant).await?;
        Ok(merge_dedup(&primary, &secondary))
    }

    async fn update_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        let id = require_id(subscriber)?;
        if self.primary.subscriber_exists(id, tenant).await? {
            self.primary.update_subscriber(subscriber, tenant).await
        } else {
            self.secondary.update_subscriber(subscriber, tenant).await
        }
    }

    async fn remove_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        if self.primary.subscriber_exists(subscriber_id, tenant).await? {
            self.primary.remove_subscriber(subscriber_id, tenant).await
        } else {
            self.secondary.remove_subscriber(subscriber_id, tenant).await
        }
    }

    async fn subscriber_exists(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<bool> {
        if self.primary.subscriber_exists(subscriber_id, tenant).await? {
            return Ok(true);
        }
        self.secondary.subscriber_exists(subscriber_id, tenant).await
    }
}
