//! Legacy subscriber store. Each subscriber is a JSON resource under the
//! publisher root named by its id.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{
    EntitlementError, EntitlementResult, SecretDecryptor, Subscriber, TenantId, WildcardFilter,
};

use super::{child_names, read_json};
use crate::relational::subscriber::{require_id, reveal};
use crate::resource::{child_path, Resource, ResourceStore, PUBLISHER_ROOT};
use crate::store::SubscriberStore;

pub struct LegacySubscriberStore {
    resources: Arc<dyn ResourceStore>,
    decryptor: Option<Arc<dyn SecretDecryptor>>,
}

impl LegacySubscriberStore {
    pub fn new(resources: Arc<dyn ResourceStore>) -> Self {
        Self {
            resources,
            decryptor: None,
        }
    }

    pub fn with_decryptor(mut self, decryptor: Option<Arc<dyn SecretDecryptor>>) -> Self {
        self.decryptor = decryptor;
        self
    }

    fn path(subscriber_id: &str) -> String {
        child_path(PUBLISHER_ROOT, subscriber_id)
    }

    async fn read(&self, subscriber_id: &str, tenant: TenantId) -> EntitlementResult<Option<Subscriber>> {
        read_json(self.resources.as_ref(), &Self::path(subscriber_id), tenant).await
    }

    async fn write(&self, id: &str, subscriber: &Subscriber, tenant: TenantId) -> EntitlementResult<()> {
        self.resources
            .put(&Self::path(id), Resource::from_json(subscriber)?, tenant)
            .await
    }
}

#[async_trait]
impl SubscriberStore for LegacySubscriberStore {
    async fn add_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        let id = require_id(subscriber)?;
        if self.resources.exists(&Self::path(id), tenant).await? {
            return Err(EntitlementError::new(format!("subscriber '{id}' already exists")));
        }
        self.write(id, subscriber, tenant).await
    }

    async fn get_subscriber(
        &self,
        subscriber_id: &str,
        reveal_secrets: bool,
        tenant: TenantId,
    ) -> EntitlementResult<Option<Subscriber>> {
        let subscriber = self.read(subscriber_id, tenant).await?;
        Ok(subscriber.map(|s| reveal(s, reveal_secrets, self.decryptor.as_ref())))
    }

    async fn list_subscriber_ids(
        &self,
        filter: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        let filter = WildcardFilter::new(filter)?;
        let names = child_names(self.resources.as_ref(), PUBLISHER_ROOT, tenant).await?;
        Ok(names.into_iter().filter(|id| filter.matches(id)).collect())
    }

    async fn update_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        let id = require_id(subscriber)?;
        let mut stored = self
            .read(id, tenant)
            .await?
            .ok_or_else(|| EntitlementError::new(format!("subscriber '{id}' does not exist")))?;
        stored.merge_update(subscriber);
        self.write(id, &stored, tenant).await
    }

    async fn remove_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.resources.delete(&Self::path(subscriber_id), tenant).await
    }

    async fn subscriber_exists(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<bool> {
        self.resources.exists(&Self::path(subscriber_id), tenant).await
    }
}
