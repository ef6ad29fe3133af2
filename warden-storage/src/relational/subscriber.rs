//! Relational subscriber store.

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{EntitlementError, EntitlementResult, SecretDecryptor, Subscriber, TenantId};

use crate::backend::SubscriberBackend;
use crate::store::SubscriberStore;

pub struct RelationalSubscriberStore {
    backend: Arc<dyn SubscriberBackend>,
    decryptor: Option<Arc<dyn SecretDecryptor>>,
}

impl RelationalSubscriberStore {
    pub fn new(backend: Arc<dyn SubscriberBackend>) -> Self {
        Self {
            backend,
            decryptor: None,
        }
    }

    pub fn with_decryptor(mut self, decryptor: Option<Arc<dyn SecretDecryptor>>) -> Self {
        self.decryptor = decryptor;
        self
    }
}

/// Decrypt secrets on a read copy when asked to. Stored values stay ciphertext.
pub(crate) fn reveal(
    mut subscriber: Subscriber,
    reveal_secrets: bool,
    decryptor: Option<&Arc<dyn SecretDecryptor>>,
) -> Subscriber {
    if reveal_secrets {
        match decryptor {
            Some(d) => subscriber.reveal_secrets(&**d),
            None => tracing::warn!(
                module = %subscriber.module_name,
                "secret reveal requested but no decryptor is configured"
            ),
        }
    }
    subscriber
}

pub(crate) fn require_id(subscriber: &Subscriber) -> EntitlementResult<&str> {
    subscriber
        .subscriber_id()
        .ok_or_else(|| EntitlementError::new("subscriber id must not be empty"))
}

#[async_trait]
impl SubscriberStore for RelationalSubscriberStore {
    async fn add_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        require_id(subscriber)?;
        self.backend.insert_subscriber(subscriber, tenant).await
    }

    async fn get_subscriber(
        &self,
        subscriber_id: &str,
        reveal_secrets: bool,
        tenant: TenantId,
    ) -> EntitlementResult<Option<Subscriber>> {
        let subscriber = self.backend.get_subscriber(subscriber_id, tenant).await?;
        Ok(subscriber.map(|s| reveal(s, reveal_secrets, self.decryptor.as_ref())))
    }

    async fn list_subscriber_ids(
        &self,
        filter: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        self.backend.get_subscriber_ids(filter, tenant).await
    }

    async fn update_subscriber(
        &self,
        subscriber: &Subscriber,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        let id = require_id(subscriber)?;
        let mut stored = self
            .backend
            .get_subscriber(id, tenant)
            .await?
            .ok_or_else(|| EntitlementError::new(format!("subscriber '{id}' does not exist")))?;
        stored.merge_update(subscriber);
        self.backend.update_subscriber(&stored, tenant).await
    }

    async fn remove_subscriber(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.backend.delete_subscriber(subscriber_id, tenant).await?;
        Ok(())
    }

    async fn subscriber_exists(
        &self,
        subscriber_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<bool> {
        self.backend.subscriber_exists(subscriber_id, tenant).await
    }
}
