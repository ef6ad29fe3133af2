//! Store factory.
//!
//! Resolves the configured [`StorageMode`] once and builds one store per
//! entity family. Construction never fails: an unusable cache falls back to
//! the in-memory cache and a mode that cannot be built falls back to
//! relational-only.

use std::sync::Arc;
use warden_core::{CacheConfig, SecretDecryptor, StatusSettings, StorageMode, StoreConfig};

use crate::backend::{
    ConfigBackend, InMemoryRelationalStore, PolicyBackend, StatusBackend, SubscriberBackend,
};
use crate::cache::{InMemoryCacheBackend, StoreCaches};
use crate::cached::{CachedConfigBackend, CachedPolicyBackend, CachedSubscriberBackend};
use crate::hybrid::{HybridConfigStore, HybridPolicyStore, HybridStatusStore, HybridSubscriberStore};
use crate::legacy::{LegacyConfigStore, LegacyPolicyStore, LegacyStatusStore, LegacySubscriberStore};
use crate::relational::{
    RelationalConfigStore, RelationalPolicyStore, RelationalStatusStore, RelationalSubscriberStore,
};
use crate::resource::{InMemoryResourceStore, ResourceStore};
use crate::store::{ConfigStore, PolicyStore, StatusStore, SubscriberStore};

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Leaf stores and services the factory composes.
#[derive(Clone)]
pub struct StoreCollaborators {
    pub policy_backend: Arc<dyn PolicyBackend>,
    pub config_backend: Arc<dyn ConfigBackend>,
    pub subscriber_backend: Arc<dyn SubscriberBackend>,
    pub status_backend: Arc<dyn StatusBackend>,
    /// Required by the legacy-only and hybrid modes.
    pub resources: Option<Arc<dyn ResourceStore>>,
    pub decryptor: Option<Arc<dyn SecretDecryptor>>,
}

impl StoreCollaborators {
    /// Use one relational backend for every family.
    pub fn from_relational<B>(backend: Arc<B>) -> Self
    where
        B: PolicyBackend + ConfigBackend + SubscriberBackend + StatusBackend + 'static,
    {
        Self {
            policy_backend: backend.clone(),
            config_backend: backend.clone(),
            subscriber_backend: backend.clone(),
            status_backend: backend,
            resources: None,
            decryptor: None,
        }
    }

    /// In-memory relational and resource stores.
    pub fn in_memory() -> Self {
        Self::from_relational(Arc::new(InMemoryRelationalStore::new()))
            .with_resources(Arc::new(InMemoryResourceStore::new()))
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceStore>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_decryptor(mut self, decryptor: Arc<dyn SecretDecryptor>) -> Self {
        self.decryptor = Some(decryptor);
        self
    }
}

// ============================================================================
// FACTORY
// ============================================================================

pub struct StoreFactory {
    mode: StorageMode,
    caches: Option<Arc<StoreCaches>>,
    policy: Arc<dyn PolicyStore>,
    config: Arc<dyn ConfigStore>,
    subscriber: Arc<dyn SubscriberStore>,
    status: Arc<dyn StatusStore>,
}

/// The four relational stores, cache-backed when caches are configured.
struct RelationalStores {
    policy: Arc<RelationalPolicyStore>,
    config: Arc<RelationalConfigStore>,
    subscriber: Arc<RelationalSubscriberStore>,
    status: Arc<RelationalStatusStore>,
}

impl RelationalStores {
    fn build(
        collaborators: &StoreCollaborators,
        caches: Option<&Arc<StoreCaches>>,
        status: StatusSettings,
    ) -> Self {
        let (policy_backend, config_backend, subscriber_backend): (
            Arc<dyn PolicyBackend>,
            Arc<dyn ConfigBackend>,
            Arc<dyn SubscriberBackend>,
        ) = match caches {
            Some(caches) => (
                Arc::new(CachedPolicyBackend::new(
                    collaborators.policy_backend.clone(),
                    caches.clone(),
                )),
                Arc::new(CachedConfigBackend::new(
                    collaborators.config_backend.clone(),
                    caches.clone(),
                )),
                Arc::new(CachedSubscriberBackend::new(
                    collaborators.subscriber_backend.clone(),
                    caches.clone(),
                )),
            ),
            None => (
                collaborators.policy_backend.clone(),
                collaborators.config_backend.clone(),
                collaborators.subscriber_backend.clone(),
            ),
        };

        Self {
            policy: Arc::new(RelationalPolicyStore::new(policy_backend)),
            config: Arc::new(RelationalConfigStore::new(config_backend)),
            subscriber: Arc::new(
                RelationalSubscriberStore::new(subscriber_backend)
                    .with_decryptor(collaborators.decryptor.clone()),
            ),
            status: Arc::new(RelationalStatusStore::new(
                collaborators.status_backend.clone(),
                status,
            )),
        }
    }
}

/// The four legacy stores over one resource tree.
struct LegacyStores {
    policy: Arc<LegacyPolicyStore>,
    config: Arc<LegacyConfigStore>,
    subscriber: Arc<LegacySubscriberStore>,
    status: Arc<LegacyStatusStore>,
}

impl LegacyStores {
    fn build(
        resources: &Arc<dyn ResourceStore>,
        decryptor: Option<Arc<dyn SecretDecryptor>>,
        status: StatusSettings,
    ) -> Self {
        Self {
            policy: Arc::new(LegacyPolicyStore::new(resources.clone())),
            config: Arc::new(LegacyConfigStore::new(resources.clone())),
            subscriber: Arc::new(
                LegacySubscriberStore::new(resources.clone()).with_decryptor(decryptor),
            ),
            status: Arc::new(LegacyStatusStore::new(resources.clone(), status)),
        }
    }
}

/// Open the configured cache, falling back to an in-memory cache.
fn build_caches(config: &CacheConfig) -> Option<Arc<StoreCaches>> {
    if !config.enabled {
        tracing::info!("entity caching disabled");
        return None;
    }
    let caches = match StoreCaches::from_config(config) {
        Ok(caches) => {
            tracing::info!(
                lmdb_path = ?config.lmdb_path,
                ttl = ?config.entry_ttl,
                "entity cache initialized"
            );
            caches
        }
        Err(e) => {
            tracing::error!(
                lmdb_path = ?config.lmdb_path,
                error = %e,
                "failed to open entity cache, falling back to in-memory cache"
            );
            StoreCaches::new(Arc::new(
                InMemoryCacheBackend::new().with_entry_ttl(config.entry_ttl),
            ))
        }
    };
    Some(Arc::new(caches))
}

impl StoreFactory {
    pub fn new(config: &StoreConfig, collaborators: StoreCollaborators) -> Self {
        let caches = build_caches(&config.cache);
        let relational = RelationalStores::build(&collaborators, caches.as_ref(), config.status);

        let requested = config.mode();
        let legacy = match (requested, &collaborators.resources) {
            (StorageMode::RelationalOnly, _) => None,
            (_, Some(resources)) => Some(LegacyStores::build(
                resources,
                collaborators.decryptor.clone(),
                config.status,
            )),
            (_, None) => {
                tracing::warn!(
                    requested = %requested,
                    "no legacy resource store available, defaulting to relational-only"
                );
                None
            }
        };

        let factory = match (requested, legacy) {
            (StorageMode::Hybrid, Some(legacy)) => Self {
                mode: StorageMode::Hybrid,
                caches,
                policy: Arc::new(HybridPolicyStore::new(relational.policy, legacy.policy)),
                config: Arc::new(HybridConfigStore::new(relational.config, legacy.config)),
                subscriber: Arc::new(HybridSubscriberStore::new(
                    relational.subscriber,
                    legacy.subscriber,
                )),
                status: Arc::new(HybridStatusStore::new(relational.status, legacy.status)),
            },
            (StorageMode::LegacyOnly, Some(legacy)) => Self {
                mode: StorageMode::LegacyOnly,
                caches,
                policy: legacy.policy,
                config: legacy.config,
                subscriber: legacy.subscriber,
                status: legacy.status,
            },
            _ => Self {
                mode: StorageMode::RelationalOnly,
                caches,
                policy: relational.policy,
                config: relational.config,
                subscriber: relational.subscriber,
                status: relational.status,
            },
        };

        for family in ["policy", "config", "subscriber", "status"] {
            tracing::info!(mode = %factory.mode, family, "store initialized");
        }
        factory
    }

    /// The mode the stores were built for, after any fallback.
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Shared caches, when caching is enabled.
    pub fn caches(&self) -> Option<Arc<StoreCaches>> {
        self.caches.clone()
    }

    pub fn policy_store(&self) -> Arc<dyn PolicyStore> {
        self.policy.clone()
    }

    pub fn config_store(&self) -> Arc<dyn ConfigStore> {
        self.config.clone()
    }

    pub fn subscriber_store(&self) -> Arc<dyn SubscriberStore> {
        self.subscriber.clone()
    }

    pub fn status_store(&self) -> Arc<dyn StatusStore> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{PolicyRecord, TenantId};

    const TENANT: TenantId = TenantId::new(1);

    #[test]
    fn test_mode_resolution() {
        let cases = [
            ("hybrid", StorageMode::Hybrid),
            ("legacy", StorageMode::LegacyOnly),
            ("Registry", StorageMode::LegacyOnly),
            ("jdbc", StorageMode::RelationalOnly),
            ("", StorageMode::RelationalOnly),
            ("mongodb", StorageMode::RelationalOnly),
        ];
        for (raw, expected) in cases {
            let config = StoreConfig::default().with_storage_mode(raw);
            let factory = StoreFactory::new(&config, StoreCollaborators::in_memory());
            assert_eq!(factory.mode(), expected, "mode {raw:?}");
        }
    }

    #[test]
    fn test_missing_resources_falls_back_to_relational() {
        let collaborators =
            StoreCollaborators::from_relational(Arc::new(InMemoryRelationalStore::new()));
        let config = StoreConfig::default().with_storage_mode("hybrid");
        assert_eq!(
            StoreFactory::new(&config, collaborators).mode(),
            StorageMode::RelationalOnly
        );
    }

    #[test]
    fn test_cache_toggle() {
        let enabled = StoreFactory::new(&StoreConfig::default(), StoreCollaborators::in_memory());
        assert!(enabled.caches().is_some());

        let config = StoreConfig::default().with_cache(CacheConfig::disabled());
        let disabled = StoreFactory::new(&config, StoreCollaborators::in_memory());
        assert!(disabled.caches().is_none());
    }

    #[tokio::test]
    async fn test_accessors_share_instances() {
        let factory = StoreFactory::new(
            &StoreConfig::default().with_storage_mode("hybrid"),
            StoreCollaborators::in_memory(),
        );
        let first = factory.policy_store();
        first
            .add_or_update_policy(&PolicyRecord::new("p", "x"), false, TENANT)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &factory.policy_store()));
        assert!(factory.policy_store().exists("p", TENANT).await.unwrap());
    }
}
