//! Tenant-scoped entity caches.
//!
//! - `tenant_key`: key encoding that cannot be built without a tenant
//! - `traits`: the byte-level [`CacheBackend`] trait and [`CacheStats`]
//! - `memory` / `lmdb_backend`: in-process and LMDB backends
//! - `entity_cache`: typed JSON view over one region
//!
//! [`StoreCaches`] groups the regions used by the cache-backed adapters and is
//! shared between them through an `Arc`.

pub mod entity_cache;
pub mod lmdb_backend;
pub mod memory;
pub mod tenant_key;
pub mod traits;

pub use entity_cache::EntityCache;
pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory::InMemoryCacheBackend;
pub use tenant_key::{CacheRegion, TenantScopedKey};
pub use traits::{CacheBackend, CacheStats, CachedBytes};

use std::sync::Arc;
use warden_core::{
    CacheConfig, EntitlementResult, PolicyRecord, PublishedPolicy, Subscriber, TenantId,
};

/// Entry key used by the whole-tenant list regions.
pub const LIST_ENTRY: &str = "";

/// The seven cache regions shared by the cache-backed adapters.
#[derive(Clone)]
pub struct StoreCaches {
    backend: Arc<dyn CacheBackend>,
    pub pap_policy: EntityCache<Option<PolicyRecord>>,
    pub pap_policy_list: EntityCache<Vec<PolicyRecord>>,
    pub pdp_policy: EntityCache<Option<PublishedPolicy>>,
    pub pdp_policy_list: EntityCache<Vec<PublishedPolicy>>,
    pub config: EntityCache<Option<String>>,
    pub subscriber: EntityCache<Option<Subscriber>>,
    /// Keyed by the listing's search pattern.
    pub subscriber_list: EntityCache<Vec<String>>,
}

impl StoreCaches {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            pap_policy: EntityCache::new(Arc::clone(&backend), CacheRegion::PapPolicy),
            pap_policy_list: EntityCache::new(Arc::clone(&backend), CacheRegion::PapPolicyList),
            pdp_policy: EntityCache::new(Arc::clone(&backend), CacheRegion::PdpPolicy),
            pdp_policy_list: EntityCache::new(Arc::clone(&backend), CacheRegion::PdpPolicyList),
            config: EntityCache::new(Arc::clone(&backend), CacheRegion::Config),
            subscriber: EntityCache::new(Arc::clone(&backend), CacheRegion::Subscriber),
            subscriber_list: EntityCache::new(Arc::clone(&backend), CacheRegion::SubscriberList),
            backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheBackend::new()))
    }

    /// Build the caches described by `config`: LMDB when a path is set,
    /// otherwise in-memory. Fails only when LMDB cannot be opened.
    pub fn from_config(config: &CacheConfig) -> EntitlementResult<Self> {
        let backend: Arc<dyn CacheBackend> = match &config.lmdb_path {
            Some(path) => Arc::new(
                LmdbCacheBackend::new(path, config.max_size_mb)?.with_entry_ttl(config.entry_ttl),
            ),
            None => Arc::new(InMemoryCacheBackend::new().with_entry_ttl(config.entry_ttl)),
        };
        Ok(Self::new(backend))
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Drop every cached entry of a tenant.
    pub async fn clear_tenant(&self, tenant: TenantId) -> EntitlementResult<u64> {
        self.pap_policy.advance(tenant);
        self.pap_policy_list.advance(tenant);
        self.pdp_policy.advance(tenant);
        self.pdp_policy_list.advance(tenant);
        self.config.advance(tenant);
        self.subscriber.advance(tenant);
        self.subscriber_list.advance(tenant);
        self.backend.invalidate_tenant(tenant).await
    }

    pub async fn stats(&self) -> EntitlementResult<CacheStats> {
        self.backend.stats().await
    }
}
