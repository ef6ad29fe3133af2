//! WARDEN Storage - Entitlement Persistence and Caching
//!
//! Relational, legacy and hybrid stores for policies, configuration,
//! subscribers and status history, with tenant-scoped caching in front of
//! the relational backend. [`StoreFactory`] picks the implementation from
//! the configured storage mode.

pub mod backend;
pub mod cache;
pub mod cached;
pub mod factory;
pub mod hybrid;
pub mod legacy;
pub mod relational;
pub mod resource;
pub mod store;

pub use backend::{
    ConfigBackend, InMemoryRelationalStore, PolicyBackend, StatusBackend, SubscriberBackend,
};

// Re-export cache types for callers that manage caches themselves
pub use cache::{
    CacheBackend, CacheRegion, CacheStats, CachedBytes, EntityCache, InMemoryCacheBackend,
    LmdbCacheBackend, LmdbCacheError, StoreCaches, TenantScopedKey,
};
pub use cached::{CachedConfigBackend, CachedPolicyBackend, CachedSubscriberBackend};
pub use factory::{StoreCollaborators, StoreFactory};
pub use hybrid::{
    HybridConfigStore, HybridPolicyStore, HybridStatusStore, HybridSubscriberStore, KeyedLocks,
};
pub use legacy::{LegacyConfigStore, LegacyPolicyStore, LegacyStatusStore, LegacySubscriberStore};
pub use relational::{
    RelationalConfigStore, RelationalPolicyStore, RelationalStatusStore, RelationalSubscriberStore,
};
pub use resource::{InMemoryResourceStore, Resource, ResourceStore};
pub use store::{ConfigStore, PolicyStore, StatusStore, SubscriberStore};
