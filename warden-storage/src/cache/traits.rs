//! Cache backend trait and statistics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use warden_core::{EntitlementResult, TenantId};

use super::tenant_key::{CacheRegion, TenantScopedKey};

/// A raw cached value and the time it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBytes {
    pub bytes: Vec<u8>,
    pub cached_at: DateTime<Utc>,
}

/// Cache backend trait for pluggable cache implementations.
///
/// Backends store opaque bytes under tenant-scoped keys; typed access goes
/// through [`super::EntityCache`]. Each call is individually atomic.
/// Entries older than the backend's time-to-live are reported as misses.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache.
    async fn get(&self, key: &TenantScopedKey) -> EntitlementResult<Option<CachedBytes>>;

    /// Put a value into the cache, replacing any previous value.
    async fn put(&self, key: &TenantScopedKey, value: Vec<u8>) -> EntitlementResult<()>;

    /// Remove a single entry. Removing an absent entry is not an error.
    async fn invalidate(&self, key: &TenantScopedKey) -> EntitlementResult<()>;

    /// Remove every entry of one region of a tenant.
    async fn invalidate_region(
        &self,
        tenant: TenantId,
        region: CacheRegion,
    ) -> EntitlementResult<u64>;

    /// Remove every entry of a tenant.
    async fn invalidate_tenant(&self, tenant: TenantId) -> EntitlementResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> EntitlementResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate memory usage in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped because their time-to-live elapsed.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Whether an entry written at `cached_at` has outlived `ttl`.
pub(crate) fn is_expired(cached_at: DateTime<Utc>, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
    match ttl {
        None => false,
        Some(ttl) => match (now - cached_at).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        },
    }
}
