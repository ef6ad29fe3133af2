//! Typed view over one region of a [`CacheBackend`].

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use warden_core::{EntitlementError, EntitlementResult, TenantId};

use super::tenant_key::{CacheRegion, TenantScopedKey};
use super::traits::CacheBackend;

/// Serializes values of `T` as JSON into a single cache region.
///
/// Reads never fail: backend errors and undecodable entries are logged and
/// reported as misses. Writes and invalidations propagate their errors so
/// that a caller never believes a stale entry was removed.
///
/// Every write or invalidation advances the tenant's generation for the
/// region. Read-through callers take [`EntityCache::generation`] before
/// reading the backend and store the result with [`EntityCache::populate`],
/// which discards it when a write raced the read.
pub struct EntityCache<T> {
    backend: Arc<dyn CacheBackend>,
    region: CacheRegion,
    generations: Arc<Mutex<HashMap<TenantId, u64>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            region: self.region,
            generations: Arc::clone(&self.generations),
            _marker: PhantomData,
        }
    }
}

impl<T> EntityCache<T> {
    /// Current write generation of this region for `tenant`.
    pub fn generation(&self, tenant: TenantId) -> u64 {
        let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        generations.get(&tenant).copied().unwrap_or(0)
    }

    /// Mark every entry of `tenant` in this region as superseded.
    pub(crate) fn advance(&self, tenant: TenantId) {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        *generations.entry(tenant).or_insert(0) += 1;
    }
}

impl<T> EntityCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn CacheBackend>, region: CacheRegion) -> Self {
        Self {
            backend,
            region,
            generations: Arc::new(Mutex::new(HashMap::new())),
            _marker: PhantomData,
        }
    }

    pub fn region(&self) -> CacheRegion {
        self.region
    }

    fn key(&self, entry: &str, tenant: TenantId) -> TenantScopedKey {
        TenantScopedKey::new(tenant, self.region, entry)
    }

    /// Look up an entry. `None` is a miss.
    pub async fn get(&self, entry: &str, tenant: TenantId) -> Option<T> {
        let cached = match self.backend.get(&self.key(entry, tenant)).await {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                tracing::debug!(region = self.region.name(), %tenant, entry, "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    region = self.region.name(),
                    %tenant,
                    entry,
                    error = %e,
                    "cache lookup failed, treating as miss"
                );
                return None;
            }
        };

        match serde_json::from_slice(&cached.bytes) {
            Ok(value) => {
                tracing::debug!(region = self.region.name(), %tenant, entry, "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(
                    region = self.region.name(),
                    %tenant,
                    entry,
                    error = %e,
                    "undecodable cache entry, treating as miss"
                );
                None
            }
        }
    }

    fn encode(&self, value: &T) -> EntitlementResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| EntitlementError::serialization(self.region.name(), e))
    }

    /// Write-through after a successful backend write.
    pub async fn put(&self, entry: &str, tenant: TenantId, value: &T) -> EntitlementResult<()> {
        let bytes = self.encode(value)?;
        self.advance(tenant);
        self.backend.put(&self.key(entry, tenant), bytes).await
    }

    /// Cache a value read from the backend while the region was at
    /// `observed`. If a write advanced the generation in the meantime the
    /// entry is dropped again, so the write's invalidation is never undone.
    pub async fn populate(
        &self,
        entry: &str,
        tenant: TenantId,
        observed: u64,
        value: &T,
    ) -> EntitlementResult<()> {
        if self.generation(tenant) != observed {
            return Ok(());
        }
        let key = self.key(entry, tenant);
        self.backend.put(&key, self.encode(value)?).await?;
        if self.generation(tenant) != observed {
            tracing::debug!(
                region = self.region.name(),
                %tenant,
                entry,
                "write raced read-through, discarding cached value"
            );
            self.backend.invalidate(&key).await?;
        }
        Ok(())
    }

    pub async fn invalidate(&self, entry: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.advance(tenant);
        self.backend.invalidate(&self.key(entry, tenant)).await
    }

    /// Drop every entry of this region for `tenant`.
    pub async fn clear(&self, tenant: TenantId) -> EntitlementResult<u64> {
        self.advance(tenant);
        self.backend.invalidate_region(tenant, self.region).await
    }
}
