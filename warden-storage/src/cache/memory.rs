//! In-process cache backend.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use warden_core::{EntitlementError, EntitlementResult, TenantId};

use super::tenant_key::{CacheRegion, TenantScopedKey};
use super::traits::{is_expired, CacheBackend, CachedBytes, CacheStats};

#[derive(Debug, Default)]
struct MemoryCacheState {
    entries: BTreeMap<Vec<u8>, CachedBytes>,
    stats: CacheStats,
}

/// Cache backend over an ordered in-memory map keyed by encoded
/// [`TenantScopedKey`]s, so tenant and region invalidation are range scans.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheBackend {
    state: Arc<RwLock<MemoryCacheState>>,
    entry_ttl: Option<Duration>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.entry_ttl = ttl;
        self
    }

    fn remove_prefix(&self, prefix: &[u8]) -> EntitlementResult<u64> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| EntitlementError::lock_poisoned("cache"))?;
        let state = &mut *guard;
        let keys: Vec<Vec<u8>> = state
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            if let Some(old) = state.entries.remove(key) {
                state.stats.memory_bytes =
                    state.stats.memory_bytes.saturating_sub(old.bytes.len() as u64);
            }
        }
        state.stats.entry_count = state.entries.len() as u64;
        Ok(keys.len() as u64)
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &TenantScopedKey) -> EntitlementResult<Option<CachedBytes>> {
        let encoded = key.encode();
        let mut guard = self
            .state
            .write()
            .map_err(|_| EntitlementError::lock_poisoned("cache"))?;
        let state = &mut *guard;

        let expired = match state.entries.get(&encoded) {
            None => {
                state.stats.misses += 1;
                return Ok(None);
            }
            Some(entry) => is_expired(entry.cached_at, self.entry_ttl, Utc::now()),
        };

        if expired {
            if let Some(old) = state.entries.remove(&encoded) {
                state.stats.memory_bytes =
                    state.stats.memory_bytes.saturating_sub(old.bytes.len() as u64);
            }
            state.stats.entry_count = state.entries.len() as u64;
            state.stats.evictions += 1;
            state.stats.misses += 1;
            return Ok(None);
        }

        state.stats.hits += 1;
        Ok(state.entries.get(&encoded).cloned())
    }

    async fn put(&self, key: &TenantScopedKey, value: Vec<u8>) -> EntitlementResult<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| EntitlementError::lock_poisoned("cache"))?;
        let state = &mut *guard;
        let size = value.len() as u64;
        let previous = state.entries.insert(
            key.encode(),
            CachedBytes {
                bytes: value,
                cached_at: Utc::now(),
            },
        );
        if let Some(old) = previous {
            state.stats.memory_bytes =
                state.stats.memory_bytes.saturating_sub(old.bytes.len() as u64);
        }
        state.stats.memory_bytes += size;
        state.stats.entry_count = state.entries.len() as u64;
        Ok(())
    }

    async fn invalidate(&self, key: &TenantScopedKey) -> EntitlementResult<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| EntitlementError::lock_poisoned("cache"))?;
        let state = &mut *guard;
        if let Some(old) = state.entries.remove(&key.encode()) {
            state.stats.memory_bytes =
                state.stats.memory_bytes.saturating_sub(old.bytes.len() as u64);
        }
        state.stats.entry_count = state.entries.len() as u64;
        Ok(())
    }

    async fn invalidate_region(
        &self,
        tenant: TenantId,
        region: CacheRegion,
    ) -> EntitlementResult<u64> {
        self.remove_prefix(&TenantScopedKey::tenant_region_prefix(tenant, region))
    }

    async fn invalidate_tenant(&self, tenant: TenantId) -> EntitlementResult<u64> {
        self.remove_prefix(&TenantScopedKey::tenant_prefix(tenant))
    }

    async fn stats(&self) -> EntitlementResult<CacheStats> {
        let state = self
            .state
            .read()
            .map_err(|_| EntitlementError::lock_poisoned("cache"))?;
        Ok(state.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tenant: i32, region: CacheRegion, entry: &str) -> TenantScopedKey {
        TenantScopedKey::new(TenantId::new(tenant), region, entry)
    }

    #[tokio::test]
    async fn test_put_get_invalidate() {
        let cache = InMemoryCacheBackend::new();
        let k = key(1, CacheRegion::PapPolicy, "p1");

        assert!(cache.get(&k).await.unwrap().is_none());
        cache.put(&k, b"v1".to_vec()).await.unwrap();
        assert_eq!(cache.get(&k).await.unwrap().unwrap().bytes, b"v1".to_vec());

        cache.invalidate(&k).await.unwrap();
        assert!(cache.get(&k).await.unwrap().is_none());

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.memory_bytes, 0);
    }

    #[tokio::test]
    async fn test_invalidate_tenant_leaves_other_tenants() {
        let cache = InMemoryCacheBackend::new();
        cache.put(&key(1, CacheRegion::PapPolicy, "a"), vec![1]).await.unwrap();
        cache.put(&key(1, CacheRegion::Config, "b"), vec![2]).await.unwrap();
        cache.put(&key(2, CacheRegion::PapPolicy, "a"), vec![3]).await.unwrap();

        assert_eq!(cache.invalidate_tenant(TenantId::new(1)).await.unwrap(), 2);
        assert!(cache.get(&key(1, CacheRegion::PapPolicy, "a")).await.unwrap().is_none());
        assert!(cache.get(&key(2, CacheRegion::PapPolicy, "a")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_region_only_touches_region() {
        let cache = InMemoryCacheBackend::new();
        cache.put(&key(1, CacheRegion::PapPolicyList, ""), vec![1]).await.unwrap();
        cache.put(&key(1, CacheRegion::PapPolicy, "x"), vec![2]).await.unwrap();

        let removed = cache
            .invalidate_region(TenantId::new(1), CacheRegion::PapPolicyList)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get(&key(1, CacheRegion::PapPolicy, "x")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_negative_tenant_ids_do_not_collide() {
        let cache = InMemoryCacheBackend::new();
        cache.put(&key(-1, CacheRegion::Config, "alg"), vec![1]).await.unwrap();
        cache.put(&key(-1234, CacheRegion::Config, "alg"), vec![2]).await.unwrap();
        cache.invalidate_tenant(TenantId::new(-1)).await.unwrap();
        assert!(cache.get(&key(-1234, CacheRegion::Config, "alg")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = InMemoryCacheBackend::new().with_entry_ttl(Some(Duration::ZERO));
        let k = key(1, CacheRegion::Subscriber, "s1");
        cache.put(&k, vec![1]).await.unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(&k).await.unwrap().is_none());
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 0);
    }
}
