//! LMDB-backed cache implementation with tenant isolation.
//!
//! Uses heed (Rust bindings for LMDB) for a memory-mapped key-value store
//! that survives process restarts. Keys are encoded [`TenantScopedKey`]s, so
//! tenant and region invalidation are prefix scans.
//!
//! Values are stored as `[cached_at millis: 8 bytes LE][payload]`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use warden_core::{EntitlementError, EntitlementResult, TenantId};

use super::tenant_key::{CacheRegion, TenantScopedKey};
use super::traits::{is_expired, CacheBackend, CachedBytes, CacheStats};

const TIMESTAMP_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored value is shorter than its header.
    #[error("Corrupt cache value: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for EntitlementError {
    fn from(e: LmdbCacheError) -> Self {
        EntitlementError::with_source("LMDB cache operation failed", e)
    }
}

fn txn_error(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

#[derive(Debug, Default)]
struct TenantStatsInner {
    hits: u64,
    misses: u64,
}

/// LMDB-backed cache with tenant isolation.
pub struct LmdbCacheBackend {
    env: Env,
    db: Database<Bytes, Bytes>,
    entry_ttl: Option<Duration>,
    tenant_stats: Arc<RwLock<HashMap<TenantId, TenantStatsInner>>>,
    global_stats: Arc<RwLock<CacheStats>>,
}

impl LmdbCacheBackend {
    /// Open (or create) an LMDB cache in `path` with a map of `max_size_mb`.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb.max(1) * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Self {
            env,
            db,
            entry_ttl: None,
            tenant_stats: Arc::new(RwLock::new(HashMap::new())),
            global_stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    pub fn with_entry_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.entry_ttl = ttl;
        self
    }

    fn record_hit(&self, tenant: TenantId) {
        if let Ok(mut stats) = self.tenant_stats.write() {
            stats.entry(tenant).or_default().hits += 1;
        }
        if let Ok(mut stats) = self.global_stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self, tenant: TenantId) {
        if let Ok(mut stats) = self.tenant_stats.write() {
            stats.entry(tenant).or_default().misses += 1;
        }
        if let Ok(mut stats) = self.global_stats.write() {
            stats.misses += 1;
        }
    }

    fn record_eviction(&self) {
        if let Ok(mut stats) = self.global_stats.write() {
            stats.evictions += 1;
        }
    }

    /// Hit/miss counters for a single tenant.
    pub fn tenant_stats(&self, tenant: TenantId) -> CacheStats {
        if let Ok(stats) = self.tenant_stats.read() {
            if let Some(t) = stats.get(&tenant) {
                return CacheStats {
                    hits: t.hits,
                    misses: t.misses,
                    ..CacheStats::default()
                };
            }
        }
        CacheStats::default()
    }

    fn collect_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let mut keys = Vec::new();
        for result in self.db.iter(&rtxn).map_err(txn_error)? {
            let (key, _) = result.map_err(txn_error)?;
            if key.starts_with(prefix) {
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }

    fn delete_keys(&self, keys: &[Vec<u8>]) -> Result<u64, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let mut deleted = 0u64;
        for key in keys {
            if self.db.delete(&mut wtxn, key.as_slice()).map_err(txn_error)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }

    fn decode_value(bytes: &[u8]) -> Result<CachedBytes, LmdbCacheError> {
        if bytes.len() < TIMESTAMP_LEN {
            return Err(LmdbCacheError::Corrupt(format!(
                "value of {} bytes has no timestamp",
                bytes.len()
            )));
        }
        let mut millis = [0u8; TIMESTAMP_LEN];
        millis.copy_from_slice(&bytes[..TIMESTAMP_LEN]);
        let cached_at =
            DateTime::from_timestamp_millis(i64::from_le_bytes(millis)).unwrap_or_else(Utc::now);
        Ok(CachedBytes {
            bytes: bytes[TIMESTAMP_LEN..].to_vec(),
            cached_at,
        })
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get(&self, key: &TenantScopedKey) -> EntitlementResult<Option<CachedBytes>> {
        let encoded = key.encode();
        let found = {
            let rtxn = self.env.read_txn().map_err(txn_error)?;
            match self.db.get(&rtxn, encoded.as_slice()) {
                Ok(Some(bytes)) => Some(Self::decode_value(bytes)?),
                Ok(None) => None,
                Err(e) => {
                    self.record_miss(key.tenant());
                    return Err(txn_error(e).into());
                }
            }
        };

        match found {
            Some(value) if is_expired(value.cached_at, self.entry_ttl, Utc::now()) => {
                self.delete_keys(&[encoded])?;
                self.record_eviction();
                self.record_miss(key.tenant());
                Ok(None)
            }
            Some(value) => {
                self.record_hit(key.tenant());
                Ok(Some(value))
            }
            None => {
                self.record_miss(key.tenant());
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &TenantScopedKey, value: Vec<u8>) -> EntitlementResult<()> {
        let encoded = key.encode();
        let mut full = Vec::with_capacity(TIMESTAMP_LEN + value.len());
        full.extend_from_slice(&Utc::now().timestamp_millis().to_le_bytes());
        full.extend_from_slice(&value);

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, encoded.as_slice(), full.as_slice())
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    async fn invalidate(&self, key: &TenantScopedKey) -> EntitlementResult<()> {
        self.delete_keys(&[key.encode()])?;
        Ok(())
    }

    async fn invalidate_region(
        &self,
        tenant: TenantId,
        region: CacheRegion,
    ) -> EntitlementResult<u64> {
        let prefix = TenantScopedKey::tenant_region_prefix(tenant, region);
        let keys = self.collect_keys_with_prefix(&prefix)?;
        Ok(self.delete_keys(&keys)?)
    }

    async fn invalidate_tenant(&self, tenant: TenantId) -> EntitlementResult<u64> {
        let prefix = TenantScopedKey::tenant_prefix(tenant);
        let keys = self.collect_keys_with_prefix(&prefix)?;
        let deleted = self.delete_keys(&keys)?;
        if let Ok(mut stats) = self.tenant_stats.write() {
            stats.remove(&tenant);
        }
        Ok(deleted)
    }

    async fn stats(&self) -> EntitlementResult<CacheStats> {
        let mut stats = self
            .global_stats
            .read()
            .map_err(|_| EntitlementError::lock_poisoned("cache stats"))?
            .clone();

        let rtxn = self.env.read_txn().map_err(txn_error)?;
        stats.entry_count = self.db.len(&rtxn).map_err(txn_error)?;
        let mut bytes = 0u64;
        for result in self.db.iter(&rtxn).map_err(txn_error)? {
            let (k, v) = result.map_err(txn_error)?;
            bytes += (k.len() + v.len()) as u64;
        }
        stats.memory_bytes = bytes;
        Ok(stats)
    }
}
