//! Store Configuration Module
//!
//! Backend selection, cache and status-retention settings. Configuration is
//! read once when the store factory is built, from environment variables with
//! defaults for anything missing or unparseable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// STORAGE MODE
// ============================================================================

/// Which storage implementation answers the entity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageMode {
    /// Relational store only.
    #[default]
    RelationalOnly,
    /// Relational primary with the legacy resource store as a fallback.
    Hybrid,
    /// Legacy hierarchical resource store only.
    LegacyOnly,
}

impl StorageMode {
    /// Resolve a configured value. Never fails: unknown or blank values fall
    /// back to [`StorageMode::RelationalOnly`].
    pub fn resolve(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hybrid" => StorageMode::Hybrid,
            "registry" | "legacy" | "legacy-only" => StorageMode::LegacyOnly,
            "" | "jdbc" | "relational" | "relational-only" => StorageMode::RelationalOnly,
            other => {
                tracing::warn!(
                    configured = %other,
                    "unrecognized policy storage mode, defaulting to relational-only"
                );
                StorageMode::RelationalOnly
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::RelationalOnly => "relational-only",
            StorageMode::Hybrid => "hybrid",
            StorageMode::LegacyOnly => "legacy-only",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Configuration for the entity caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false, relational stores talk to their backends directly.
    pub enabled: bool,
    /// LMDB directory. `None` selects the in-memory cache.
    pub lmdb_path: Option<PathBuf>,
    /// LMDB map size in megabytes.
    pub max_size_mb: usize,
    /// Entries older than this are treated as misses. `None` keeps entries
    /// until they are invalidated.
    pub entry_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lmdb_path: None,
            max_size_mb: 256,
            entry_ttl: None,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_lmdb_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lmdb_path = Some(path.into());
        self
    }

    pub fn with_max_size_mb(mut self, mb: usize) -> Self {
        self.max_size_mb = mb;
        self
    }

    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = Some(ttl);
        self
    }
}

// ============================================================================
// STATUS SETTINGS
// ============================================================================

/// Retention of audit status entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSettings {
    /// Maximum entries kept per key; the oldest are dropped first.
    pub max_records: usize,
}

impl StatusSettings {
    pub const DEFAULT_MAX_RECORDS: usize = 50;
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            max_records: Self::DEFAULT_MAX_RECORDS,
        }
    }
}

// ============================================================================
// STORE CONFIGURATION
// ============================================================================

/// Top-level configuration handed to the store factory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Raw storage mode value, resolved with [`StorageMode::resolve`].
    pub storage_mode: String,
    pub cache: CacheConfig,
    pub status: StatusSettings,
}

impl StoreConfig {
    pub fn with_storage_mode(mut self, mode: impl Into<String>) -> Self {
        self.storage_mode = mode.into();
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_status(mut self, status: StatusSettings) -> Self {
        self.status = status;
        self
    }

    pub fn mode(&self) -> StorageMode {
        StorageMode::resolve(&self.storage_mode)
    }

    /// Create StoreConfig from environment variables.
    ///
    /// Environment variables:
    /// - `WARDEN_POLICY_STORAGE`: "hybrid", "legacy", "relational", ... (default: relational-only)
    /// - `WARDEN_CACHE_ENABLED`: "true" or "false" (default: true)
    /// - `WARDEN_CACHE_LMDB_PATH`: LMDB directory (default: in-memory cache)
    /// - `WARDEN_CACHE_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `WARDEN_CACHE_TTL_SECS`: Entry time-to-live, 0 disables (default: none)
    /// - `WARDEN_STATUS_MAX_RECORDS`: Status entries kept per key (default: 50)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_mode = lookup("WARDEN_POLICY_STORAGE").unwrap_or_default();

        let enabled = lookup("WARDEN_CACHE_ENABLED")
            .map(|s| s.trim().to_lowercase() != "false")
            .unwrap_or(defaults.cache.enabled);

        let lmdb_path = lookup("WARDEN_CACHE_LMDB_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let max_size_mb = lookup("WARDEN_CACHE_MAX_SIZE_MB")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.cache.max_size_mb);

        let entry_ttl = lookup("WARDEN_CACHE_TTL_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let max_records = lookup("WARDEN_STATUS_MAX_RECORDS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.status.max_records);

        Self {
            storage_mode,
            cache: CacheConfig {
                enabled,
                lmdb_path,
                max_size_mb,
                entry_ttl,
            },
            status: StatusSettings { max_records },
        }
    }
}
