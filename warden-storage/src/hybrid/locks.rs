//! Per-key async mutex registry.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use warden_core::{EntitlementError, EntitlementResult};

/// Hands out one async mutex per key.
///
/// Entries nobody holds or waits on are pruned on the next `lock` call, so
/// the registry stays proportional to the keys in flight.
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`. The guard releases on drop.
    pub async fn lock(&self, key: K) -> EntitlementResult<OwnedMutexGuard<()>> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| EntitlementError::lock_poisoned("keyed lock registry"))?;
            slots.retain(|k, slot| *k == key || Arc::strong_count(slot) > 1);
            slots
                .entry(key)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        Ok(slot.lock_owned().await)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
