//! KeyedLocks - per-key async serialization
//!
//! Operations against a single request id, hold id or card id must be
//! linearized. `KeyedLocks` hands out one `tokio::sync::Mutex` per key,
//! sharded through a `DashMap` so unrelated keys never contend.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-key async mutexes.
///
/// Guards are owned, so they can be held across await points for the full
/// critical section (e.g. from limit evaluation through counter commit).
pub struct KeyedLocks<K: Eq + Hash + Clone> {
    inner: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, creating it on first use.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = self
            .inner
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked (for diagnostics).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
