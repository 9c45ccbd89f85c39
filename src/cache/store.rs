//! Cache Store Module
//!
//! Keyed entry storage with TTL expiration. All operations are synchronous;
//! the in-flight request bookkeeping lives one level up in `RequestCache`.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats};

// == Cache Store ==
/// Entry storage with per-entry TTL.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// TTL used by `set`
    default_ttl: Duration,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store whose `set` uses `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl,
        }
    }

    /// TTL applied by `set`.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Has ==
    /// True if an entry exists for `key`, expired or not.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Get ==
    /// Raw lookup without any expiry check.
    pub fn get(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Set ==
    /// Stores `data` under `key` with the default TTL, replacing any previous entry.
    pub fn set(&mut self, key: impl Into<String>, data: V) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, data, ttl);
    }

    /// Stores `data` under `key` with an explicit TTL, replacing any previous entry.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, data: V, ttl: Duration) {
        self.entries.insert(key.into(), CacheEntry::new(data, ttl));
        self.stats.set_total_entries(self.entries.len());
    }

    // == Is Expired ==
    /// True if there is no entry for `key` or its TTL has elapsed.
    pub fn is_expired(&self, key: &str) -> bool {
        self.entries.get(key).map_or(true, CacheEntry::is_expired)
    }

    // == Get Valid ==
    /// Returns a copy of the data if present and fresh.
    ///
    /// A stale entry is removed as a side effect of the lookup.
    pub fn get_valid(&mut self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
            Some(_) => {
                self.entries.remove(key);
                self.stats.record_eviction();
                self.stats.set_total_entries(self.entries.len());
                None
            }
            None => None,
        }
    }

    // == Delete ==
    /// Removes the entry for `key`. Returns whether one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before - self.entries.len();

        for _ in 0..removed {
            self.stats.record_eviction();
        }
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Keys Containing ==
    /// Keys that contain `pattern` as a plain substring.
    pub fn keys_containing(&self, pattern: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|key| key.contains(pattern))
            .cloned()
            .collect()
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
