//! # TTL Cache
//!
//! In-process TTL-keyed associative cache over a concurrent map. Entries
//! expire after a fixed duration and are evicted lazily on access. Used by
//! the certificate checker to memoize handshake observations between health
//! polls; remote configuration and content clients share the same structure
//! at their interface boundary.

use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent map with a fixed per-entry time to live.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a live entry. Expired entries are removed and reported absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Insert or replace an entry, restarting its TTL.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Return the live entry for `key`, or populate it from `init`.
    ///
    /// Concurrent callers may race the population; the last writer wins,
    /// which is acceptable for idempotent lookups.
    pub async fn get_or_insert_with<F, Fut>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = init().await;
        self.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_live_until_their_deadline() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[tokio::test]
    async fn expired_entries_are_absent_and_evicted() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_millis(10));
        cache.insert("a", 1);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn get_or_insert_with_populates_once_while_live() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let first = cache.get_or_insert_with("a", || async { 7 }).await;
        let second = cache.get_or_insert_with("a", || async { 99 }).await;
        assert_eq!(first, 7);
        assert_eq!(second, 7);
    }
}
