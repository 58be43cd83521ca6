//! Resolution cache.
//!
//! A bounded LRU map from address to resolution outcome with a per-entry
//! expiry. A stored `None` is a negative result ("every provider failed") and
//! is distinct from an address that was never looked up. Expiry is lazy:
//! reading an expired entry removes it and reports a miss.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

use lru::LruCache;
use serde::{Deserialize, Serialize};

use super::types::Coordinate;

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Previously resolved to this coordinate
    Hit(Coordinate),
    /// Previously attempted; every provider failed
    Negative,
    /// Never looked up, or the entry expired
    Miss,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<Coordinate>,
    expires_at: Instant,
}

/// One live cache entry with a wall-clock expiry, for persistence across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshotEntry {
    pub address: String,
    pub value: Option<Coordinate>,
    pub expires_at: SystemTime,
}

/// Thread-safe bounded TTL cache.
///
/// A single mutex guards the map; no lock is ever held across an `.await`.
pub struct ResolutionCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl ResolutionCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        ResolutionCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        // A panic while holding the lock cannot leave an entry half-written
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Looks up an address, refreshing its recency on a hit.
    pub fn get(&self, address: &str) -> CacheLookup {
        let now = Instant::now();
        let mut entries = self.lock();

        let (expired, value) = match entries.get(address) {
            None => return CacheLookup::Miss,
            Some(entry) => (entry.expires_at <= now, entry.value.clone()),
        };

        if expired {
            entries.pop(address);
            log::debug!("Cache entry for {} expired", address);
            return CacheLookup::Miss;
        }

        match value {
            Some(coordinate) => CacheLookup::Hit(coordinate),
            None => CacheLookup::Negative,
        }
    }

    /// Stores an outcome, evicting the least recently used entry when full.
    pub fn put(&self, address: &str, value: Option<Coordinate>, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.lock();
        if let Some((evicted, _)) = entries.push(address.to_string(), entry) {
            if evicted != address {
                log::debug!("Cache full, evicted {}", evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Exports live entries, least recently used first.
    pub fn snapshot(&self) -> Vec<CacheSnapshotEntry> {
        let now = Instant::now();
        let wall_now = SystemTime::now();
        let entries = self.lock();
        entries
            .iter()
            .rev()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(address, entry)| CacheSnapshotEntry {
                address: address.clone(),
                value: entry.value.clone(),
                expires_at: wall_now + entry.expires_at.duration_since(now),
            })
            .collect()
    }

    /// Imports snapshot entries, skipping those already expired.
    ///
    /// Returns the number of entries restored.
    pub fn restore(&self, snapshot: Vec<CacheSnapshotEntry>) -> usize {
        let wall_now = SystemTime::now();
        let mut restored = 0;
        for entry in snapshot {
            // duration_since fails when expires_at is in the past
            if let Ok(remaining) = entry.expires_at.duration_since(wall_now) {
                if !remaining.is_zero() {
                    self.put(&entry.address, entry.value, remaining);
                    restored += 1;
                }
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> ResolutionCache {
        ResolutionCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn paris() -> Coordinate {
        Coordinate::new(48.8566, 2.3522).unwrap()
    }

    #[test]
    fn test_miss_on_unknown_address() {
        assert_eq!(cache(4).get("1.1.1.1"), CacheLookup::Miss);
    }

    #[test]
    fn test_hit_after_put() {
        let cache = cache(4);
        cache.put("1.1.1.1", Some(paris()), Duration::from_secs(60));
        assert_eq!(cache.get("1.1.1.1"), CacheLookup::Hit(paris()));
    }

    #[test]
    fn test_negative_is_distinct_from_miss() {
        let cache = cache(4);
        cache.put("10.0.0.1", None, Duration::from_secs(60));
        assert_eq!(cache.get("10.0.0.1"), CacheLookup::Negative);
        assert_eq!(cache.get("10.0.0.2"), CacheLookup::Miss);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache = cache(4);
        cache.put("1.1.1.1", Some(paris()), Duration::from_millis(20));
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get("1.1.1.1"), CacheLookup::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = cache(2);
        let ttl = Duration::from_secs(60);
        cache.put("1.1.1.1", Some(paris()), ttl);
        cache.put("2.2.2.2", None, ttl);

        // Touch 1.1.1.1 so 2.2.2.2 becomes the eviction candidate
        assert_eq!(cache.get("1.1.1.1"), CacheLookup::Hit(paris()));
        cache.put("3.3.3.3", Some(paris()), ttl);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("2.2.2.2"), CacheLookup::Miss);
        assert_eq!(cache.get("1.1.1.1"), CacheLookup::Hit(paris()));
        assert_eq!(cache.get("3.3.3.3"), CacheLookup::Hit(paris()));
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let cache = cache(2);
        cache.put("1.1.1.1", None, Duration::from_secs(60));
        cache.put("1.1.1.1", Some(paris()), Duration::from_secs(60));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1.1.1.1"), CacheLookup::Hit(paris()));
    }

    #[test]
    fn test_snapshot_round_trip_preserves_negative_results() {
        let source = cache(4);
        source.put("1.1.1.1", Some(paris()), Duration::from_secs(60));
        source.put("10.0.0.1", None, Duration::from_secs(60));

        let snapshot = source.snapshot();
        assert_eq!(snapshot.len(), 2);

        let target = cache(4);
        assert_eq!(target.restore(snapshot), 2);
        assert_eq!(target.get("1.1.1.1"), CacheLookup::Hit(paris()));
        assert_eq!(target.get("10.0.0.1"), CacheLookup::Negative);
    }

    #[test]
    fn test_restore_skips_expired_entries() {
        let target = cache(4);
        let stale = CacheSnapshotEntry {
            address: "1.1.1.1".to_string(),
            value: Some(paris()),
            expires_at: SystemTime::now() - Duration::from_secs(5),
        };
        assert_eq!(target.restore(vec![stale]), 0);
        assert!(target.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = std::sync::Arc::new(cache(64));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let address = format!("10.0.{}.{}", i, j % 8);
                        cache.put(&address, None, Duration::from_secs(60));
                        let _ = cache.get(&address);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 64);
    }
}
