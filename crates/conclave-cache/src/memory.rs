use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{CacheError, CacheResult};
use crate::traits::KeyValueCache;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory cache with lazy expiry.
///
/// Expired entries are dropped when they are next read, or in bulk by
/// [`InMemoryCache::purge_expired`].
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> CacheError {
    CacheError::Unavailable("cache lock poisoned".into())
}

impl KeyValueCache for InMemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(|_| poisoned())?;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.get(key).is_some_and(|entry| !entry.is_fresh(now)) {
            entries.remove(key);
            trace!(key, "expired cache entry dropped");
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let removed = self.entries.write().map_err(|_| poisoned())?.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_fresh(now)))
    }
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CacheExt;
    use serde::{Deserialize, Serialize};
    use std::thread;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn set_then_get() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".into(), HOUR).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn missing_key_is_miss() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("nope").unwrap(), None);
    }

    #[test]
    fn set_overwrites() {
        let cache = InMemoryCache::new();
        cache.set("k", "one".into(), HOUR).unwrap();
        cache.set("k", "two".into(), HOUR).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entry_is_a_miss_and_dropped() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".into(), Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_never_serves() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".into(), Duration::ZERO).unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn delete_reports_fresh_value() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".into(), HOUR).unwrap();
        assert!(cache.delete("k").unwrap());
        assert!(!cache.delete("k").unwrap());
    }

    #[test]
    fn purge_expired_keeps_fresh_entries() {
        let cache = InMemoryCache::new();
        cache.set("old", "v".into(), Duration::ZERO).unwrap();
        cache.set("new", "v".into(), HOUR).unwrap();
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").unwrap().is_some());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Banner {
        text: String,
    }

    #[test]
    fn json_helpers_round_trip_through_strings() {
        let cache = InMemoryCache::new();
        let banner = Banner {
            text: "hello".into(),
        };
        cache.set_json("banner", &banner, HOUR).unwrap();
        assert_eq!(cache.get_json::<Banner>("banner").unwrap(), Some(banner));
    }

    #[test]
    fn json_helper_reports_garbage() {
        let cache = InMemoryCache::new();
        cache.set("banner", "not json".into(), HOUR).unwrap();
        assert!(matches!(
            cache.get_json::<Banner>("banner"),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn usable_as_trait_object() {
        let cache: Box<dyn KeyValueCache> = Box::new(InMemoryCache::new());
        cache.set("k", "v".into(), HOUR).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
    }
}
