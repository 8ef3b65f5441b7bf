use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheResult;

/// String-keyed cache with per-entry freshness windows.
///
/// Implementations must never return a value whose TTL has elapsed.
pub trait KeyValueCache: Send + Sync {
    /// Fetch a fresh value, or `Ok(None)` on a miss.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key` for at most `ttl`, replacing any prior value.
    fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Remove a key. Returns `true` if a fresh value was removed.
    fn delete(&self, key: &str) -> CacheResult<bool>;
}

/// JSON-typed convenience methods over any [`KeyValueCache`].
pub trait CacheExt: KeyValueCache {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()> {
        self.set(key, serde_json::to_string(value)?, ttl)
    }
}

impl<C: KeyValueCache + ?Sized> CacheExt for C {}
