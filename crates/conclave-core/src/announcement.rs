use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use conclave_cache::{CacheExt, KeyValueCache};
use conclave_store::{Entity, EntityStore, EntityStoreExt, Query};

use crate::error::CoreResult;

/// Cache key holding the newest announcement.
pub const LATEST_ANNOUNCEMENT_KEY: &str = "latest-announcement";

/// Default freshness window of the cached announcement.
pub const DEFAULT_ANNOUNCEMENT_TTL: Duration = Duration::from_secs(60 * 60);

/// A site-wide message. Only the newest one is ever shown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub message: String,
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(message: impl Into<String>) -> Self {
        Self::at(message, Utc::now())
    }

    pub fn at(message: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            message: message.into(),
            created_at,
        }
    }
}

impl Entity for Announcement {
    const KIND: &'static str = "Announcement";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// Posts announcements and serves the newest one through a read-through
/// cache. Cache failures are logged and never surfaced.
pub struct AnnouncementService {
    store: Arc<dyn EntityStore>,
    cache: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl AnnouncementService {
    pub fn new(store: Arc<dyn EntityStore>, cache: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// Persist a new announcement.
    ///
    /// Drops the cached latest instead of overwriting it; the next
    /// [`latest`](Self::latest) reloads the newest from the store.
    pub fn post(&self, message: impl Into<String>) -> CoreResult<Announcement> {
        let announcement = Announcement::new(message);
        self.publish(&announcement)?;
        Ok(announcement)
    }

    fn publish(&self, announcement: &Announcement) -> CoreResult<()> {
        self.store.save(announcement)?;
        info!(announcement = %announcement.id, "announcement posted");
        if let Err(e) = self.cache.delete(LATEST_ANNOUNCEMENT_KEY) {
            warn!(error = %e, "announcement cache invalidation failed");
        }
        Ok(())
    }

    /// The newest announcement, if any.
    pub fn latest(&self) -> CoreResult<Option<Announcement>> {
        match self.cache.get_json::<Announcement>(LATEST_ANNOUNCEMENT_KEY) {
            Ok(Some(cached)) => {
                debug!("announcement cache hit");
                return Ok(Some(cached));
            }
            Ok(None) => debug!("announcement cache miss"),
            Err(e) => warn!(error = %e, "announcement cache read failed"),
        }

        let query = Query::new(Announcement::KIND)
            .order_by_desc("created_at")
            .order_by_desc("id")
            .limit(1);
        let newest = self.store.find::<Announcement>(&query)?.into_iter().next();
        if let Some(announcement) = &newest {
            self.remember(announcement);
        }
        Ok(newest)
    }

    fn remember(&self, announcement: &Announcement) {
        if let Err(e) = self
            .cache
            .set_json(LATEST_ANNOUNCEMENT_KEY, announcement, self.ttl)
        {
            warn!(error = %e, "announcement cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use conclave_cache::{CacheError, CacheResult, InMemoryCache};
    use conclave_store::InMemoryEntityStore;

    struct BrokenCache;

    impl KeyValueCache for BrokenCache {
        fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Unavailable("down".into()))
        }

        fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Unavailable("down".into()))
        }

        fn delete(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::Unavailable("down".into()))
        }
    }

    fn setup() -> (Arc<InMemoryEntityStore>, Arc<InMemoryCache>, AnnouncementService) {
        let store = Arc::new(InMemoryEntityStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let service =
            AnnouncementService::new(store.clone(), cache.clone(), DEFAULT_ANNOUNCEMENT_TTL);
        (store, cache, service)
    }

    #[test]
    fn no_announcements_is_none() {
        let (_store, cache, service) = setup();
        assert_eq!(service.latest().unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn post_clears_cache_and_latest_refills_it() {
        let (_store, cache, service) = setup();
        service.post("hello").unwrap();
        assert!(service.latest().unwrap().is_some());
        assert!(!cache.is_empty());

        let posted = service.post("again").unwrap();
        assert!(cache.get(LATEST_ANNOUNCEMENT_KEY).unwrap().is_none());
        assert_eq!(service.latest().unwrap(), Some(posted.clone()));
        let cached: Option<Announcement> = cache.get_json(LATEST_ANNOUNCEMENT_KEY).unwrap();
        assert_eq!(cached, Some(posted));
    }

    #[test]
    fn older_post_finishing_last_does_not_hide_newer() {
        let (_store, _cache, service) = setup();
        let older = Announcement::at("older", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let newer = Announcement::at("newer", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap());

        service.publish(&newer).unwrap();
        assert_eq!(service.latest().unwrap().unwrap().message, "newer");
        service.publish(&older).unwrap();

        assert_eq!(service.latest().unwrap().unwrap().message, "newer");
    }

    #[test]
    fn miss_reads_newest_from_store_and_repopulates() {
        let (store, cache, service) = setup();
        let older = Announcement::at("old", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let newer = Announcement::at("new", Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        store.save(&newer).unwrap();
        store.save(&older).unwrap();

        let latest = service.latest().unwrap().unwrap();
        assert_eq!(latest.message, "new");
        assert!(cache.get(LATEST_ANNOUNCEMENT_KEY).unwrap().is_some());
    }

    #[test]
    fn cached_value_wins_within_ttl() {
        let (store, _cache, service) = setup();
        service.post("first").unwrap();
        store
            .save(&Announcement::at(
                "sneaky",
                Utc::now() + chrono::Duration::hours(1),
            ))
            .unwrap();
        assert_eq!(service.latest().unwrap().unwrap().message, "first");
    }

    #[test]
    fn expired_cache_falls_back_to_store() {
        let store = Arc::new(InMemoryEntityStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let service = AnnouncementService::new(store.clone(), cache, Duration::ZERO);
        service.post("first").unwrap();
        store
            .save(&Announcement::at(
                "second",
                Utc::now() + chrono::Duration::hours(1),
            ))
            .unwrap();
        assert_eq!(service.latest().unwrap().unwrap().message, "second");
    }

    #[test]
    fn broken_cache_is_ignored() {
        let store = Arc::new(InMemoryEntityStore::new());
        let service =
            AnnouncementService::new(store, Arc::new(BrokenCache), DEFAULT_ANNOUNCEMENT_TTL);
        service.post("still works").unwrap();
        assert_eq!(service.latest().unwrap().unwrap().message, "still works");
    }

    #[test]
    fn created_at_is_stored_as_microseconds() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let doc = serde_json::to_value(Announcement::at("x", at)).unwrap();
        assert_eq!(doc["created_at"], at.timestamp_micros());
    }
}
