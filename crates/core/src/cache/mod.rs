//! Expiring cache over a key-value substrate.
//!
//! Every data-fetching service in this crate goes through this cache to
//! deduplicate upstream calls and soft rate-limit outbound traffic. The
//! cache is advisory, never load-bearing: any internal failure degrades
//! to "no cache" behavior - a miss on read, a silent drop on write. The
//! only error that ever propagates out of [`ExpiringCache::fetch_through`]
//! is a failure of the wrapped producer itself.

mod store;

pub use store::{KeyValueStore, MemoryStore, StoreError};

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Time source for expiry checks. Injected so TTL behavior is testable
/// against a simulated clock.
pub trait Clock: Send + Sync {
    /// Current Unix time in whole seconds.
    fn now_secs(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Storage envelope for one cached value.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry<T> {
    data: T,
    expires_at: i64,
}

/// Generic key-value cache with per-entry time-to-live.
///
/// TTLs are whole seconds; an entry is expired exactly at its boundary
/// second (`now >= expires_at`). Values cross the substrate as JSON, so
/// callers always receive fresh copies.
pub struct ExpiringCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ExpiringCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Look up a cached value.
    ///
    /// Returns `None` when the key is absent, the envelope is malformed,
    /// or the entry has expired. Expired entries are deleted as a side
    /// effect. Substrate failures are logged and treated as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Cache get error for '{}': {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                error!("Cache entry for '{}' is malformed: {}", key, e);
                return None;
            }
        };

        if self.clock.now_secs() >= entry.expires_at {
            self.remove(key);
            return None;
        }

        Some(entry.data)
    }

    /// Store a value with the given TTL and hand it back unchanged.
    ///
    /// The pass-through return lets fetch pipelines end in `cache.set(...)`.
    /// Write failures are logged and swallowed - the cache is never a
    /// source of truth.
    pub fn set<T: Serialize>(&self, key: &str, data: T, ttl_secs: u64) -> T {
        let entry = CacheEntry {
            data: &data,
            expires_at: self.clock.now_secs() + ttl_secs as i64,
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = self.store.set(key, &raw) {
                    error!("Cache set error for '{}': {}", key, e);
                }
            }
            Err(e) => {
                error!("Cache serialization error for '{}': {}", key, e);
            }
        }
        data
    }

    /// Delete a single entry. Failures are swallowed.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            error!("Cache remove error for '{}': {}", key, e);
        }
    }

    /// Wipe the entire substrate (manual reset actions).
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            error!("Cache clear error: {}", e);
        }
    }

    /// Return the cached value for `key`, or run `producer`, cache its
    /// result for `ttl_secs`, and return it.
    ///
    /// A producer failure propagates unchanged and nothing is cached (no
    /// negative caching).
    pub async fn fetch_through<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        producer: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        if let Some(cached) = self.get::<T>(key) {
            return Ok(cached);
        }

        match producer().await {
            Ok(data) => Ok(self.set(key, data, ttl_secs)),
            Err(e) => {
                warn!("Cache fetch error for '{}': {}", key, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use huskly_market_data::Asset;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    struct MockClock {
        now: AtomicI64,
    }

    impl MockClock {
        fn new(start: i64) -> Self {
            Self {
                now: AtomicI64::new(start),
            }
        }

        fn advance(&self, secs: i64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for MockClock {
        fn now_secs(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }

    /// Substrate that fails every operation.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("disk on fire".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".to_string()))
        }
        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".to_string()))
        }
    }

    fn cache_with_clock(clock: Arc<MockClock>) -> ExpiringCache {
        ExpiringCache::with_clock(Arc::new(MemoryStore::new()), clock)
    }

    #[test]
    fn test_get_after_set_returns_value() {
        let clock = Arc::new(MockClock::new(1_000));
        let cache = cache_with_clock(clock);

        cache.set("greeting", "hello".to_string(), 60);
        assert_eq!(cache.get::<String>("greeting"), Some("hello".to_string()));
    }

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let clock = Arc::new(MockClock::new(1_000));
        let cache = cache_with_clock(clock.clone());

        cache.set("k", 42u32, 60);
        clock.advance(59);
        assert_eq!(cache.get::<u32>("k"), Some(42));

        // Expired exactly at the boundary second.
        clock.advance(1);
        assert_eq!(cache.get::<u32>("k"), None);

        // The expired entry was deleted, not merely hidden - rolling the
        // clock back must not resurrect it.
        clock.advance(-30);
        assert_eq!(cache.get::<u32>("k"), None);
    }

    #[test]
    fn test_malformed_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store.set("k", "not json").unwrap();
        let cache = ExpiringCache::new(store);
        assert_eq!(cache.get::<u32>("k"), None);
    }

    #[test]
    fn test_set_on_broken_store_still_returns_data() {
        let cache = ExpiringCache::with_clock(Arc::new(BrokenStore), Arc::new(MockClock::new(0)));
        let data = vec!["a".to_string(), "b".to_string()];
        let returned = cache.set("k", data.clone(), 60);
        assert_eq!(returned, data);
    }

    #[test]
    fn test_get_on_broken_store_is_a_miss() {
        let cache = ExpiringCache::with_clock(Arc::new(BrokenStore), Arc::new(MockClock::new(0)));
        assert_eq!(cache.get::<u32>("k"), None);
        // remove and clear must not panic either
        cache.remove("k");
        cache.clear();
    }

    #[tokio::test]
    async fn test_fetch_through_invokes_producer_once() {
        let clock = Arc::new(MockClock::new(1_000));
        let cache = cache_with_clock(clock);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<u32, Error> = cache
                .fetch_through("k", 60, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_through_propagates_producer_error_uncached() {
        let clock = Arc::new(MockClock::new(1_000));
        let cache = cache_with_clock(clock);

        let result: Result<u32, Error> = cache
            .fetch_through("k", 60, || async {
                Err(Error::Unexpected("upstream down".to_string()))
            })
            .await;
        assert!(result.is_err());

        // Nothing was cached: the next call runs the producer again.
        let result: Result<u32, Error> = cache.fetch_through("k", 60, || async { Ok(9) }).await;
        assert_eq!(result.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_fetch_through_refetches_after_expiry() {
        let clock = Arc::new(MockClock::new(1_000));
        let cache = cache_with_clock(clock.clone());
        let calls = AtomicUsize::new(0);

        let cache = &cache;
        let fetch = || {
            let calls = &calls;
            cache.fetch_through("k", 60, move || async move {
                Ok::<_, Error>(calls.fetch_add(1, Ordering::SeqCst))
            })
        };

        fetch().await.unwrap();
        clock.advance(61);
        fetch().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_round_trip_preserves_decimal_strings() {
        let clock = Arc::new(MockClock::new(1_000));
        let cache = cache_with_clock(clock);

        let mut asset = Asset::stock("FXAIX", "Fidelity 500 Index Fund", dec!(171.2345678901), dec!(-0.0700000001));
        asset.market_cap_usd = dec!(123456789.000000000000000001);
        let assets = vec![asset];

        cache.set("assets", assets.clone(), 60);
        let back: Vec<Asset> = cache.get("assets").unwrap();
        assert_eq!(back, assets);
        assert_eq!(back[0].price_usd.to_string(), "171.2345678901");
    }
}
