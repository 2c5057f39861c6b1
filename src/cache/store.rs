use std::marker::PhantomData;
use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use time::Duration;
use tracing::warn;

use crate::{
    application::storage::{KeyValueStorage, StorageError},
    domain::session::{from_unix_millis, to_unix_millis},
    util::clock::Clock,
};

const TIMESTAMP_SUFFIX: &str = "_timestamp";

/// Default freshness window for cached content.
pub const DEFAULT_EXPIRY: Duration = Duration::hours(24);

/// Typed cache entries in key/value storage that go stale after a fixed window.
///
/// The value is stored as JSON under the key and its store time (unix
/// milliseconds) under `<key>_timestamp`. Stale entries are ignored rather than
/// deleted; the next [`ExpiringCache::set`] replaces them.
pub struct ExpiringCache<T> {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    expiry: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for ExpiringCache<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            clock: self.clock.clone(),
            expiry: self.expiry,
            _value: PhantomData,
        }
    }
}

impl<T> ExpiringCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(storage: Arc<dyn KeyValueStorage>, clock: Arc<dyn Clock>, expiry: Duration) -> Self {
        Self {
            storage,
            clock,
            expiry,
            _value: PhantomData,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Return the cached value while it is younger than the expiry window.
    pub async fn get(&self, key: &str) -> Option<T> {
        let value = self.lookup(key).await;
        if value.is_some() {
            counter!("folio_cache_hit_total", "key" => key.to_string()).increment(1);
        } else {
            counter!("folio_cache_miss_total", "key" => key.to_string()).increment(1);
        }
        value
    }

    /// Store `value`, stamping it with the current time.
    pub async fn set(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let payload =
            serde_json::to_string(value).map_err(|err| StorageError::Corrupt(err.to_string()))?;
        let stamp = to_unix_millis(self.clock.now()).to_string();
        self.storage.set(key, &payload).await?;
        self.storage.set(&timestamp_key(key), &stamp).await
    }

    async fn lookup(&self, key: &str) -> Option<T> {
        let stored_at = match self.storage.get(&timestamp_key(key)).await {
            Ok(Some(raw)) => raw.trim().parse::<i64>().ok().and_then(from_unix_millis)?,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    target = "folio::cache",
                    key,
                    error = %err,
                    "failed to read cache timestamp"
                );
                return None;
            }
        };

        if self.clock.now() - stored_at >= self.expiry {
            return None;
        }

        let payload = match self.storage.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    target = "folio::cache",
                    key,
                    error = %err,
                    "failed to read cached value"
                );
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target = "folio::cache",
                    key,
                    error = %err,
                    "ignoring undecodable cache entry"
                );
                None
            }
        }
    }
}

fn timestamp_key(key: &str) -> String {
    format!("{key}{TIMESTAMP_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{application::storage::MemoryStorage, util::clock::ManualClock};
    use time::macros::datetime;

    fn cache() -> (ExpiringCache<Vec<String>>, Arc<ManualClock>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        let cache = ExpiringCache::new(storage.clone(), clock.clone(), DEFAULT_EXPIRY);
        (cache, clock, storage)
    }

    #[tokio::test]
    async fn value_is_served_until_the_window_closes() {
        let (cache, clock, _) = cache();
        let value = vec!["rust".to_string()];
        cache.set("aboutData", &value).await.expect("set");

        clock.advance(Duration::hours(23) + Duration::minutes(59));
        assert_eq!(cache.get("aboutData").await, Some(value));

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get("aboutData").await, None);
    }

    #[tokio::test]
    async fn set_refreshes_the_timestamp() {
        let (cache, clock, _) = cache();
        cache.set("k", &vec!["old".to_string()]).await.expect("set");
        clock.advance(Duration::hours(30));
        assert_eq!(cache.get("k").await, None);

        cache.set("k", &vec!["new".to_string()]).await.expect("set");
        assert_eq!(cache.get("k").await, Some(vec!["new".to_string()]));
    }

    #[tokio::test]
    async fn missing_or_garbled_entries_are_absent() {
        let (cache, _, storage) = cache();
        assert_eq!(cache.get("k").await, None);

        storage.set("k", "not json").await.expect("set");
        storage.set("k_timestamp", "1704067200000").await.expect("set");
        assert_eq!(cache.get("k").await, None);

        storage.set("k", r#"["ok"]"#).await.expect("set");
        storage.set("k_timestamp", "yesterday").await.expect("set");
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn companion_timestamp_key_is_written() {
        let (cache, _, storage) = cache();
        cache.set("aboutData", &vec![]).await.expect("set");
        assert_eq!(
            storage.get("aboutData_timestamp").await.expect("get").as_deref(),
            Some("1704067200000")
        );
    }
}
