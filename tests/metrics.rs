use std::sync::Arc;

use folio::{
    application::{
        session::{AccessCode, ClientId, SessionStore},
        storage::{KeyValueStorage, MemoryStorage},
    },
    cache::{DEFAULT_EXPIRY, ExpiringCache},
    domain::session::LockoutPolicy,
    util::clock::SystemClock,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

fn counter_total(snapshot: &[(String, DebugValue)], name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| match value {
            DebugValue::Counter(count) => *count,
            _ => 0,
        })
        .sum()
}

#[tokio::test]
async fn cache_and_login_paths_emit_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    let clock = Arc::new(SystemClock);

    let cache: ExpiringCache<String> =
        ExpiringCache::new(storage.clone(), clock.clone(), DEFAULT_EXPIRY);
    assert_eq!(cache.get("about").await, None);
    cache.set("about", &"profile".to_string()).await.expect("set");
    assert_eq!(cache.get("about").await.as_deref(), Some("profile"));

    let sessions = SessionStore::new(
        storage,
        clock,
        LockoutPolicy::default(),
        AccessCode::new("secret"),
    );
    let client = ClientId::new("browser");
    for _ in 0..3 {
        assert!(!sessions.login(&client, "wrong").await.expect("login"));
    }
    // Submissions during the lockout are ignored, even with the right code.
    for _ in 0..4 {
        assert!(!sessions.login(&client, "secret").await.expect("login"));
    }
    assert!(!sessions.login(&client, "wrong").await.expect("login"));

    let snapshot: Vec<(String, DebugValue)> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| (key.key().name().to_string(), value))
        .collect();

    assert_eq!(counter_total(&snapshot, "folio_cache_miss_total"), 1);
    assert_eq!(counter_total(&snapshot, "folio_cache_hit_total"), 1);
    assert_eq!(counter_total(&snapshot, "folio_login_failed_total"), 3);
    assert_eq!(counter_total(&snapshot, "folio_login_lockout_total"), 1);
}
