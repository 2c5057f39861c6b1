use std::sync::Arc;

use folio::{
    application::{
        session::{AccessCode, ClientId, SessionStore},
        storage::KeyValueStorage,
    },
    cache::ExpiringCache,
    domain::session::{LockoutPolicy, SessionStatus},
    infra::storage::FileStorage,
    util::clock::ManualClock,
};
use serde::{Deserialize, Serialize};
use time::{Duration, macros::datetime};

const SECRET: &str = "letmein";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Greeting {
    text: String,
}

async fn open(path: &std::path::Path) -> Arc<dyn KeyValueStorage> {
    Arc::new(FileStorage::open(path).await.expect("open"))
}

async fn sessions(path: &std::path::Path, clock: Arc<ManualClock>) -> SessionStore {
    SessionStore::new(
        open(path).await,
        clock,
        LockoutPolicy::default(),
        AccessCode::new(SECRET),
    )
}

async fn stored_sessions(path: &std::path::Path) -> Vec<String> {
    open(path).await.keys("auth_status:").await.expect("keys")
}

#[tokio::test]
async fn lockout_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let clock = Arc::new(ManualClock::new(datetime!(2025-06-01 12:00 UTC)));
    let client = ClientId::new("browser-a");

    {
        let store = sessions(&path, clock.clone()).await;
        for _ in 0..3 {
            assert!(!store.login(&client, "wrong").await.expect("login"));
        }
        assert!(store.is_locked_out(&client).await.expect("locked"));
    }

    let reopened = sessions(&path, clock.clone()).await;
    assert!(matches!(
        reopened.status(&client).await.expect("status"),
        SessionStatus::LockedOut { .. }
    ));
    assert_eq!(
        reopened.lockout_time_remaining(&client).await.expect("remaining"),
        15
    );

    clock.advance(Duration::minutes(15));
    assert!(reopened.login(&client, SECRET).await.expect("login"));
    assert!(reopened.is_authenticated(&client).await.expect("auth"));
}

#[tokio::test]
async fn authenticated_session_is_scoped_to_its_client() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("state.json");
    let clock = Arc::new(ManualClock::new(datetime!(2025-06-01 12:00 UTC)));

    let store = sessions(&path, clock.clone()).await;
    assert!(
        store
            .login(&ClientId::new("browser-a"), SECRET)
            .await
            .expect("login")
    );

    let reopened = sessions(&path, clock).await;
    assert!(
        reopened
            .is_authenticated(&ClientId::new("browser-a"))
            .await
            .expect("auth")
    );
    assert!(
        !reopened
            .is_authenticated(&ClientId::new("browser-b"))
            .await
            .expect("auth")
    );
}

#[tokio::test]
async fn logout_and_expiry_leave_no_session_behind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let clock = Arc::new(ManualClock::new(datetime!(2025-06-01 12:00 UTC)));
    let admin = ClientId::new("browser-a");
    let intruder = ClientId::new("browser-b");

    {
        let store = sessions(&path, clock.clone()).await;
        assert!(store.login(&admin, SECRET).await.expect("login"));
        for _ in 0..3 {
            store.login(&intruder, "wrong").await.expect("login");
        }
    }
    assert_eq!(stored_sessions(&path).await.len(), 2);

    {
        let store = sessions(&path, clock.clone()).await;
        store.logout(&admin).await.expect("logout");
        clock.advance(Duration::minutes(15));
        assert!(!store.is_locked_out(&intruder).await.expect("locked"));
    }
    assert!(stored_sessions(&path).await.is_empty());
}

#[tokio::test]
async fn anonymous_sessions_stay_bounded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let clock = Arc::new(ManualClock::new(datetime!(2025-06-01 12:00 UTC)));
    let limit = std::num::NonZeroUsize::new(20).expect("non-zero");
    let store = sessions(&path, clock).await.with_session_limit(limit);

    for n in 0..200 {
        let stranger = ClientId::new(format!("stranger-{n}"));
        assert!(!store.login(&stranger, "guess").await.expect("login"));
    }

    assert_eq!(stored_sessions(&path).await.len(), 20);
}

#[tokio::test]
async fn cached_entries_persist_until_they_expire() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let clock = Arc::new(ManualClock::new(datetime!(2025-06-01 12:00 UTC)));
    let greeting = Greeting {
        text: "hello".to_string(),
    };

    {
        let cache = ExpiringCache::new(open(&path).await, clock.clone(), Duration::hours(24));
        cache.set("greeting", &greeting).await.expect("set");
    }

    let cache: ExpiringCache<Greeting> =
        ExpiringCache::new(open(&path).await, clock.clone(), Duration::hours(24));
    assert_eq!(cache.get("greeting").await, Some(greeting));

    clock.advance(Duration::hours(25));
    assert_eq!(cache.get("greeting").await, None);
}
