//! Access-code login with brute-force lockout.
//!
//! Each browser gets its own session blob in key/value storage, addressed by
//! the client id carried in its cookie. Lockout expiry is evaluated lazily on
//! every query; there is no background timer.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics::counter;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    application::storage::{KeyValueStorage, StorageError},
    domain::session::{LockoutPolicy, SessionState, SessionStatus},
    util::clock::Clock,
};

const STORAGE_KEY_PREFIX: &str = "auth_status";

/// Session blobs kept before stale ones are pruned.
pub const DEFAULT_SESSION_LIMIT: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(limit) => limit,
    None => NonZeroUsize::MIN,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The shared secret typed into the login form.
#[derive(Clone)]
pub struct AccessCode(Option<String>);

impl AccessCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(Some(code.into()))
    }

    /// A code that never matches; every attempt counts as a failure.
    pub fn unset() -> Self {
        Self(None)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    fn matches(&self, candidate: &str) -> bool {
        match self.0.as_deref() {
            Some(secret) => bool::from(secret.as_bytes().ct_eq(candidate.as_bytes())),
            None => false,
        }
    }
}

impl fmt::Debug for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.is_set() { "<redacted>" } else { "<unset>" };
        f.debug_tuple("AccessCode").field(&shown).finish()
    }
}

/// Opaque identifier for one browser's session blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn storage_key(&self) -> String {
        format!("{STORAGE_KEY_PREFIX}:{}", self.0)
    }
}

/// What one submitted access code did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Granted,
    Mismatch { locked_now: bool },
    RejectedWhileLocked,
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
    access_code: AccessCode,
    session_limit: NonZeroUsize,
    guard: Mutex<()>,
}

impl SessionStore {
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
        policy: LockoutPolicy,
        access_code: AccessCode,
    ) -> Self {
        Self {
            storage,
            clock,
            policy,
            access_code,
            session_limit: DEFAULT_SESSION_LIMIT,
            guard: Mutex::new(()),
        }
    }

    /// Cap the number of persisted session blobs.
    pub fn with_session_limit(mut self, limit: NonZeroUsize) -> Self {
        self.session_limit = limit;
        self
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Whether an access code was configured at all.
    pub fn is_configured(&self) -> bool {
        self.access_code.is_set()
    }

    /// Current state after applying any pending lockout expiry.
    pub async fn state(&self, client: &ClientId) -> Result<SessionState, SessionError> {
        self.with_state(client, |_, _| ())
            .await
            .map(|(state, ())| state)
    }

    pub async fn status(&self, client: &ClientId) -> Result<SessionStatus, SessionError> {
        let now = self.clock.now();
        self.state(client).await.map(|state| state.status(now))
    }

    pub async fn is_authenticated(&self, client: &ClientId) -> Result<bool, SessionError> {
        self.state(client).await.map(|state| state.is_authenticated)
    }

    pub async fn is_locked_out(&self, client: &ClientId) -> Result<bool, SessionError> {
        let now = self.clock.now();
        self.state(client).await.map(|state| state.is_locked_out(now))
    }

    /// Minutes until the lockout lifts, rounded up; zero when not locked out.
    pub async fn lockout_time_remaining(&self, client: &ClientId) -> Result<u64, SessionError> {
        let now = self.clock.now();
        self.state(client)
            .await
            .map(|state| state.lockout_minutes_remaining(now))
    }

    /// Submit an access code. A mismatch is `Ok(false)`, never an error.
    ///
    /// While locked out the code is not checked and no attempt is consumed.
    pub async fn login(&self, client: &ClientId, code: &str) -> Result<bool, SessionError> {
        let policy = self.policy;
        let access_code = &self.access_code;

        let (_, attempt) = self
            .with_state(client, move |state, now| {
                if state.is_locked_out(now) {
                    return Attempt::RejectedWhileLocked;
                }

                if access_code.matches(code) {
                    state.grant();
                    Attempt::Granted
                } else {
                    state.record_failure(&policy, now);
                    Attempt::Mismatch {
                        locked_now: state.is_locked_out(now),
                    }
                }
            })
            .await?;

        match attempt {
            Attempt::Granted => {
                info!(target = "folio::session", client = client.as_str(), "admin login");
            }
            Attempt::Mismatch { locked_now } => {
                counter!("folio_login_failed_total").increment(1);
                if locked_now {
                    counter!("folio_login_lockout_total").increment(1);
                    warn!(
                        target = "folio::session",
                        client = client.as_str(),
                        "admin login locked out"
                    );
                }
            }
            Attempt::RejectedWhileLocked => {
                debug!(
                    target = "folio::session",
                    client = client.as_str(),
                    "login ignored during lockout"
                );
            }
        }

        Ok(attempt == Attempt::Granted)
    }

    pub async fn logout(&self, client: &ClientId) -> Result<(), SessionError> {
        self.with_state(client, |state, _| state.reset())
            .await
            .map(|_| ())
    }

    /// Load, expire, mutate and persist a session blob as one step.
    ///
    /// Blank sessions are removed from storage instead of written.
    async fn with_state<R>(
        &self,
        client: &ClientId,
        mutate: impl FnOnce(&mut SessionState, OffsetDateTime) -> R,
    ) -> Result<(SessionState, R), SessionError> {
        let _guard = self.guard.lock().await;
        let key = client.storage_key();
        let now = self.clock.now();

        let stored = self.load(&key).await?;
        let original = stored.clone().unwrap_or_default();
        let mut state = original.clone();
        state.expire_lockout(now);
        let result = mutate(&mut state, now);

        if state.is_blank() {
            if stored.is_some() {
                self.storage.remove(&key).await?;
            }
        } else if state != original {
            if stored.is_none() {
                self.make_room(now).await?;
            }
            let payload = serde_json::to_string(&state)
                .map_err(|err| StorageError::Corrupt(err.to_string()))?;
            self.storage.set(&key, &payload).await?;
        }

        Ok((state, result))
    }

    /// Prune blobs once the limit is reached, so a new one fits.
    ///
    /// Blank and expired blobs go first, then anonymous blobs holding only
    /// failed attempts. Authenticated and locked-out blobs are kept.
    async fn make_room(&self, now: OffsetDateTime) -> Result<(), SessionError> {
        let prefix = format!("{STORAGE_KEY_PREFIX}:");
        let keys = self.storage.keys(&prefix).await?;
        let limit = self.session_limit.get();
        if keys.len() < limit {
            return Ok(());
        }

        let mut blank = Vec::new();
        let mut pending = Vec::new();
        for key in keys.iter() {
            let Some(mut state) = self.load(key).await? else {
                continue;
            };
            state.expire_lockout(now);
            if state.is_blank() {
                blank.push(key);
            } else if !state.is_authenticated && !state.is_locked_out(now) {
                pending.push(key);
            }
        }

        let excess = keys.len() + 1 - limit;
        let victims: Vec<&String> = blank.into_iter().chain(pending).take(excess).collect();
        for key in &victims {
            self.storage.remove(key.as_str()).await?;
        }

        counter!("folio_session_pruned_total").increment(victims.len() as u64);
        if victims.len() < excess {
            warn!(
                target = "folio::session",
                stored = keys.len() - victims.len(),
                limit,
                "session limit exceeded by active sessions"
            );
        } else {
            debug!(
                target = "folio::session",
                pruned = victims.len(),
                "pruned stale sessions"
            );
        }
        Ok(())
    }

    /// The stored blob, or `None` when absent. Unreadable blobs decode as default.
    async fn load(&self, key: &str) -> Result<Option<SessionState>, SessionError> {
        let Some(raw) = self.storage.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                warn!(
                    target = "folio::session",
                    key,
                    error = %err,
                    "discarding unreadable session state"
                );
                Ok(Some(SessionState::default()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{application::storage::MemoryStorage, util::clock::ManualClock};
    use time::{Duration, macros::datetime};

    const SECRET: &str = "open-sesame";

    fn store() -> (SessionStore, Arc<ManualClock>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 08:00 UTC)));
        let store = SessionStore::new(
            storage.clone(),
            clock.clone(),
            LockoutPolicy::default(),
            AccessCode::new(SECRET),
        );
        (store, clock, storage)
    }

    fn client() -> ClientId {
        ClientId::new("browser-1")
    }

    async fn session_keys(storage: &MemoryStorage) -> Vec<String> {
        storage.keys("auth_status:").await.expect("keys")
    }

    #[tokio::test]
    async fn starts_anonymous() {
        let (store, _, storage) = store();
        assert_eq!(
            store.status(&client()).await.expect("status"),
            SessionStatus::Anonymous { attempts: 0 }
        );
        assert!(!store.is_authenticated(&client()).await.expect("auth"));
        assert!(session_keys(&storage).await.is_empty());
    }

    #[tokio::test]
    async fn correct_code_authenticates_and_resets_attempts() {
        let (store, _, _) = store();
        assert!(!store.login(&client(), "nope").await.expect("login"));
        assert!(store.login(&client(), SECRET).await.expect("login"));

        let state = store.state(&client()).await.expect("state");
        assert!(state.is_authenticated);
        assert_eq!(state.attempts, 0);
    }

    #[tokio::test]
    async fn third_failure_locks_out_and_lockout_is_not_extended() {
        let (store, clock, _) = store();
        for _ in 0..2 {
            assert!(!store.login(&client(), "wrong").await.expect("login"));
            assert!(!store.is_locked_out(&client()).await.expect("locked"));
        }
        assert!(!store.login(&client(), "wrong").await.expect("login"));
        assert!(store.is_locked_out(&client()).await.expect("locked"));
        let deadline = store
            .state(&client())
            .await
            .expect("state")
            .lockout_until
            .expect("deadline");

        clock.advance(Duration::minutes(5));
        assert!(!store.login(&client(), SECRET).await.expect("login"));
        let state = store.state(&client()).await.expect("state");
        assert_eq!(state.attempts, 3);
        assert_eq!(state.lockout_until, Some(deadline));
        assert_eq!(
            store.lockout_time_remaining(&client()).await.expect("remaining"),
            10
        );
    }

    #[tokio::test]
    async fn lockout_clears_after_deadline_and_login_succeeds() {
        let (store, clock, _) = store();
        for _ in 0..3 {
            store.login(&client(), "wrong").await.expect("login");
        }
        let remaining = store.lockout_time_remaining(&client()).await.expect("remaining");
        assert!(remaining > 0 && remaining <= 15);

        clock.advance(Duration::minutes(14) + Duration::seconds(59));
        assert!(store.is_locked_out(&client()).await.expect("locked"));

        clock.advance(Duration::seconds(2));
        assert!(!store.is_locked_out(&client()).await.expect("locked"));
        assert_eq!(store.state(&client()).await.expect("state").attempts, 0);
        assert!(store.login(&client(), SECRET).await.expect("login"));
    }

    #[tokio::test]
    async fn logout_resets_everything_and_drops_the_blob() {
        let (store, _, storage) = store();
        store.login(&client(), "wrong").await.expect("login");
        store.login(&client(), SECRET).await.expect("login");
        assert_eq!(session_keys(&storage).await.len(), 1);

        store.logout(&client()).await.expect("logout");
        assert_eq!(
            store.state(&client()).await.expect("state"),
            SessionState::default()
        );
        assert!(session_keys(&storage).await.is_empty());
    }

    #[tokio::test]
    async fn expired_lockout_drops_the_blob() {
        let (store, clock, storage) = store();
        for _ in 0..3 {
            store.login(&client(), "wrong").await.expect("login");
        }
        assert_eq!(session_keys(&storage).await.len(), 1);

        clock.advance(Duration::minutes(15));
        assert!(!store.is_locked_out(&client()).await.expect("locked"));
        assert!(session_keys(&storage).await.is_empty());
    }

    #[tokio::test]
    async fn clients_do_not_share_state() {
        let (store, _, _) = store();
        for _ in 0..3 {
            store.login(&client(), "wrong").await.expect("login");
        }
        let other = ClientId::new("browser-2");
        assert!(!store.is_locked_out(&other).await.expect("locked"));
        assert!(store.login(&other, SECRET).await.expect("login"));
    }

    #[tokio::test]
    async fn session_limit_prunes_anonymous_attempts_first() {
        let (store, _, storage) = store();
        let store = store.with_session_limit(NonZeroUsize::new(3).expect("non-zero"));

        let admin = ClientId::new("a-admin");
        let locked = ClientId::new("b-locked");
        assert!(store.login(&admin, SECRET).await.expect("login"));
        for _ in 0..3 {
            store.login(&locked, "wrong").await.expect("login");
        }
        for n in 0..5 {
            let stranger = ClientId::new(format!("c-stranger-{n}"));
            store.login(&stranger, "wrong").await.expect("login");
        }

        let keys = session_keys(&storage).await;
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"auth_status:a-admin".to_string()));
        assert!(keys.contains(&"auth_status:b-locked".to_string()));
        assert!(store.is_authenticated(&admin).await.expect("auth"));
        assert!(store.is_locked_out(&locked).await.expect("locked"));
    }

    #[tokio::test]
    async fn unset_code_never_matches() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(datetime!(2024-06-01 08:00 UTC)));
        let store = SessionStore::new(storage, clock, LockoutPolicy::default(), AccessCode::unset());
        assert!(!store.login(&client(), "").await.expect("login"));
        assert_eq!(store.state(&client()).await.expect("state").attempts, 1);
    }

    #[tokio::test]
    async fn corrupt_blob_falls_back_to_default() {
        let (store, _, storage) = store();
        storage
            .set("auth_status:browser-1", "{oops")
            .await
            .expect("set");
        assert_eq!(
            store.state(&client()).await.expect("state"),
            SessionState::default()
        );
        assert!(session_keys(&storage).await.is_empty());
    }

    #[tokio::test]
    async fn blob_is_persisted_under_client_key() {
        let (store, _, storage) = store();
        store.login(&client(), SECRET).await.expect("login");
        let raw = storage
            .get("auth_status:browser-1")
            .await
            .expect("get")
            .expect("stored");
        assert!(raw.contains(r#""isAuthenticated":true"#), "{raw}");
    }
}
