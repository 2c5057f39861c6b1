//! Persisted admin session state and its lockout transitions.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Limits applied to failed access code submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lockout: Duration::minutes(15),
        }
    }
}

/// Session blob as persisted for one browser.
///
/// `lockout_until` is only ever set once `attempts` has reached the policy
/// maximum, and is cleared the first time it is observed to have passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub is_authenticated: bool,
    pub attempts: u32,
    /// Unix timestamp in milliseconds.
    #[serde(default)]
    pub lockout_until: Option<i64>,
}

/// Observable state of a session at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous { attempts: u32 },
    Authenticated,
    LockedOut { until: OffsetDateTime },
}

impl SessionState {
    pub fn lockout_deadline(&self) -> Option<OffsetDateTime> {
        self.lockout_until.and_then(from_unix_millis)
    }

    /// Clear an expired lockout. Returns `true` when the state changed.
    pub fn expire_lockout(&mut self, now: OffsetDateTime) -> bool {
        match self.lockout_deadline() {
            Some(deadline) if deadline <= now => {
                self.attempts = 0;
                self.lockout_until = None;
                true
            }
            None if self.lockout_until.is_some() => {
                self.attempts = 0;
                self.lockout_until = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_locked_out(&self, now: OffsetDateTime) -> bool {
        self.lockout_deadline()
            .is_some_and(|deadline| deadline > now)
    }

    pub fn status(&self, now: OffsetDateTime) -> SessionStatus {
        match self.lockout_deadline() {
            Some(until) if until > now => SessionStatus::LockedOut { until },
            _ if self.is_authenticated => SessionStatus::Authenticated,
            _ => SessionStatus::Anonymous {
                attempts: self.attempts,
            },
        }
    }

    /// Whole minutes until the lockout ends, rounded up; zero when not locked.
    pub fn lockout_minutes_remaining(&self, now: OffsetDateTime) -> u64 {
        match self.lockout_deadline() {
            Some(deadline) if deadline > now => {
                let millis = (deadline - now).whole_milliseconds();
                let minutes = (millis + 59_999) / 60_000;
                u64::try_from(minutes).unwrap_or(u64::MAX)
            }
            _ => 0,
        }
    }

    pub fn grant(&mut self) {
        self.is_authenticated = true;
        self.attempts = 0;
        self.lockout_until = None;
    }

    /// Record a wrong access code, entering lockout once the policy limit is hit.
    pub fn record_failure(&mut self, policy: &LockoutPolicy, now: OffsetDateTime) {
        self.is_authenticated = false;
        let attempts = self.attempts.saturating_add(1);
        if attempts >= policy.max_attempts {
            self.attempts = policy.max_attempts;
            self.lockout_until = Some(to_unix_millis(now + policy.lockout));
        } else {
            self.attempts = attempts;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Nothing worth persisting: anonymous, no failed attempts, no lockout.
    pub fn is_blank(&self) -> bool {
        !self.is_authenticated && self.attempts == 0 && self.lockout_until.is_none()
    }
}

pub fn to_unix_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

pub fn from_unix_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    #[test]
    fn failures_lock_exactly_at_the_limit() {
        let policy = LockoutPolicy::default();
        let mut state = SessionState::default();

        state.record_failure(&policy, NOW);
        state.record_failure(&policy, NOW);
        assert_eq!(state.status(NOW), SessionStatus::Anonymous { attempts: 2 });
        assert!(state.lockout_until.is_none());

        state.record_failure(&policy, NOW);
        assert_eq!(state.attempts, 3);
        assert!(state.is_locked_out(NOW));
        assert_eq!(state.lockout_minutes_remaining(NOW), 15);
    }

    #[test]
    fn remaining_minutes_round_up() {
        let policy = LockoutPolicy::default();
        let mut state = SessionState {
            attempts: 2,
            ..SessionState::default()
        };
        state.record_failure(&policy, NOW);

        let later = NOW + Duration::minutes(14) + Duration::seconds(1);
        assert_eq!(state.lockout_minutes_remaining(later), 1);
        assert_eq!(
            state.lockout_minutes_remaining(NOW + Duration::minutes(15)),
            0
        );
    }

    #[test]
    fn expire_lockout_only_after_deadline() {
        let policy = LockoutPolicy::default();
        let mut state = SessionState {
            attempts: 2,
            ..SessionState::default()
        };
        state.record_failure(&policy, NOW);

        assert!(!state.expire_lockout(NOW + Duration::minutes(14)));
        assert!(state.is_locked_out(NOW + Duration::minutes(14)));

        assert!(state.expire_lockout(NOW + Duration::minutes(15)));
        assert_eq!(state, SessionState::default());
        assert!(state.is_blank());
    }

    #[test]
    fn blob_uses_camel_case_millis() {
        let state = SessionState {
            is_authenticated: false,
            attempts: 3,
            lockout_until: Some(to_unix_millis(NOW)),
        };
        let json = serde_json::to_string(&state).expect("serializes");
        assert_eq!(
            json,
            r#"{"isAuthenticated":false,"attempts":3,"lockoutUntil":1717243200000}"#
        );
        assert_eq!(from_unix_millis(1_717_243_200_000), Some(NOW));
    }
}
