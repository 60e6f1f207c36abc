//! Failed-login throttling
//!
//! Counters are keyed by caller identity (client address), not stored in the
//! browser session, so clearing cookies does not reset them.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AuthError;
use crate::Result;

#[derive(Debug, Clone, Copy)]
pub struct ThrottlePolicy {
    /// Failures inside one window that trigger a lockout
    pub max_failures: u32,
    /// Length of the lockout, and of the window failures are counted in
    pub lockout: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            lockout: Duration::minutes(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Still allowed; this many failures left before lockout
    Remaining(u32),
    LockedOut { until: DateTime<Utc> },
}

#[derive(Debug, Clone)]
struct AttemptState {
    failures: u32,
    window_start: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

impl AttemptState {
    fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.locked_until {
            Some(until) => now >= until,
            None => now - self.window_start >= window,
        }
    }
}

pub struct LoginThrottle {
    policy: ThrottlePolicy,
    attempts: Arc<Mutex<HashMap<String, AttemptState>>>,
}

impl LoginThrottle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    /// Time left on an active lockout for this caller.
    pub fn lockout_remaining(&self, key: &str, now: DateTime<Utc>) -> Option<Duration> {
        let attempts = self.attempts.lock();
        attempts
            .get(key)
            .and_then(|state| state.locked_until)
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Reject the attempt up front while a lockout is running.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Result<()> {
        match self.lockout_remaining(key, now) {
            Some(remaining) => Err(AuthError::LockedOut {
                remaining_secs: ceil_secs(remaining),
            }),
            None => Ok(()),
        }
    }

    pub fn record_failure(&self, key: &str, now: DateTime<Utc>) -> AttemptOutcome {
        let mut attempts = self.attempts.lock();
        let window = self.policy.lockout;
        attempts.retain(|_, state| !state.is_stale(now, window));

        let state = attempts.entry(key.to_string()).or_insert(AttemptState {
            failures: 0,
            window_start: now,
            locked_until: None,
        });

        if let Some(until) = state.locked_until {
            return AttemptOutcome::LockedOut { until };
        }

        state.failures += 1;
        if state.failures >= self.policy.max_failures {
            let until = now + self.policy.lockout;
            state.locked_until = Some(until);
            tracing::warn!(
                caller = %key,
                failures = state.failures,
                locked_until = %until,
                "Login locked out"
            );
            return AttemptOutcome::LockedOut { until };
        }

        AttemptOutcome::Remaining(self.policy.max_failures - state.failures)
    }

    pub fn record_success(&self, key: &str) {
        self.attempts.lock().remove(key);
    }

    pub fn tracked_callers(&self) -> usize {
        self.attempts.lock().len()
    }
}

impl Clone for LoginThrottle {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            attempts: Arc::clone(&self.attempts),
        }
    }
}

/// Whole seconds, rounded up so "0s remaining" is never shown while locked.
pub(crate) fn ceil_secs(d: Duration) -> i64 {
    let millis = d.num_milliseconds();
    (millis + 999).div_euclid(1000)
}
