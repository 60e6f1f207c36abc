//! Session Store
//!
//! In-memory map from session id to `Session`. Expired entries are swept
//! whenever a new session is started. Anonymous sessions idle out sooner
//! than signed-in ones so cookieless traffic cannot pile up.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::csrf::{mint_token, tokens_match};
use crate::error::SessionError;
use crate::session::{Session, SessionUser};
use crate::Result;

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Inactivity after which a signed-in session is destroyed
    pub idle_timeout: Duration,
    /// Inactivity after which a session without a user is destroyed
    pub anonymous_timeout: Duration,
    /// Age of the current id after which an authenticated session is rotated
    pub rotate_every: Duration,
    /// How long a rotated-away id still resolves to its replacement
    pub rotation_grace: Duration,
}

impl SessionPolicy {
    fn timeout_for(&self, session: &Session) -> Duration {
        if session.is_authenticated() {
            self.idle_timeout
        } else {
            self.anonymous_timeout
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(30),
            anonymous_timeout: Duration::minutes(10),
            rotate_every: Duration::minutes(5),
            rotation_grace: Duration::seconds(30),
        }
    }
}

/// Where a periodically rotated id now points.
#[derive(Debug, Clone)]
struct Superseded {
    new_id: String,
    at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    superseded: HashMap<String, Superseded>,
}

impl Inner {
    /// Follow a rotated-away id to its replacement while the grace window
    /// is open. Requests already in flight with the old cookie land on the
    /// same session instead of being signed out.
    fn resolve(&self, id: &str, now: DateTime<Utc>, grace: Duration) -> Option<String> {
        if self.sessions.contains_key(id) {
            return Some(id.to_string());
        }
        self.superseded
            .get(id)
            .filter(|s| now - s.at <= grace)
            .map(|s| s.new_id.clone())
            .filter(|new_id| self.sessions.contains_key(new_id))
    }

    fn rotate(&mut self, id: &str, now: DateTime<Utc>) -> Result<Session> {
        let mut session = self.sessions.remove(id).ok_or(SessionError::NotFound)?;

        session.id = mint_token();
        session.last_regeneration = now;
        self.sessions.insert(session.id.clone(), session.clone());

        tracing::debug!(username = ?session.username(), "Rotated session id");
        Ok(session)
    }
}

pub struct SessionStore {
    policy: SessionPolicy,
    inner: Arc<RwLock<Inner>>,
}

impl SessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Create a fresh anonymous session.
    pub fn start(&self, now: DateTime<Utc>) -> Session {
        let session = Session::new(now);
        let policy = self.policy;
        let mut inner = self.inner.write();

        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|_, s| !s.is_idle(now, policy.timeout_for(s)));
        let swept = before - inner.sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "Swept idle sessions");
        }
        inner
            .superseded
            .retain(|_, s| now - s.at <= policy.rotation_grace);

        inner.sessions.insert(session.id.clone(), session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner.read().sessions.get(id).cloned()
    }

    /// Resume the cookie's session for a public page, or start a new one.
    /// Idle sessions are replaced rather than resumed.
    pub fn open(&self, id: Option<&str>, now: DateTime<Utc>) -> Session {
        if let Some(id) = id {
            let mut inner = self.inner.write();
            if let Some(session) = inner.sessions.get_mut(id) {
                if !session.is_idle(now, self.policy.timeout_for(session)) {
                    session.touch(now);
                    return session.clone();
                }
                inner.sessions.remove(id);
            }
        }
        self.start(now)
    }

    /// Gate a protected page. Any failure destroys the session so the
    /// browser starts over at the login screen. May return a session with a
    /// rotated id.
    pub fn authorize(&self, id: Option<&str>, now: DateTime<Utc>) -> Result<Session> {
        let id = id.ok_or(SessionError::Unauthenticated)?;
        let mut inner = self.inner.write();
        let id = inner
            .resolve(id, now, self.policy.rotation_grace)
            .ok_or(SessionError::Unauthenticated)?;

        let session = inner
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::Unauthenticated)?;

        if !session.is_authenticated() {
            inner.sessions.remove(&id);
            return Err(SessionError::Unauthenticated);
        }

        if session.is_idle(now, self.policy.idle_timeout) {
            tracing::info!(username = ?session.username(), "Session timed out");
            inner.sessions.remove(&id);
            return Err(SessionError::Expired);
        }

        session.touch(now);
        if !session.needs_rotation(now, self.policy.rotate_every) {
            return Ok(session.clone());
        }

        let rotated = inner.rotate(&id, now)?;
        inner.superseded.insert(
            id,
            Superseded {
                new_id: rotated.id.clone(),
                at: now,
            },
        );
        Ok(rotated)
    }

    /// Move the session to a new id, keeping its contents. The old id stops
    /// working immediately.
    pub fn rotate(&self, id: &str, now: DateTime<Utc>) -> Result<Session> {
        self.inner.write().rotate(id, now)
    }

    /// Attach a user after a successful login: new id, new CSRF token.
    pub fn authenticate(&self, id: &str, user: SessionUser, now: DateTime<Utc>) -> Result<Session> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        session.user = Some(user);
        session.touch(now);
        session.remint_csrf();
        inner.rotate(id, now)
    }

    pub fn verify_csrf(&self, id: &str, submitted: &str) -> Result<()> {
        let inner = self.inner.read();
        let session = inner.sessions.get(id).ok_or(SessionError::NotFound)?;

        if tokens_match(&session.csrf_token, submitted) {
            Ok(())
        } else {
            Err(SessionError::CsrfMismatch)
        }
    }

    pub fn remint_csrf(&self, id: &str) -> Result<String> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        Ok(session.remint_csrf().to_string())
    }

    pub fn set_flash(&self, id: &str, message: impl Into<String>) -> Result<()> {
        let mut inner = self.inner.write();
        let session = inner.sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        session.flash = Some(message.into());
        Ok(())
    }

    /// Read and clear the pending flash message.
    pub fn take_flash(&self, id: &str) -> Option<String> {
        self.inner
            .write()
            .sessions
            .get_mut(id)
            .and_then(|session| session.flash.take())
    }

    pub fn destroy(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        inner.superseded.retain(|_, s| s.new_id != id);
        inner.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn admin() -> SessionUser {
        SessionUser {
            id: 1,
            username: "admin".to_string(),
        }
    }

    fn signed_in(store: &SessionStore) -> Session {
        let anon = store.start(t0());
        store.authenticate(&anon.id, admin(), t0()).unwrap()
    }

    #[test]
    fn test_authenticate_rotates_id_and_token() {
        let store = SessionStore::new(SessionPolicy::default());
        let anon = store.start(t0());

        let session = store.authenticate(&anon.id, admin(), t0()).unwrap();
        assert_ne!(session.id, anon.id);
        assert_ne!(session.csrf_token, anon.csrf_token);
        assert_eq!(session.username(), Some("admin"));

        // Old id is dead
        assert!(store.get(&anon.id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_authorize_requires_user() {
        let store = SessionStore::new(SessionPolicy::default());
        let anon = store.start(t0());

        assert_eq!(
            store.authorize(Some(&anon.id), t0()).unwrap_err(),
            SessionError::Unauthenticated
        );
        assert!(store.get(&anon.id).is_none());

        assert_eq!(
            store.authorize(None, t0()).unwrap_err(),
            SessionError::Unauthenticated
        );
        assert_eq!(
            store.authorize(Some("forged"), t0()).unwrap_err(),
            SessionError::Unauthenticated
        );
    }

    #[test]
    fn test_idle_timeout_destroys_session() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = signed_in(&store);

        let later = t0() + Duration::minutes(31);
        assert_eq!(
            store.authorize(Some(&session.id), later).unwrap_err(),
            SessionError::Expired
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_activity_keeps_session_alive() {
        let store = SessionStore::new(SessionPolicy {
            rotate_every: Duration::hours(24),
            ..SessionPolicy::default()
        });
        let session = signed_in(&store);

        let mut now = t0();
        for _ in 0..4 {
            now += Duration::minutes(20);
            let resumed = store.authorize(Some(&session.id), now).unwrap();
            assert_eq!(resumed.id, session.id);
        }
    }

    #[test]
    fn test_periodic_rotation_keeps_state() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = signed_in(&store);
        store.set_flash(&session.id, "Saved").unwrap();

        let same = store
            .authorize(Some(&session.id), t0() + Duration::minutes(4))
            .unwrap();
        assert_eq!(same.id, session.id);

        let rotated = store
            .authorize(Some(&session.id), t0() + Duration::minutes(6))
            .unwrap();
        assert_ne!(rotated.id, session.id);
        assert_eq!(rotated.user, session.user);
        assert_eq!(rotated.csrf_token, session.csrf_token);
        assert_eq!(store.take_flash(&rotated.id).as_deref(), Some("Saved"));
        assert!(store.get(&session.id).is_none());
    }

    #[test]
    fn test_verify_csrf() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = store.start(t0());

        assert!(store.verify_csrf(&session.id, &session.csrf_token).is_ok());
        assert_eq!(
            store.verify_csrf(&session.id, "deadbeef").unwrap_err(),
            SessionError::CsrfMismatch
        );
        assert_eq!(
            store.verify_csrf(&session.id, "").unwrap_err(),
            SessionError::CsrfMismatch
        );
        assert_eq!(
            store.verify_csrf("unknown", &session.csrf_token).unwrap_err(),
            SessionError::NotFound
        );

        let fresh = store.remint_csrf(&session.id).unwrap();
        assert!(store.verify_csrf(&session.id, &session.csrf_token).is_err());
        assert!(store.verify_csrf(&session.id, &fresh).is_ok());
    }

    #[test]
    fn test_flash_is_shown_once() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = store.start(t0());

        store.set_flash(&session.id, "Book added").unwrap();
        assert_eq!(store.take_flash(&session.id).as_deref(), Some("Book added"));
        assert_eq!(store.take_flash(&session.id), None);
    }

    #[test]
    fn test_open_replaces_idle_session() {
        let store = SessionStore::new(SessionPolicy::default());
        let first = store.open(None, t0());

        let resumed = store.open(Some(&first.id), t0() + Duration::minutes(5));
        assert_eq!(resumed.id, first.id);

        let replaced = store.open(Some(&first.id), t0() + Duration::minutes(50));
        assert_ne!(replaced.id, first.id);
        assert!(store.get(&first.id).is_none());
    }

    #[test]
    fn test_start_sweeps_idle_sessions() {
        let store = SessionStore::new(SessionPolicy::default());
        store.start(t0());
        store.start(t0());
        assert_eq!(store.len(), 2);

        store.start(t0() + Duration::hours(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_anonymous_sessions_idle_out_first() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = signed_in(&store);
        for _ in 0..50 {
            store.open(None, t0());
        }
        assert_eq!(store.len(), 51);

        // Past the anonymous timeout but well inside the signed-in one
        let later = t0() + Duration::minutes(11);
        store.open(None, later);
        assert_eq!(store.len(), 2);
        assert!(store.authorize(Some(&session.id), later).is_ok());
    }

    #[test]
    fn test_open_drops_stale_anonymous_session() {
        let store = SessionStore::new(SessionPolicy::default());
        let first = store.open(None, t0());

        let replaced = store.open(Some(&first.id), t0() + Duration::minutes(11));
        assert_ne!(replaced.id, first.id);
    }

    #[test]
    fn test_racing_rotation_keeps_everyone_signed_in() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = signed_in(&store);
        let due = t0() + Duration::minutes(6);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let id = session.id.clone();
                std::thread::spawn(move || store.authorize(Some(&id), due))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let first = results[0].as_ref().unwrap().id.clone();
        for result in &results {
            assert_eq!(result.as_ref().unwrap().id, first);
        }
        assert_ne!(first, session.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rotated_id_expires_after_grace() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = signed_in(&store);
        let due = t0() + Duration::minutes(6);
        let rotated = store.authorize(Some(&session.id), due).unwrap();

        let follow = store
            .authorize(Some(&session.id), due + Duration::seconds(10))
            .unwrap();
        assert_eq!(follow.id, rotated.id);

        assert_eq!(
            store
                .authorize(Some(&session.id), due + Duration::minutes(1))
                .unwrap_err(),
            SessionError::Unauthenticated
        );
        assert!(store.authorize(Some(&rotated.id), due + Duration::minutes(1)).is_ok());
    }

    #[test]
    fn test_destroy() {
        let store = SessionStore::new(SessionPolicy::default());
        let session = signed_in(&store);
        assert!(store.destroy(&session.id));
        assert!(!store.destroy(&session.id));

        // A logged-out session is not reachable through its previous id
        let session = signed_in(&store);
        let rotated = store
            .authorize(Some(&session.id), t0() + Duration::minutes(6))
            .unwrap();
        assert!(store.destroy(&rotated.id));
        assert!(store
            .authorize(Some(&session.id), t0() + Duration::minutes(6))
            .is_err());
    }
}
