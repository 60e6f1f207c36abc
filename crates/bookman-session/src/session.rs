//! Session data structure

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::csrf::mint_token;

/// The signed-in account a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Cookie value; replaced on login and periodic rotation
    pub id: String,
    /// Present once the browser has logged in
    pub user: Option<SessionUser>,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub last_regeneration: DateTime<Utc>,
    /// One-shot notice shown on the next rendered page
    pub flash: Option<String>,
}

impl Session {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: mint_token(),
            user: None,
            csrf_token: mint_token(),
            created_at: now,
            last_activity: now,
            last_regeneration: now,
            flash: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity > idle_timeout
    }

    pub fn needs_rotation(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        now - self.last_regeneration > interval
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn remint_csrf(&mut self) -> &str {
        self.csrf_token = mint_token();
        &self.csrf_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_anonymous() {
        let now = Utc::now();
        let session = Session::new(now);
        assert!(!session.is_authenticated());
        assert_eq!(session.username(), None);
        assert_ne!(session.id, session.csrf_token);
        assert_eq!(session.last_activity, now);
    }

    #[test]
    fn test_idle_and_rotation_windows() {
        let start = Utc::now();
        let session = Session::new(start);

        assert!(!session.is_idle(start + Duration::minutes(30), Duration::minutes(30)));
        assert!(session.is_idle(
            start + Duration::minutes(30) + Duration::seconds(1),
            Duration::minutes(30)
        ));

        assert!(!session.needs_rotation(start + Duration::minutes(5), Duration::minutes(5)));
        assert!(session.needs_rotation(start + Duration::minutes(6), Duration::minutes(5)));
    }

    #[test]
    fn test_remint_csrf_changes_token() {
        let mut session = Session::new(Utc::now());
        let old = session.csrf_token.clone();
        let new = session.remint_csrf().to_string();
        assert_ne!(old, new);
        assert_eq!(session.csrf_token, new);
    }
}
