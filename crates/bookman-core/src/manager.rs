//! Request-level coordinator
//!
//! `BookManager` owns every piece of server state. Handlers pass in the
//! cookie value, the caller identity and the current time; the manager runs
//! the session-security checks and then the catalog operation.

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;

use bookman_auth::{AttemptOutcome, AuthError, LoginThrottle, UserRepository};
use bookman_catalog::{Book, BookDraft, BookForm, BookRepository, CatalogError, Page};
use bookman_session::{AuthState, Session, SessionError, SessionStore, SessionUser};
use bookman_storage::Database;

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

/// Submitted login form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

pub struct BookManager {
    config: Config,
    db: Database,
    books: BookRepository,
    users: UserRepository,
    sessions: SessionStore,
    throttle: LoginThrottle,
}

impl BookManager {
    /// Open the configured database and build the managers around it.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Database::open(&config.database_path)?;
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: Config, db: Database) -> Self {
        let books = BookRepository::new(db.clone());
        let users = UserRepository::new(db.clone());
        let sessions = SessionStore::new(config.session_policy());
        let throttle = LoginThrottle::new(config.throttle_policy());

        Self {
            config,
            db,
            books,
            users,
            sessions,
            throttle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn books(&self) -> &BookRepository {
        &self.books
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    pub fn is_installed(&self) -> Result<bool> {
        Ok(self.db.is_installed()?)
    }

    // ==================== Sessions ====================

    /// Session for a public page (login form).
    pub fn open_session(&self, session_id: Option<&str>, now: DateTime<Utc>) -> Session {
        self.sessions.open(session_id, now)
    }

    /// Gate for protected pages. Fails with `Unauthenticated` or `Expired`;
    /// either way the session is gone afterwards.
    pub fn authorize(&self, session_id: Option<&str>, now: DateTime<Utc>) -> Result<Session> {
        let session = self.sessions.authorize(session_id, now)?;

        let Some(user) = session.user.as_ref() else {
            self.sessions.destroy(&session.id);
            return Err(SessionError::Unauthenticated.into());
        };

        // The account may have been removed since login
        match self.users.get_by_id(user.id)? {
            Some(stored) if stored.username == user.username => Ok(session),
            _ => {
                tracing::warn!(user_id = user.id, username = %user.username, "Session names an unknown user");
                self.sessions.destroy(&session.id);
                Err(SessionError::Unauthenticated.into())
            }
        }
    }

    pub fn auth_state(&self, session: &Session, caller: &str, now: DateTime<Utc>) -> AuthState {
        if session.is_authenticated() {
            AuthState::Authenticated
        } else if self.throttle.lockout_remaining(caller, now).is_some() {
            AuthState::LockedOut
        } else {
            AuthState::Anonymous
        }
    }

    /// Check credentials and attach the user to the session. Returns the
    /// session under its new id.
    pub fn login(
        &self,
        session_id: &str,
        caller: &str,
        form: &LoginForm,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        self.require_csrf(session_id, &form.csrf_token, caller)?;

        let session = self.sessions.get(session_id).ok_or(SessionError::NotFound)?;
        let state = self.auth_state(&session, caller, now);
        if state == AuthState::Authenticated {
            // Already signed in; credentials are not re-checked
            return Ok(session);
        }
        if !state.accepts_login() {
            self.throttle.check(caller, now)?;
        }

        let username = form.username.trim();
        match self.users.authenticate(username, &form.password) {
            Ok(user) => {
                // Concurrent failures may have locked the caller out while
                // the hash was being verified
                let current = self.auth_state(&session, caller, now);
                if !current.can_transition_to(AuthState::Authenticated) {
                    self.throttle.check(caller, now)?;
                    return Err(AuthError::InvalidCredentials.into());
                }

                self.throttle.record_success(caller);
                let session = self.sessions.authenticate(
                    session_id,
                    SessionUser {
                        id: user.id,
                        username: user.username,
                    },
                    now,
                )?;
                tracing::info!(username = %username, caller = %caller, "Login succeeded");
                Ok(session)
            }
            Err(AuthError::InvalidCredentials) => {
                match self.throttle.record_failure(caller, now) {
                    AttemptOutcome::Remaining(left) => {
                        tracing::warn!(
                            username = %username,
                            caller = %caller,
                            attempts_left = left,
                            "Login failed"
                        );
                        Err(AuthError::InvalidCredentials.into())
                    }
                    AttemptOutcome::LockedOut { .. } => {
                        self.throttle.check(caller, now)?;
                        Err(AuthError::InvalidCredentials.into())
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn logout(&self, session_id: &str, csrf_token: &str, caller: &str) -> Result<()> {
        self.require_csrf(session_id, csrf_token, caller)?;

        let username = self
            .sessions
            .get(session_id)
            .and_then(|s| s.user.map(|u| u.username));
        self.sessions.destroy(session_id);

        tracing::info!(username = ?username, caller = %caller, "Logged out");
        Ok(())
    }

    // ==================== Books ====================

    pub fn list_books(&self, requested_page: i64) -> Result<Page<Book>> {
        Ok(self.books.page(requested_page, self.config.page_size)?)
    }

    pub fn get_book(&self, id: i64) -> Result<Book> {
        if id <= 0 {
            return Err(CatalogError::NotFound(id).into());
        }
        self.books
            .get_by_id(id)?
            .ok_or_else(|| CatalogError::NotFound(id).into())
    }

    pub fn add_book(
        &self,
        session_id: &str,
        caller: &str,
        csrf_token: &str,
        form: &BookForm,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.require_csrf(session_id, csrf_token, caller)?;

        let draft = validate(form, now)?;
        let id = self.books.create(&draft)?;

        self.sessions.remint_csrf(session_id)?;
        Ok(id)
    }

    pub fn edit_book(
        &self,
        session_id: &str,
        caller: &str,
        id: i64,
        csrf_token: &str,
        form: &BookForm,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_csrf(session_id, csrf_token, caller)?;

        let draft = validate(form, now)?;
        if id <= 0 || !self.books.update(id, &draft)? {
            return Err(CatalogError::NotFound(id).into());
        }
        tracing::info!(book_id = id, title = %draft.title, "Updated book");

        self.sessions.remint_csrf(session_id)?;
        Ok(())
    }

    /// Remove a book, returning the deleted record for the flash message.
    pub fn delete_book(
        &self,
        session_id: &str,
        caller: &str,
        csrf_token: &str,
        id: i64,
    ) -> Result<Book> {
        self.require_csrf(session_id, csrf_token, caller)?;

        let book = self.get_book(id)?;
        if !self.books.delete(id)? {
            return Err(CatalogError::NotFound(id).into());
        }

        let username = self.sessions.get(session_id).and_then(|s| s.user.map(|u| u.username));
        tracing::info!(
            book_id = id,
            title = %book.title,
            username = ?username,
            caller = %caller,
            "Deleted book"
        );

        self.sessions.remint_csrf(session_id)?;
        Ok(book)
    }

    fn require_csrf(&self, session_id: &str, submitted: &str, caller: &str) -> Result<()> {
        self.sessions.verify_csrf(session_id, submitted).map_err(|e| {
            tracing::warn!(caller = %caller, "Rejected request with invalid CSRF token");
            CoreError::from(e)
        })
    }
}

fn validate(form: &BookForm, now: DateTime<Utc>) -> Result<BookDraft> {
    BookDraft::parse(form, now.year())
        .map_err(|errors| CatalogError::Validation(errors).into())
}
