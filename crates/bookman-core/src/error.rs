//! Core error types

use thiserror::Error;

use bookman_auth::AuthError;
use bookman_catalog::CatalogError;
use bookman_session::SessionError;
use bookman_storage::StorageError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No user accounts exist; run `bookman install` first")]
    NotInstalled,
}

impl CoreError {
    /// Failures of the database or filesystem rather than of the request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CoreError::Storage(_)
                | CoreError::Catalog(CatalogError::Storage(_))
                | CoreError::Auth(AuthError::Storage(_))
                | CoreError::Auth(AuthError::PasswordHash(_))
                | CoreError::Io(_)
                | CoreError::Config(_)
                | CoreError::NotInstalled
        )
    }

    pub fn is_csrf(&self) -> bool {
        matches!(
            self,
            CoreError::Session(SessionError::CsrfMismatch | SessionError::NotFound)
        )
    }

    /// Text that is safe to show in the browser. Internal failures never
    /// leak their details.
    pub fn user_message(&self) -> String {
        if self.is_internal() {
            return "Something went wrong. Please try again later.".to_string();
        }
        if self.is_csrf() {
            return "Invalid security token. Please try again.".to_string();
        }

        match self {
            CoreError::Catalog(CatalogError::NotFound(_)) => {
                "The book does not exist or was already deleted.".to_string()
            }
            CoreError::Catalog(CatalogError::Validation(errors)) => errors.to_string(),
            CoreError::Auth(AuthError::MissingCredentials) => {
                "Enter your username and password.".to_string()
            }
            CoreError::Auth(AuthError::InvalidCredentials) => "Invalid credentials.".to_string(),
            CoreError::Auth(AuthError::LockedOut { remaining_secs }) => format!(
                "Too many failed attempts. Try again in {}.",
                format_wait(*remaining_secs)
            ),
            CoreError::Session(SessionError::Expired) => {
                "Your session expired. Please sign in again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

fn format_wait(secs: i64) -> String {
    let (minutes, seconds) = (secs / 60, secs % 60);
    match (minutes, seconds) {
        (0, s) => format!("{s} seconds"),
        (m, 0) => format!("{m} minutes"),
        (m, s) => format!("{m} min {s} s"),
    }
}
