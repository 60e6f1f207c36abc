//! Session error types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Session expired after inactivity")]
    Expired,

    #[error("Security token mismatch")]
    CsrfMismatch,
}
