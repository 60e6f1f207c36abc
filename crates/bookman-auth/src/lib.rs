//! Bookman Authentication
//!
//! - `users`: lookup by username for login, creation for the installer
//! - `password`: salted argon2 hashes in PHC string form
//! - `throttle`: failed-login counters and lockouts keyed by caller identity

mod error;
mod password;
mod throttle;
mod users;

pub use error::AuthError;
pub use password::{verify_password, PasswordPolicy};
pub use throttle::{AttemptOutcome, LoginThrottle, ThrottlePolicy};
pub use users::{insert_user, User, UserRepository};

pub type Result<T> = std::result::Result<T, AuthError>;
