//! Bookman Session Management
//!
//! - A session is ephemeral per-browser state keyed by a random cookie value
//! - Sessions expire after 30 minutes without activity (10 before login)
//! - Authenticated sessions get a fresh id every 5 minutes (anti-fixation)
//! - Every state-changing POST must echo the session's CSRF token
//! - Sessions live in process memory only

mod csrf;
mod error;
mod session;
mod state;
mod store;

pub use csrf::{mint_token, tokens_match};
pub use error::SessionError;
pub use session::{Session, SessionUser};
pub use state::AuthState;
pub use store::{SessionPolicy, SessionStore};

pub type Result<T> = std::result::Result<T, SessionError>;
