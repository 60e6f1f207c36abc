//! Bookman Core
//!
//! Coordination layer for the Bookman admin tool. The HTTP layer holds no
//! state of its own; every request goes through `BookManager`.

mod config;
mod error;
mod install;
mod manager;

pub use config::{Config, LoginConfig, SessionConfig, CONFIG_FILE_NAME, ENV_BIND, ENV_DATABASE};
pub use error::CoreError;
pub use install::{install, InstallOptions, InstallReport};
pub use manager::{BookManager, LoginForm};

// Re-export core components
pub use bookman_auth::{AuthError, LoginThrottle, PasswordPolicy, ThrottlePolicy, User, UserRepository};
pub use bookman_catalog::{
    parse_page_param, Book, BookDraft, BookForm, BookRepository, CatalogError, Page,
    ValidationErrors,
};
pub use bookman_session::{AuthState, Session, SessionError, SessionPolicy, SessionStore, SessionUser};
pub use bookman_storage::{Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
