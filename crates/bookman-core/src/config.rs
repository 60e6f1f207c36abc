//! Application configuration
//!
//! Defaults, then an optional TOML file, then `BOOKMAN_*` environment
//! variables. CLI flags are applied last by the binary.

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use bookman_auth::ThrottlePolicy;
use bookman_catalog::DEFAULT_PAGE_SIZE;
use bookman_session::SessionPolicy;

use crate::error::CoreError;
use crate::Result;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_DATABASE: &str = "BOOKMAN_DATABASE";
pub const ENV_BIND: &str = "BOOKMAN_BIND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
    /// Address the HTTP server listens on
    pub bind_address: String,
    /// Books per listing page
    pub page_size: u32,
    pub session: SessionConfig,
    pub login: LoginConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_secs: i64,
    /// Idle limit for sessions that never logged in
    pub anonymous_timeout_secs: i64,
    pub rotate_interval_secs: i64,
    pub cookie_name: String,
    /// Mark the cookie `Secure` (serve over HTTPS only)
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub max_failures: u32,
    pub lockout_secs: i64,
    /// Reverse proxies whose `X-Forwarded-For` / `X-Real-IP` headers name
    /// the real client. Empty means the TCP peer is always the caller.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("bookman.db"),
            bind_address: "127.0.0.1:8080".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            session: SessionConfig::default(),
            login: LoginConfig::default(),
        }
    }

    pub fn data_dir() -> PathBuf {
        ProjectDirs::from("org", "bookman", "bookman")
            .map(|dirs| dirs.data_local_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".bookman"))
    }

    pub fn default_file() -> PathBuf {
        Self::data_dir().join(CONFIG_FILE_NAME)
    }

    /// Load from `path`, or from the default location when it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_file();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE).filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.trim().is_empty()) {
            self.bind_address = bind;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CoreError::Config("page_size must be at least 1".into()));
        }
        if self.session.idle_timeout_secs <= 0
            || self.session.anonymous_timeout_secs <= 0
            || self.session.rotate_interval_secs <= 0
        {
            return Err(CoreError::Config(
                "session timeouts must be positive".into(),
            ));
        }
        if self.session.cookie_name.is_empty()
            || !self
                .session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CoreError::Config(format!(
                "invalid cookie name: {:?}",
                self.session.cookie_name
            )));
        }
        if self.login.max_failures == 0 || self.login.lockout_secs <= 0 {
            return Err(CoreError::Config(
                "login lockout settings must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            idle_timeout: Duration::seconds(self.session.idle_timeout_secs),
            anonymous_timeout: Duration::seconds(self.session.anonymous_timeout_secs),
            rotate_every: Duration::seconds(self.session.rotate_interval_secs),
            ..SessionPolicy::default()
        }
    }

    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            max_failures: self.login.max_failures,
            lockout: Duration::seconds(self.login.lockout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            anonymous_timeout_secs: 10 * 60,
            rotate_interval_secs: 5 * 60,
            cookie_name: "bookman_session".to_string(),
            secure_cookie: false,
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            lockout_secs: 3 * 60,
            trusted_proxies: Vec::new(),
        }
    }
}
