//! Login State Machine
//!
//! ```text
//! Anonymous ──credentials + csrf ok──▶ Authenticated
//!     │  ▲                                  │
//!     │  └──── logout / timeout / tamper ───┘
//!     │
//!     └──5 failures in window──▶ LockedOut ──3 min──▶ Anonymous
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No user attached to the session
    Anonymous,
    /// Session carries a verified user
    Authenticated,
    /// Caller exceeded the failed-login threshold; all attempts rejected
    LockedOut,
}

impl AuthState {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: AuthState) -> bool {
        match (self, target) {
            (AuthState::Anonymous, AuthState::Authenticated) => true,
            (AuthState::Anonymous, AuthState::LockedOut) => true,
            (AuthState::Authenticated, AuthState::Anonymous) => true,
            // Lockout only ends by expiry; a correct password does not skip it
            (AuthState::LockedOut, AuthState::Anonymous) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn accepts_login(&self) -> bool {
        matches!(self, AuthState::Anonymous)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Anonymous => "anonymous",
            AuthState::Authenticated => "authenticated",
            AuthState::LockedOut => "locked_out",
        }
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuthState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anonymous" => Ok(AuthState::Anonymous),
            "authenticated" => Ok(AuthState::Authenticated),
            "locked_out" => Ok(AuthState::LockedOut),
            _ => Err(format!("Unknown auth state: {}", s)),
        }
    }
}
