//! Coarse authentication status and its error tag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse authentication state. Exactly one value holds at any instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Only during the bootstrap window.
    #[default]
    Unknown,
    /// A principal is present.
    Authenticated,
    /// No principal.
    Unauthenticated,
    /// A blocking step failed; see the accompanying [`AuthErrorTag`].
    Error,
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Why the status is [`AuthStatus::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorTag {
    /// A guarded operation exceeded its deadline.
    Timeout,
    /// The initial session fetch failed.
    Session,
    /// The permission lookup failed or returned malformed data.
    Permissions,
}

impl fmt::Display for AuthErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Session => write!(f, "session"),
            Self::Permissions => write!(f, "permissions"),
        }
    }
}
