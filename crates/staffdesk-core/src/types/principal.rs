//! The authenticated principal as handed out by the identity provider.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A signed-in user together with the session that authenticates them.
///
/// Owned by the identity provider; the session store keeps a read-only copy
/// that is replaced wholesale on every sign-in or refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The user's identifier.
    pub user_id: UserId,
    /// The user's email address, when the provider exposes it.
    pub email: Option<String>,
    /// Opaque bearer token for the current session.
    pub session_token: String,
    /// When the session token expires.
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    /// Whether the session token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("session_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_debug_redacts_token() {
        let principal = Principal {
            user_id: UserId::new("U1"),
            email: Some("u1@example.com".to_string()),
            session_token: "secret-token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let rendered = format!("{principal:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("U1"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let principal = Principal {
            user_id: UserId::new("U1"),
            email: None,
            session_token: "t".to_string(),
            expires_at: now,
        };
        assert!(principal.is_expired_at(now));
        assert!(!principal.is_expired_at(now - Duration::seconds(1)));
    }
}
