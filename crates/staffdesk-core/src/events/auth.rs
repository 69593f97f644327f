//! Events emitted by the identity provider.

use serde::{Deserialize, Serialize};

use crate::types::{Principal, SignInRequestId};

/// One change in the identity provider's session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// A session became active.
    SignedIn {
        /// The new principal.
        session: Principal,
        /// The sign-in request that caused this event. `None` when the
        /// provider replays an existing session (tab refocus, rehydration).
        origin: Option<SignInRequestId>,
    },
    /// The session ended.
    SignedOut,
    /// The session token was rotated.
    TokenRefreshed {
        /// The principal carrying the rotated token.
        session: Principal,
    },
}

impl AuthEvent {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed { .. } => "TOKEN_REFRESHED",
        }
    }
}
