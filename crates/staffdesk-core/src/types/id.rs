//! Typed identifiers.
//!
//! User and staff ids are opaque strings issued by the external services,
//! so they wrap `String`. Sign-in request ids are generated locally and
//! wrap [`uuid::Uuid`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around an opaque `String`.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

define_string_id!(
    /// Identifier of an authenticated user, issued by the identity provider.
    UserId
);

define_string_id!(
    /// Identifier of a staff record, returned by the permission lookup.
    StaffId
);

/// Correlates one explicit sign-in call with the `SignedIn` event it causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignInRequestId(pub Uuid);

impl SignInRequestId {
    /// Create a new random request id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SignInRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignInRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
