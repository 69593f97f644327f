//! Traits for the external services the session layer consumes.

pub mod identity;
pub mod permission_lookup;

pub use identity::IdentityProvider;
pub use permission_lookup::PermissionLookup;
