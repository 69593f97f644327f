//! In-memory implementations of the consumed services.
//!
//! Suitable for tests and local runs only.

pub mod identity;
pub mod lookup;

pub use identity::MemoryIdentityProvider;
pub use lookup::{LookupBehavior, MemoryPermissionLookup};
