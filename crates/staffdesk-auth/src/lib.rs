//! # staffdesk-auth
//!
//! Session bootstrap, auth event handling, and staff permission resolution.

pub mod memory;
pub mod mount;
pub mod permission;
pub mod session;
pub mod timeout;

pub use mount::MountGuard;
pub use permission::{PermissionResolver, RecordState, ResolveMode};
pub use session::{AuthSnapshot, SessionService, SessionStore};
