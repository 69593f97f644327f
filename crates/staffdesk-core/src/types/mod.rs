//! Core type definitions used across the StaffDesk workspace.

pub mod id;
pub mod permissions;
pub mod principal;
pub mod status;

pub use id::*;
pub use permissions::{PermissionRow, StaffPermissions, StaffStatus, StaffVerdict};
pub use principal::Principal;
pub use status::{AuthErrorTag, AuthStatus};
