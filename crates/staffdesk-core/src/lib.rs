//! # staffdesk-core
//!
//! Core crate for the StaffDesk session layer. Contains configuration
//! schemas, typed identifiers, the principal and permission model, the
//! traits implemented by the identity provider and permission lookup,
//! auth events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other StaffDesk crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
