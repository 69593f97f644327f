//! Events consumed by the session layer.

pub mod auth;

pub use auth::AuthEvent;
