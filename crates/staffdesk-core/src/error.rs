//! Unified error types for StaffDesk.
//!
//! Provider and lookup failures are mapped into [`AppError`] so they can be
//! propagated with `?` and shared between coalesced permission callers.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::status::AuthErrorTag;

/// Top-level error kind categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Fetching the existing session from the identity provider failed.
    Session,
    /// A guarded operation exceeded its deadline.
    Timeout,
    /// The permission lookup failed or returned malformed data.
    Permissions,
    /// Sign-in or sign-out was rejected by the identity provider.
    Authentication,
    /// Input validation failed.
    Validation,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "SESSION"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Permissions => write!(f, "PERMISSIONS"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Raised by the timeout guard when an operation outlives its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation '{operation}' timed out after {}ms", .limit.as_millis())]
pub struct TimeoutError {
    /// Name of the guarded operation.
    pub operation: &'static str,
    /// The deadline that elapsed.
    pub limit: Duration,
}

impl TimeoutError {
    /// Create a timeout error for the named operation.
    pub fn new(operation: &'static str, limit: Duration) -> Self {
        Self { operation, limit }
    }
}

/// The unified application error.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a session error.
    pub fn session(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Session, message)
    }

    /// Create a permissions error.
    pub fn permissions(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permissions, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns `true` when this error came from the timeout guard.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// The status tag shown to consumers when this error fails a
    /// resolution closed. `None` for kinds that never reach the store.
    pub fn auth_error_tag(&self) -> Option<AuthErrorTag> {
        match self.kind {
            ErrorKind::Timeout => Some(AuthErrorTag::Timeout),
            ErrorKind::Session => Some(AuthErrorTag::Session),
            ErrorKind::Permissions => Some(AuthErrorTag::Permissions),
            _ => None,
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<TimeoutError> for AppError {
    fn from(err: TimeoutError) -> Self {
        Self::with_source(ErrorKind::Timeout, err.to_string(), err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(ErrorKind::Validation, format!("Invalid input: {err}"), err)
    }
}
