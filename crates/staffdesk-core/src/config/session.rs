//! Session bootstrap and permission resolution configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Deadlines and buffering for the session service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Safety ceiling in milliseconds after which bootstrap releases the
    /// loading state even if the initial sequence has not finished.
    #[serde(default = "default_bootstrap_timeout")]
    #[validate(range(min = 100, max = 120000))]
    pub bootstrap_timeout_ms: u64,
    /// Ceiling in milliseconds for a single permission lookup.
    #[serde(default = "default_permission_timeout")]
    #[validate(range(min = 100, max = 60000))]
    pub permission_timeout_ms: u64,
    /// Capacity of the auth event channel between provider and reactor.
    #[serde(default = "default_event_buffer")]
    #[validate(range(min = 1, max = 4096))]
    pub event_buffer_size: usize,
}

impl SessionConfig {
    /// Bootstrap safety ceiling as a [`Duration`].
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }

    /// Permission lookup ceiling as a [`Duration`].
    pub fn permission_timeout(&self) -> Duration {
        Duration::from_millis(self.permission_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_ms: default_bootstrap_timeout(),
            permission_timeout_ms: default_permission_timeout(),
            event_buffer_size: default_event_buffer(),
        }
    }
}

fn default_bootstrap_timeout() -> u64 {
    8_000
}

fn default_permission_timeout() -> u64 {
    5_000
}

fn default_event_buffer() -> usize {
    64
}
