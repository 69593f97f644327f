//! JSON fixture describing the in-memory identity provider and permission
//! lookup the CLI runs against.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use staffdesk_auth::memory::{LookupBehavior, MemoryIdentityProvider, MemoryPermissionLookup};
use staffdesk_core::error::AppError;
use staffdesk_core::result::AppResult;
use staffdesk_core::types::PermissionRow;

/// A password account.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAccount {
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
    /// User id issued on sign-in.
    pub user_id: String,
}

/// Permission lookup settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureLookup {
    /// How the lookup answers.
    #[serde(default)]
    pub behavior: LookupBehavior,
    /// Simulated round-trip time.
    #[serde(default)]
    pub latency_ms: u64,
}

/// Root fixture document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    /// Known accounts.
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
    /// Email of an account whose session is already persisted.
    #[serde(default)]
    pub session: Option<String>,
    /// Make the persisted session fetch fail.
    #[serde(default)]
    pub fail_session_fetch: bool,
    /// Permission rows keyed by user id.
    #[serde(default)]
    pub permissions: HashMap<String, Vec<PermissionRow>>,
    /// Lookup behavior.
    #[serde(default)]
    pub lookup: FixtureLookup,
}

/// Providers built from a fixture.
#[derive(Debug, Clone)]
pub struct Providers {
    pub identity: Arc<MemoryIdentityProvider>,
    pub lookup: Arc<MemoryPermissionLookup>,
}

impl Fixture {
    /// Reads a fixture file.
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::configuration(format!(
                "Failed to read fixture '{}': {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Builds the in-memory providers described by this fixture.
    pub async fn providers(&self, event_buffer_size: usize) -> AppResult<Providers> {
        let identity = Arc::new(MemoryIdentityProvider::new(event_buffer_size));
        for account in &self.accounts {
            identity
                .add_account(&account.email, &account.password, account.user_id.as_str())
                .await;
        }
        if let Some(email) = &self.session {
            identity.restore_session(email).await.map_err(|e| {
                AppError::configuration(format!(
                    "Fixture session '{email}' has no matching account: {}",
                    e.message
                ))
            })?;
        }
        identity.fail_session_fetch(self.fail_session_fetch);

        let lookup = Arc::new(
            MemoryPermissionLookup::new().with_latency(Duration::from_millis(self.lookup.latency_ms)),
        );
        for (user_id, rows) in &self.permissions {
            lookup.set_rows(user_id.as_str(), rows.clone()).await;
        }
        lookup.set_behavior(self.lookup.behavior).await;

        Ok(Providers { identity, lookup })
    }
}
