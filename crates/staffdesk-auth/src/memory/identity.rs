//! In-memory identity provider for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use staffdesk_core::error::AppError;
use staffdesk_core::events::AuthEvent;
use staffdesk_core::result::AppResult;
use staffdesk_core::traits::IdentityProvider;
use staffdesk_core::types::{Principal, SignInRequestId, UserId};

/// A password account known to the provider.
#[derive(Debug, Clone)]
struct Account {
    /// Identifier issued for the account.
    user_id: UserId,
    /// Plain-text password; this provider never leaves the process.
    password: String,
}

/// Identity provider that keeps accounts and the current session in memory
/// and publishes every change on a broadcast channel.
#[derive(Debug)]
pub struct MemoryIdentityProvider {
    /// Email → account.
    accounts: RwLock<HashMap<String, Account>>,
    /// The persisted session, as `current_session` would return it.
    current: RwLock<Option<Principal>>,
    /// Auth event fan-out.
    events: broadcast::Sender<AuthEvent>,
    /// Lifetime of issued session tokens.
    session_ttl: Duration,
    /// When set, `current_session` fails.
    fail_session_fetch: AtomicBool,
}

impl MemoryIdentityProvider {
    /// Creates a provider with no accounts and no session.
    pub fn new(event_buffer_size: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer_size.max(1));
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            events,
            session_ttl: Duration::hours(1),
            fail_session_fetch: AtomicBool::new(false),
        }
    }

    /// Registers a password account.
    pub async fn add_account(&self, email: &str, password: &str, user_id: impl Into<UserId>) {
        self.accounts.write().await.insert(
            email.to_lowercase(),
            Account {
                user_id: user_id.into(),
                password: password.to_string(),
            },
        );
    }

    /// Persists a session for `email` without emitting an event, as if it
    /// survived from an earlier page load.
    pub async fn restore_session(&self, email: &str) -> AppResult<Principal> {
        let account = self.account(email).await?;
        let principal = self.issue(account.user_id, email);
        *self.current.write().await = Some(principal.clone());
        Ok(principal)
    }

    /// Makes `current_session` fail (or succeed again).
    pub fn fail_session_fetch(&self, fail: bool) {
        self.fail_session_fetch.store(fail, Ordering::SeqCst);
    }

    /// Rotates the current session token and emits `TokenRefreshed`.
    pub async fn refresh_token(&self) -> AppResult<Principal> {
        let mut current = self.current.write().await;
        let previous = current
            .as_ref()
            .ok_or_else(|| AppError::session("No session to refresh"))?;
        let principal = self.issue(previous.user_id.clone(), previous.email.as_deref().unwrap_or(""));
        *current = Some(principal.clone());
        drop(current);

        self.publish(AuthEvent::TokenRefreshed {
            session: principal.clone(),
        });
        Ok(principal)
    }

    /// Emits `SignedIn` for the current session with no origin, as a
    /// provider does when a tab regains focus.
    pub async fn replay_session(&self) -> AppResult<Principal> {
        let principal = self
            .current
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::session("No session to replay"))?;
        self.publish(AuthEvent::SignedIn {
            session: principal.clone(),
            origin: None,
        });
        Ok(principal)
    }

    async fn account(&self, email: &str) -> AppResult<Account> {
        self.accounts
            .read()
            .await
            .get(&email.to_lowercase())
            .cloned()
            .ok_or_else(|| AppError::authentication("Invalid login credentials"))
    }

    fn issue(&self, user_id: UserId, email: &str) -> Principal {
        Principal {
            user_id,
            email: (!email.is_empty()).then(|| email.to_lowercase()),
            session_token: Uuid::new_v4().simple().to_string(),
            expires_at: Utc::now() + self.session_ttl,
        }
    }

    fn publish(&self, event: AuthEvent) {
        let name = event.name();
        match self.events.send(event) {
            Ok(receivers) => debug!(event = name, receivers, "Auth event published"),
            Err(_) => debug!(event = name, "Auth event published with no subscribers"),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_session(&self) -> AppResult<Option<Principal>> {
        if self.fail_session_fetch.load(Ordering::SeqCst) {
            return Err(AppError::session("Session storage is unavailable"));
        }
        Ok(self.current.read().await.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        request: SignInRequestId,
    ) -> AppResult<Principal> {
        let account = self.account(email).await?;
        if account.password != password {
            warn!(email, "Rejected sign-in with wrong password");
            return Err(AppError::authentication("Invalid login credentials"));
        }

        let principal = self.issue(account.user_id, email);
        *self.current.write().await = Some(principal.clone());
        info!(user_id = %principal.user_id, %request, "Signed in");

        self.publish(AuthEvent::SignedIn {
            session: principal.clone(),
            origin: Some(request),
        });
        Ok(principal)
    }

    async fn sign_out(&self) -> AppResult<()> {
        let previous = self.current.write().await.take();
        if let Some(principal) = previous {
            info!(user_id = %principal.user_id, "Signed out");
        }
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_emits_event_with_origin() {
        let provider = MemoryIdentityProvider::new(8);
        provider.add_account("a@example.com", "pw", "U1").await;
        let mut events = provider.subscribe();

        let request = SignInRequestId::new();
        let principal = provider
            .sign_in_with_password("A@example.com", "pw", request)
            .await
            .unwrap();
        assert_eq!(principal.user_id, UserId::new("U1"));

        match events.recv().await.unwrap() {
            AuthEvent::SignedIn { session, origin } => {
                assert_eq!(session, principal);
                assert_eq!(origin, Some(request));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(provider.current_session().await.unwrap(), Some(principal));
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected_without_event() {
        let provider = MemoryIdentityProvider::new(8);
        provider.add_account("a@example.com", "pw", "U1").await;
        let mut events = provider.subscribe();

        let err = provider
            .sign_in_with_password("a@example.com", "nope", SignInRequestId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, staffdesk_core::error::ErrorKind::Authentication);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let provider = MemoryIdentityProvider::new(8);
        provider.add_account("a@example.com", "pw", "U1").await;
        let restored = provider.restore_session("a@example.com").await.unwrap();
        let mut events = provider.subscribe();

        let refreshed = provider.refresh_token().await.unwrap();
        assert_ne!(restored.session_token, refreshed.session_token);
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::TokenRefreshed { session: refreshed }
        );
    }
}
