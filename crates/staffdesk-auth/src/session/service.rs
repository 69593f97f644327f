//! Session service: the public entry point.
//!
//! Wires the store, resolver, bootstrap sequencer and event reactor
//! together and exposes the operations consumers call.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use validator::Validate;

use staffdesk_core::config::SessionConfig;
use staffdesk_core::error::AppError;
use staffdesk_core::result::AppResult;
use staffdesk_core::traits::{IdentityProvider, PermissionLookup};
use staffdesk_core::types::{Principal, SignInRequestId, UserId};

use super::bootstrap::{BootstrapLatch, BootstrapSequencer};
use super::reactor::{EventReactor, PendingSignIns, Subscription, apply_signed_out};
use super::store::{AuthSnapshot, SessionStore};
use crate::mount::MountGuard;
use crate::permission::{PermissionResolver, ResolveMode};

/// Email and password for an explicit sign-in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    /// Account email.
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    /// Account password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Owns one session lifetime, from bootstrap to teardown.
#[derive(Debug)]
pub struct SessionService {
    identity: Arc<dyn IdentityProvider>,
    store: SessionStore,
    resolver: PermissionResolver,
    pending: PendingSignIns,
    subscription: Mutex<Option<Subscription>>,
    bootstrap: Mutex<Option<JoinHandle<()>>>,
}

impl SessionService {
    /// Validates `config`, subscribes to auth events and starts bootstrap.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        identity: Arc<dyn IdentityProvider>,
        lookup: Arc<dyn PermissionLookup>,
        config: &SessionConfig,
    ) -> AppResult<Self> {
        config.validate()?;

        let store = SessionStore::new(MountGuard::new());
        let resolver = PermissionResolver::new(lookup, store.clone(), config.permission_timeout());
        let latch = BootstrapLatch::new();
        let pending = PendingSignIns::new();

        // Subscribe first so no event emitted during bootstrap is missed.
        let subscription = EventReactor::new(
            Arc::clone(&identity),
            store.clone(),
            resolver.clone(),
            latch.clone(),
            pending.clone(),
        )
        .spawn(identity.subscribe());

        let sequencer = BootstrapSequencer::new(
            Arc::clone(&identity),
            resolver.clone(),
            store.clone(),
            latch,
            config.bootstrap_timeout(),
        );
        let bootstrap = sequencer.run();

        info!(
            bootstrap_timeout_ms = config.bootstrap_timeout_ms,
            permission_timeout_ms = config.permission_timeout_ms,
            "Session service started"
        );

        Ok(Self {
            identity,
            store,
            resolver,
            pending,
            subscription: Mutex::new(Some(subscription)),
            bootstrap: Mutex::new(bootstrap),
        })
    }

    /// Current state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.store.snapshot()
    }

    /// Receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.store.subscribe()
    }

    /// Waits until `loading` is clear and returns that state.
    pub async fn ready(&self) -> AppResult<AuthSnapshot> {
        let mut rx = self.store.subscribe();
        let snapshot = rx
            .wait_for(|state| !state.loading)
            .await
            .map_err(|_| AppError::session("Session store closed before becoming ready"))?;
        Ok(snapshot.clone())
    }

    /// Signs in with email and password.
    ///
    /// Sets `loading` for the duration; the event reactor clears it once the
    /// resulting `SignedIn` has been resolved strictly. Failures are returned
    /// and leave the session status untouched. A later sign-in or retry takes
    /// over `loading`, so this call never clears it on their behalf.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Principal> {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        credentials.validate()?;

        let request = SignInRequestId::new();
        self.pending.register(request);
        let ticket = self.store.begin_loading();

        match self
            .identity
            .sign_in_with_password(&credentials.email, &credentials.password, request)
            .await
        {
            Ok(principal) => {
                debug!(user_id = %principal.user_id, %request, "Sign-in accepted by provider");
                Ok(principal)
            }
            Err(e) => {
                self.pending.discard(&request);
                self.store.finish_loading(ticket);
                warn!(error = %e, "Sign-in failed");
                Err(e)
            }
        }
    }

    /// Ends the session at the provider and clears it locally.
    pub async fn sign_out(&self) -> AppResult<()> {
        self.identity.sign_out().await.inspect_err(|e| {
            warn!(error = %e, "Sign-out failed");
        })?;
        apply_signed_out(&self.store, &self.resolver);
        Ok(())
    }

    /// Re-runs a strict resolution for the current principal, ignoring any
    /// cached answer.
    pub async fn retry_permissions(&self) -> AppResult<bool> {
        let user_id = self.current_user()?;
        info!(user_id = %user_id, "Retrying permission resolution");

        self.resolver.invalidate(&user_id);
        let ticket = self.store.begin_loading();
        let result = self.resolver.resolve(&user_id, ResolveMode::Strict).await;
        self.store.finish_loading(ticket);
        result
    }

    /// Soft resolution for the current principal, as on tab refocus.
    pub async fn revalidate(&self) -> AppResult<bool> {
        let user_id = self.current_user()?;
        self.resolver.resolve(&user_id, ResolveMode::Soft).await
    }

    /// The resolver backing this service.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Stops event handling and the bootstrap timer and forgets every
    /// permission record. Later writes from outstanding tasks are dropped.
    /// Idempotent.
    pub fn teardown(&self) {
        let mount = self.store.mount();
        if !mount.is_mounted() {
            return;
        }
        mount.unmount();

        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.release();
        }
        let bootstrap = self
            .bootstrap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = bootstrap {
            handle.abort();
        }
        self.resolver.invalidate_all();
        info!("Session service torn down");
    }

    fn current_user(&self) -> AppResult<UserId> {
        self.store
            .snapshot()
            .user_id()
            .cloned()
            .ok_or_else(|| AppError::session("No active session"))
    }
}

impl Drop for SessionService {
    fn drop(&mut self) {
        self.teardown();
    }
}
