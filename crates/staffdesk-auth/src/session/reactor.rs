//! Auth event reactor.
//!
//! Listens on the identity provider's event channel and turns each event
//! into a store transition. Event handling itself never awaits: resolutions
//! triggered by an event run on their own tasks, so a `SignedOut` is applied
//! the moment it is received even while a lookup for the same user is
//! outstanding.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use staffdesk_core::events::AuthEvent;
use staffdesk_core::traits::IdentityProvider;
use staffdesk_core::types::{Principal, SignInRequestId, UserId};

use super::bootstrap::BootstrapLatch;
use super::store::SessionStore;
use crate::permission::{PermissionResolver, ResolveMode};

/// Sign-in requests issued by this service and not yet seen as events.
#[derive(Debug, Clone, Default)]
pub struct PendingSignIns {
    ids: Arc<Mutex<HashSet<SignInRequestId>>>,
}

impl PendingSignIns {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The set stays consistent across a panic in another holder, so a
    /// poisoned lock is recovered rather than treated as empty.
    fn ids(&self) -> MutexGuard<'_, HashSet<SignInRequestId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a request before it is sent to the provider.
    pub fn register(&self, request: SignInRequestId) {
        self.ids().insert(request);
    }

    /// Forgets a request whose provider call failed.
    pub fn discard(&self, request: &SignInRequestId) {
        self.ids().remove(request);
    }

    /// Removes `request` and reports whether it was outstanding.
    pub fn consume(&self, request: &SignInRequestId) -> bool {
        self.ids().remove(request)
    }

    /// Removes every outstanding request and returns how many there were.
    pub fn drain(&self) -> usize {
        let mut ids = self.ids();
        let count = ids.len();
        ids.clear();
        count
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// Whether no requests are outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a running reactor loop.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stops the reactor loop.
    pub fn release(self) {
        self.task.abort();
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Applies auth events to the session store.
#[derive(Debug, Clone)]
pub struct EventReactor {
    identity: Arc<dyn IdentityProvider>,
    store: SessionStore,
    resolver: PermissionResolver,
    latch: BootstrapLatch,
    pending: PendingSignIns,
}

impl EventReactor {
    /// Creates a reactor.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: SessionStore,
        resolver: PermissionResolver,
        latch: BootstrapLatch,
        pending: PendingSignIns,
    ) -> Self {
        Self {
            identity,
            store,
            resolver,
            latch,
            pending,
        }
    }

    /// Spawns the event loop over `events`.
    pub fn spawn(self, events: broadcast::Receiver<AuthEvent>) -> Subscription {
        Subscription {
            task: tokio::spawn(self.run(events)),
        }
    }

    async fn run(self, mut events: broadcast::Receiver<AuthEvent>) {
        let mount = self.store.mount().clone();
        loop {
            tokio::select! {
                _ = mount.unmounted() => break,
                received = events.recv() => match received {
                    Ok(event) => self.handle(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth event receiver lagged; resynchronizing session");
                        self.resync();
                    }
                    Err(RecvError::Closed) => {
                        debug!("Auth event channel closed");
                        break;
                    }
                },
            }
        }
        debug!("Auth event reactor stopped");
    }

    /// Applies one event. Never awaits.
    pub fn handle(&self, event: AuthEvent) {
        debug!(event = event.name(), "Auth event received");
        match event {
            AuthEvent::SignedIn { session, origin } => self.on_signed_in(session, origin),
            AuthEvent::SignedOut => apply_signed_out(&self.store, &self.resolver),
            AuthEvent::TokenRefreshed { session } => self.on_token_refreshed(session),
        }
    }

    fn on_signed_in(&self, session: Principal, origin: Option<SignInRequestId>) {
        let user_id = session.user_id.clone();
        let explicit = origin.is_some_and(|request| self.pending.consume(&request));
        self.store.update(|state| state.signed_in(session));

        if !self.latch.is_complete() {
            debug!(user_id = %user_id, explicit, "Deferring sign-in to bootstrap");
            return;
        }

        if explicit {
            info!(user_id = %user_id, "Explicit sign-in; resolving permissions");
            self.resolver.invalidate(&user_id);
            let ticket = self.store.begin_loading();

            let resolver = self.resolver.clone();
            let store = self.store.clone();
            tokio::spawn(async move {
                let _ = resolver.resolve(&user_id, ResolveMode::Strict).await;
                store.finish_loading(ticket);
            });
        } else {
            debug!(user_id = %user_id, "Implicit sign-in; refreshing permissions in background");
            self.spawn_soft(user_id);
        }
    }

    fn on_token_refreshed(&self, session: Principal) {
        let user_id = session.user_id.clone();
        self.store.update(|state| state.token_refreshed(session));
        debug!(user_id = %user_id, "Session token refreshed");
        self.spawn_soft(user_id);
    }

    fn spawn_soft(&self, user_id: UserId) {
        let resolver = self.resolver.clone();
        tokio::spawn(async move {
            let _ = resolver.resolve(&user_id, ResolveMode::Soft).await;
        });
    }

    /// Rebuilds state from the provider after events were dropped.
    ///
    /// Any outstanding sign-in request may have been among the dropped
    /// events, so all of them are settled here: when one existed, the
    /// current session is resolved strictly under a loading ticket.
    fn resync(&self) {
        let outstanding = self.pending.drain();
        let ticket = (outstanding > 0).then(|| self.store.begin_loading());

        let reactor = self.clone();
        tokio::spawn(async move {
            reactor.reload(outstanding > 0).await;
            if let Some(ticket) = ticket {
                reactor.store.finish_loading(ticket);
            }
        });
    }

    async fn reload(&self, explicit: bool) {
        match self.identity.current_session().await {
            Ok(Some(session)) => {
                let user_id = session.user_id.clone();
                self.store.update(|state| state.signed_in(session));
                if !self.latch.is_complete() {
                    return;
                }
                info!(user_id = %user_id, explicit, "Session resynchronized");
                let mode = if explicit {
                    self.resolver.invalidate(&user_id);
                    ResolveMode::Strict
                } else {
                    ResolveMode::Soft
                };
                let _ = self.resolver.resolve(&user_id, mode).await;
            }
            Ok(None) => {
                info!("Session resynchronized; no active session");
                apply_signed_out(&self.store, &self.resolver);
            }
            Err(e) => {
                warn!(error = %e, "Failed to resynchronize session after lag");
            }
        }
    }
}

/// Clears the session and drops the signed-out user's permission record.
/// Idempotent.
pub(crate) fn apply_signed_out(store: &SessionStore, resolver: &PermissionResolver) {
    let previous = store.snapshot().principal.map(|p| p.user_id);
    store.update(|state| state.signed_out());
    if let Some(user_id) = previous {
        resolver.invalidate(&user_id);
        info!(user_id = %user_id, "Signed out");
    }
}
