//! Session store, the single source of truth read by consumers.
//!
//! State lives in a `watch` channel so consumers can either read a snapshot
//! or await changes. Every write passes the [`MountGuard`]; writes made on
//! behalf of a specific user additionally require that user to still be the
//! current principal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;

use staffdesk_core::types::{
    AuthErrorTag, AuthStatus, Principal, StaffPermissions, StaffStatus, StaffVerdict, UserId,
};

use crate::mount::MountGuard;

/// Everything consumers know about the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSnapshot {
    /// The signed-in principal, if any.
    pub principal: Option<Principal>,
    /// True while the UI should block (bootstrap, explicit sign-in, retry).
    pub loading: bool,
    /// Coarse authentication status.
    pub status: AuthStatus,
    /// Present only while `status` is [`AuthStatus::Error`].
    pub error: Option<AuthErrorTag>,
    /// Last resolved capability flags.
    pub permissions: StaffPermissions,
    /// Staff standing backing `permissions`.
    pub staff: StaffStatus,
}

impl AuthSnapshot {
    /// State at process start, before bootstrap has run.
    pub fn initial() -> Self {
        Self {
            principal: None,
            loading: true,
            status: AuthStatus::Unknown,
            error: None,
            permissions: StaffPermissions::default(),
            staff: StaffStatus::Unresolved,
        }
    }

    /// Whether the principal is currently known to be staff.
    pub fn is_staff(&self) -> bool {
        self.staff.is_staff()
    }

    /// The current principal's user id.
    pub fn user_id(&self) -> Option<&UserId> {
        self.principal.as_ref().map(|p| &p.user_id)
    }

    /// A session became active.
    pub fn signed_in(&mut self, principal: Principal) {
        self.replace_principal(principal);
        self.status = AuthStatus::Authenticated;
        self.error = None;
    }

    /// The session token rotated; status is untouched.
    pub fn token_refreshed(&mut self, principal: Principal) {
        self.replace_principal(principal);
    }

    /// Swaps the principal. Permissions belong to a user, so they are
    /// dropped when the user changes.
    fn replace_principal(&mut self, principal: Principal) {
        if self.user_id() != Some(&principal.user_id) {
            self.permissions = StaffPermissions::default();
            self.staff = StaffStatus::Unresolved;
        }
        self.principal = Some(principal);
    }

    /// Whether the store already reflects `verdict`.
    pub fn reflects(&self, verdict: &StaffVerdict) -> bool {
        self.staff == verdict.status() && self.permissions == verdict.permissions()
    }

    /// The session ended.
    pub fn signed_out(&mut self) {
        self.principal = None;
        self.permissions = StaffPermissions::default();
        self.staff = StaffStatus::Unresolved;
        self.error = None;
        self.status = AuthStatus::Unauthenticated;
    }

    /// Bootstrap found no persisted session.
    pub fn no_session(&mut self) {
        self.status = AuthStatus::Unauthenticated;
        self.error = None;
    }

    /// Bootstrap could not fetch the persisted session.
    pub fn session_failed(&mut self) {
        self.status = AuthStatus::Error;
        self.error = Some(AuthErrorTag::Session);
    }

    /// A lookup succeeded. Clears any error left by an earlier failure.
    pub fn resolved(&mut self, verdict: &StaffVerdict) {
        self.permissions = verdict.permissions();
        self.staff = verdict.status();
        self.error = None;
        if self.status == AuthStatus::Error {
            self.status = AuthStatus::Authenticated;
        }
    }

    /// A strict lookup failed: deny staff status and surface the error.
    pub fn failed_closed(&mut self, tag: AuthErrorTag) {
        self.permissions = StaffPermissions::default();
        self.staff = StaffStatus::Unresolved;
        self.status = AuthStatus::Error;
        self.error = Some(tag);
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Claim on the `loading` flag, handed out by [`SessionStore::begin_loading`].
///
/// Only the most recent claim may clear the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingTicket(u64);

/// Shared handle to the session state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Current state and change notification.
    state: Arc<watch::Sender<AuthSnapshot>>,
    /// Drops writes after teardown.
    mount: MountGuard,
    /// Number of `begin_loading` calls so far.
    loading_epoch: Arc<AtomicU64>,
}

impl SessionStore {
    /// Creates a store in the initial state.
    pub fn new(mount: MountGuard) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::initial());
        Self {
            state: Arc::new(state),
            mount,
            loading_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// The mount guard gating writes to this store.
    pub fn mount(&self) -> &MountGuard {
        &self.mount
    }

    /// Applies `change` if still mounted. Returns whether it was applied.
    pub fn update(&self, change: impl FnOnce(&mut AuthSnapshot)) -> bool {
        if !self.mount.is_mounted() {
            return false;
        }
        self.state.send_if_modified(|state| {
            change(state);
            true
        })
    }

    /// Applies `change` only while `user_id` is the current principal.
    ///
    /// The check and the write happen under the same borrow, so a sign-out
    /// cannot slip in between them.
    pub fn update_for(&self, user_id: &UserId, change: impl FnOnce(&mut AuthSnapshot)) -> bool {
        if !self.mount.is_mounted() {
            return false;
        }
        self.state.send_if_modified(|state| {
            if state.user_id() != Some(user_id) {
                return false;
            }
            change(state);
            true
        })
    }

    /// Sets the loading flag unconditionally.
    pub fn set_loading(&self, loading: bool) -> bool {
        self.update(|state| state.loading = loading)
    }

    /// Sets `loading` and returns a ticket that supersedes every earlier one.
    pub fn begin_loading(&self) -> LoadingTicket {
        let ticket = LoadingTicket(self.loading_epoch.fetch_add(1, Ordering::AcqRel) + 1);
        self.set_loading(true);
        ticket
    }

    /// Clears `loading` if `ticket` is still the latest claim. Returns
    /// whether the flag was cleared.
    pub fn finish_loading(&self, ticket: LoadingTicket) -> bool {
        if !self.mount.is_mounted() {
            return false;
        }
        // The epoch is read under the write borrow so a concurrent
        // `begin_loading` either lands before the check or after the write.
        self.state.send_if_modified(|state| {
            if self.loading_epoch.load(Ordering::Acquire) != ticket.0 || !state.loading {
                return false;
            }
            state.loading = false;
            true
        })
    }
}
