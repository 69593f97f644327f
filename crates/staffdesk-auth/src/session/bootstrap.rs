//! Bootstrap sequencer.
//!
//! On start the sequencer reads the persisted session and, when one exists,
//! resolves permissions strictly before clearing `loading`. A safety timer
//! races the sequence; whichever finishes first completes bootstrap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use staffdesk_core::traits::IdentityProvider;

use super::store::SessionStore;
use crate::permission::{PermissionResolver, ResolveMode};
use crate::timeout::BOOTSTRAP;

/// One-shot completion flag for bootstrap.
///
/// Both the sequence and the safety timer try to complete it; only the first
/// clears `loading`.
#[derive(Debug, Clone, Default)]
pub struct BootstrapLatch {
    done: Arc<AtomicBool>,
}

impl BootstrapLatch {
    /// Creates an open latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether bootstrap has completed.
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Closes the latch and clears `loading`. Returns false if it was
    /// already closed.
    pub fn complete(&self, store: &SessionStore) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        store.set_loading(false);
        true
    }
}

/// Drives the initial session check.
#[derive(Debug)]
pub struct BootstrapSequencer {
    identity: Arc<dyn IdentityProvider>,
    resolver: PermissionResolver,
    store: SessionStore,
    latch: BootstrapLatch,
    /// Upper bound on how long `loading` may stay set.
    ceiling: Duration,
    started: AtomicBool,
}

impl BootstrapSequencer {
    /// Creates a sequencer that completes `latch`.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        resolver: PermissionResolver,
        store: SessionStore,
        latch: BootstrapLatch,
        ceiling: Duration,
    ) -> Self {
        Self {
            identity,
            resolver,
            store,
            latch,
            ceiling,
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the sequence and its safety timer.
    ///
    /// Returns `None` if bootstrap was already started. The returned handle
    /// owns the timer only; aborting it leaves the sequence running, and the
    /// sequence's writes are still gated by the mount guard.
    pub fn run(&self) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("Bootstrap already started");
            return None;
        }

        let mut sequence = tokio::spawn(Self::sequence(
            Arc::clone(&self.identity),
            self.resolver.clone(),
            self.store.clone(),
            self.latch.clone(),
        ));

        let store = self.store.clone();
        let latch = self.latch.clone();
        let ceiling = self.ceiling;

        Some(tokio::spawn(async move {
            let mount = store.mount().clone();
            tokio::select! {
                _ = mount.unmounted() => {
                    debug!("Bootstrap timer cancelled by teardown");
                }
                _ = tokio::time::sleep(ceiling) => {
                    if latch.complete(&store) {
                        warn!(
                            operation = BOOTSTRAP,
                            ceiling_ms = ceiling.as_millis() as u64,
                            "Bootstrap ceiling reached; releasing loading state"
                        );
                    }
                }
                joined = &mut sequence => {
                    if let Err(e) = joined {
                        error!(error = %e, "Bootstrap sequence ended abnormally");
                        latch.complete(&store);
                    }
                }
            }
        }))
    }

    async fn sequence(
        identity: Arc<dyn IdentityProvider>,
        resolver: PermissionResolver,
        store: SessionStore,
        latch: BootstrapLatch,
    ) {
        match identity.current_session().await {
            Err(e) => {
                error!(error = %e, "Failed to fetch persisted session");
                store.update(|state| state.session_failed());
            }
            Ok(None) => {
                info!("No persisted session");
                store.update(|state| state.no_session());
            }
            Ok(Some(principal)) => {
                let user_id = principal.user_id.clone();
                info!(user_id = %user_id, "Restored persisted session");
                store.update(|state| state.signed_in(principal));

                if let Err(e) = resolver.resolve(&user_id, ResolveMode::Strict).await {
                    debug!(user_id = %user_id, error = %e, "Bootstrap permission resolution failed");
                }
            }
        }

        if latch.complete(&store) {
            let snapshot = store.snapshot();
            info!(
                status = %snapshot.status,
                staff = snapshot.is_staff(),
                "Bootstrap complete"
            );
        }
    }
}
