//! Liveness guard shared by every asynchronous continuation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Tracks whether the consuming surface is still mounted.
///
/// The flag is true from construction until [`MountGuard::unmount`]. The
/// paired cancellation token lets timers and subscription loops stop at the
/// same instant the flag flips.
#[derive(Debug, Clone)]
pub struct MountGuard {
    /// Set to `false` on teardown.
    mounted: Arc<AtomicBool>,
    /// Cancelled on teardown.
    shutdown: CancellationToken,
}

impl MountGuard {
    /// Creates a guard in the mounted state.
    pub fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Whether writes are still allowed.
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Flips the flag and cancels every waiter. Idempotent.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
        self.shutdown.cancel();
    }

    /// Completes once [`MountGuard::unmount`] has been called.
    pub fn unmounted(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}
