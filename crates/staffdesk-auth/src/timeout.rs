//! Deadline guard for remote calls.
//!
//! The guarded operation is spawned onto the runtime so that an expired
//! deadline only ends the caller's wait. The operation itself runs to
//! completion in the background and its result is dropped.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use staffdesk_core::error::{AppError, TimeoutError};
use staffdesk_core::result::AppResult;

/// Operation name used for permission lookups.
pub const PERMISSION_LOOKUP: &str = "permission_lookup";

/// Operation name used for the bootstrap sequence.
pub const BOOTSTRAP: &str = "bootstrap";

/// Races `operation` against `limit`.
///
/// Returns the operation's own result if it settles first, otherwise an
/// error of kind `Timeout` whose source is a [`TimeoutError`] naming the
/// operation.
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::spawn(future);

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(AppError::internal(format!(
            "Guarded operation '{operation}' did not complete: {join_err}"
        ))),
        Err(_) => {
            warn!(
                operation,
                limit_ms = limit.as_millis() as u64,
                "Operation exceeded its deadline; abandoning the wait"
            );
            Err(TimeoutError::new(operation, limit).into())
        }
    }
}
