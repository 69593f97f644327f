//! In-memory permission lookup for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use staffdesk_core::error::AppError;
use staffdesk_core::result::AppResult;
use staffdesk_core::traits::PermissionLookup;
use staffdesk_core::types::{PermissionRow, UserId};

/// How the lookup answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupBehavior {
    /// Return the configured rows.
    #[default]
    Respond,
    /// Fail every call with a remote error.
    Fail,
    /// Never settle.
    Hang,
}

/// Permission lookup backed by a map of rows per user.
#[derive(Debug, Default)]
pub struct MemoryPermissionLookup {
    /// Rows returned per user; missing users get no rows.
    rows: RwLock<HashMap<UserId, Vec<PermissionRow>>>,
    /// Current answering mode.
    behavior: RwLock<LookupBehavior>,
    /// Simulated round-trip time in milliseconds.
    latency_ms: AtomicU64,
    /// Number of calls received.
    calls: AtomicUsize,
}

impl MemoryPermissionLookup {
    /// Creates a lookup with no rows, no latency, answering normally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the simulated round-trip time.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Changes the simulated round-trip time for subsequent calls.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Replaces the rows for `user_id`.
    pub async fn set_rows(&self, user_id: impl Into<UserId>, rows: Vec<PermissionRow>) {
        self.rows.write().await.insert(user_id.into(), rows);
    }

    /// Changes how subsequent calls are answered.
    pub async fn set_behavior(&self, behavior: LookupBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionLookup for MemoryPermissionLookup {
    async fn staff_permissions(&self, user_id: &UserId) -> AppResult<Vec<PermissionRow>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(user_id = %user_id, call, "Permission lookup received");

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let behavior = *self.behavior.read().await;
        match behavior {
            LookupBehavior::Respond => Ok(self
                .rows
                .read()
                .await
                .get(user_id)
                .cloned()
                .unwrap_or_default()),
            LookupBehavior::Fail => Err(AppError::permissions(format!(
                "Remote permission service rejected lookup for {user_id}"
            ))),
            LookupBehavior::Hang => std::future::pending().await,
        }
    }
}
