//! Staff permission resolver.
//!
//! Resolution order for `resolve(user_id, mode)`:
//! 1. Cached verdict: returned without a network call.
//! 2. Flight in progress: the caller joins it.
//! 3. Otherwise a new flight is spawned under the lookup deadline.
//!
//! Success is written to the store once, by the flight. Failure is applied
//! per caller: strict callers fail the store closed, soft callers keep the
//! answer they saw before the call.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use staffdesk_core::error::{AppError, ErrorKind};
use staffdesk_core::result::AppResult;
use staffdesk_core::traits::PermissionLookup;
use staffdesk_core::types::{AuthErrorTag, StaffVerdict, UserId};

use super::record::{Flight, RecordState, ResolutionRecord, Settlement};
use crate::session::store::SessionStore;
use crate::timeout::{PERMISSION_LOOKUP, with_timeout};

/// How a caller wants lookup failures handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Blocking: on failure, deny staff status and surface an error.
    Strict,
    /// Background: on failure, keep the last known answer silently.
    Soft,
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Soft => write!(f, "soft"),
        }
    }
}

/// Coalesces, caches and applies permission lookups per user id.
#[derive(Clone)]
pub struct PermissionResolver {
    /// Remote lookup.
    lookup: Arc<dyn PermissionLookup>,
    /// Destination for resolved permissions.
    store: SessionStore,
    /// One record per user id; absent means not started.
    records: Arc<DashMap<UserId, ResolutionRecord>>,
    /// Source of flight ids.
    next_flight: Arc<AtomicU64>,
    /// Deadline for a single lookup.
    ceiling: Duration,
}

impl fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("records", &self.records.len())
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

impl PermissionResolver {
    /// Creates a resolver writing into `store`.
    pub fn new(lookup: Arc<dyn PermissionLookup>, store: SessionStore, ceiling: Duration) -> Self {
        Self {
            lookup,
            store,
            records: Arc::new(DashMap::new()),
            next_flight: Arc::new(AtomicU64::new(1)),
            ceiling,
        }
    }

    /// Resolves whether `user_id` is staff.
    ///
    /// Strict callers receive the lookup error (kind `Timeout` or
    /// `Permissions`) after the store has been failed closed. Soft callers
    /// never fail: they get the staff answer the store held when they called.
    pub async fn resolve(&self, user_id: &UserId, mode: ResolveMode) -> AppResult<bool> {
        let previous = self.last_known(user_id);

        let flight = match self.records.entry(user_id.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                ResolutionRecord::Resolved(verdict) => {
                    let verdict = verdict.clone();
                    drop(entry);
                    debug!(user_id = %user_id, %mode, staff = verdict.is_staff(), "Permission cache hit");
                    self.apply_cached(user_id, &verdict);
                    return Ok(verdict.is_staff());
                }
                ResolutionRecord::InFlight { flight_id, flight } => {
                    debug!(user_id = %user_id, %mode, flight_id, "Joining in-flight permission lookup");
                    flight.clone()
                }
            },
            Entry::Vacant(entry) => {
                let flight_id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                let flight = self.launch(user_id.clone(), flight_id);
                entry.insert(ResolutionRecord::InFlight {
                    flight_id,
                    flight: flight.clone(),
                });
                debug!(user_id = %user_id, %mode, flight_id, "Started permission lookup");
                flight
            }
        };

        let settlement = flight.await;
        match settlement.outcome {
            Ok(verdict) => Ok(verdict.is_staff()),
            Err(err) => match mode {
                ResolveMode::Strict => {
                    if settlement.current {
                        let tag = err.auth_error_tag().unwrap_or(AuthErrorTag::Permissions);
                        self.store.update_for(user_id, |state| state.failed_closed(tag));
                    }
                    warn!(user_id = %user_id, error = %err, "Strict permission resolution failed closed");
                    Err(err)
                }
                ResolveMode::Soft => {
                    warn!(
                        user_id = %user_id,
                        error = %err,
                        kept_staff = previous,
                        "Soft permission resolution failed; keeping last known answer"
                    );
                    Ok(previous)
                }
            },
        }
    }

    /// The staff answer the store holds for `user_id`; false when the store
    /// belongs to someone else.
    fn last_known(&self, user_id: &UserId) -> bool {
        let snapshot = self.store.snapshot();
        snapshot.user_id() == Some(user_id) && snapshot.is_staff()
    }

    /// Writes a cached verdict if the store does not show it yet, as after
    /// switching back to a previously resolved user.
    fn apply_cached(&self, user_id: &UserId, verdict: &StaffVerdict) {
        if self.store.snapshot().reflects(verdict) {
            return;
        }
        if self.store.update_for(user_id, |state| state.resolved(verdict)) {
            debug!(user_id = %user_id, staff = verdict.is_staff(), "Applied cached permissions");
        }
    }

    /// Drops the record for `user_id`. A flight still running for it becomes
    /// stale and will neither cache nor write.
    pub fn invalidate(&self, user_id: &UserId) {
        if self.records.remove(user_id).is_some() {
            debug!(user_id = %user_id, "Invalidated permission record");
        }
    }

    /// Drops every record.
    pub fn invalidate_all(&self) {
        self.records.clear();
        debug!("Invalidated all permission records");
    }

    /// Reports the record currently held for `user_id`.
    pub fn record_state(&self, user_id: &UserId) -> RecordState {
        self.records
            .get(user_id)
            .map(|record| record.state())
            .unwrap_or(RecordState::NotStarted)
    }

    /// Spawns the lookup and wraps its completion in a shareable future.
    ///
    /// The flight is spawned rather than driven by its callers so that it
    /// settles (and clears its marker) even if every caller stops waiting.
    fn launch(&self, user_id: UserId, flight_id: u64) -> Flight {
        let resolver = self.clone();
        let handle = tokio::spawn(async move {
            let lookup = Arc::clone(&resolver.lookup);
            let target = user_id.clone();
            let outcome = with_timeout(PERMISSION_LOOKUP, resolver.ceiling, async move {
                let rows = lookup.staff_permissions(&target).await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Permissions,
                        format!("Permission lookup failed: {}", e.message),
                        e,
                    )
                })?;
                StaffVerdict::from_rows(rows)
            })
            .await;
            resolver.settle(&user_id, flight_id, outcome)
        });

        async move {
            handle.await.unwrap_or_else(|join_err| Settlement {
                outcome: Err(AppError::internal(format!(
                    "Permission lookup task ended abnormally: {join_err}"
                ))),
                current: false,
            })
        }
        .boxed()
        .shared()
    }

    /// Finalizes a flight. Runs exactly once per flight, in every branch.
    fn settle(&self, user_id: &UserId, flight_id: u64, outcome: AppResult<StaffVerdict>) -> Settlement {
        let current = match &outcome {
            Ok(verdict) => match self.records.get_mut(user_id) {
                Some(mut record) if record.is_flight(flight_id) => {
                    *record = ResolutionRecord::Resolved(verdict.clone());
                    true
                }
                _ => false,
            },
            Err(_) => self
                .records
                .remove_if(user_id, |_, record| record.is_flight(flight_id))
                .is_some(),
        };

        if !current {
            debug!(user_id = %user_id, flight_id, "Discarding stale permission lookup");
            return Settlement { outcome, current };
        }

        if let Ok(verdict) = &outcome {
            let applied = self.store.update_for(user_id, |state| state.resolved(verdict));
            info!(
                user_id = %user_id,
                staff = verdict.is_staff(),
                applied,
                "Permissions resolved"
            );
        }

        Settlement { outcome, current }
    }
}
