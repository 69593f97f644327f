//! Per-user resolution records.

use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};

use staffdesk_core::result::AppResult;
use staffdesk_core::types::StaffVerdict;

/// What a finished flight hands to every caller awaiting it.
#[derive(Debug, Clone)]
pub(crate) struct Settlement {
    /// The lookup outcome, validated into a verdict.
    pub outcome: AppResult<StaffVerdict>,
    /// False when the record was invalidated while the flight ran.
    pub current: bool,
}

/// A lookup in progress, awaitable by any number of callers.
pub(crate) type Flight = Shared<BoxFuture<'static, Settlement>>;

/// Cache entry for one user id. A missing entry means "not started".
#[derive(Clone)]
pub(crate) enum ResolutionRecord {
    /// A lookup is running; later callers join it.
    InFlight {
        /// Distinguishes this flight from any that replace it.
        flight_id: u64,
        /// The shared lookup.
        flight: Flight,
    },
    /// A terminal verdict, served without network traffic.
    Resolved(StaffVerdict),
}

impl ResolutionRecord {
    /// Whether this record is the in-flight marker for `flight_id`.
    pub fn is_flight(&self, flight_id: u64) -> bool {
        matches!(self, Self::InFlight { flight_id: id, .. } if *id == flight_id)
    }

    /// Public view of this record.
    pub fn state(&self) -> RecordState {
        match self {
            Self::InFlight { .. } => RecordState::InFlight,
            Self::Resolved(verdict) => RecordState::Resolved {
                staff: verdict.is_staff(),
            },
        }
    }
}

/// Introspection view of a user's resolution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    /// No lookup has been started, or the record was invalidated.
    NotStarted,
    /// A lookup is running.
    InFlight,
    /// A verdict is cached.
    Resolved {
        /// Whether the cached verdict grants staff status.
        staff: bool,
    },
}
