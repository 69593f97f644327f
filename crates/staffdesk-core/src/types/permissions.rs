//! Staff capability flags and the verdicts derived from lookup rows.

use serde::{Deserialize, Serialize};

use super::id::StaffId;
use crate::error::AppError;

/// Capability flags for a staff principal.
///
/// `Default` is the empty, no-capability value used whenever the caller is
/// not (or no longer) known to be staff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPermissions {
    /// The staff record backing these permissions.
    pub staff_id: Option<StaffId>,
    /// May reply to support tickets.
    pub can_reply_tickets: bool,
    /// May edit published content.
    pub can_manage_content: bool,
    /// May join scheduled meetings.
    pub can_attend_meetings: bool,
}

/// A raw row as returned by the permission lookup.
///
/// Fields are optional because the remote side is loosely typed; rows are
/// validated into [`StaffPermissions`] before they reach the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRow {
    /// Staff record id. Required for a row to be valid.
    #[serde(default, alias = "staffId")]
    pub staff_id: Option<String>,
    /// Ticket reply flag; `null` means `false`.
    #[serde(default, alias = "canReplyTickets")]
    pub can_reply_tickets: Option<bool>,
    /// Content management flag; `null` means `false`.
    #[serde(default, alias = "canManageContent")]
    pub can_manage_content: Option<bool>,
    /// Meeting attendance flag; `null` means `false`.
    #[serde(default, alias = "canAttendMeetings")]
    pub can_attend_meetings: Option<bool>,
}

impl TryFrom<PermissionRow> for StaffPermissions {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let staff_id = row
            .staff_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::permissions("Permission row is missing a staff id"))?;

        Ok(Self {
            staff_id: Some(StaffId::new(staff_id)),
            can_reply_tickets: row.can_reply_tickets.unwrap_or(false),
            can_manage_content: row.can_manage_content.unwrap_or(false),
            can_attend_meetings: row.can_attend_meetings.unwrap_or(false),
        })
    }
}

/// Terminal outcome of a permission lookup for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum StaffVerdict {
    /// The user is staff with the given capabilities.
    Staff(StaffPermissions),
    /// The lookup returned no rows.
    NotStaff,
}

impl StaffVerdict {
    /// Validate lookup rows into a verdict.
    ///
    /// No rows means not staff. Otherwise the first row must be well formed.
    pub fn from_rows(rows: Vec<PermissionRow>) -> Result<Self, AppError> {
        match rows.into_iter().next() {
            None => Ok(Self::NotStaff),
            Some(row) => StaffPermissions::try_from(row).map(Self::Staff),
        }
    }

    /// Whether this verdict grants staff status.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Staff(_))
    }

    /// The permissions to expose for this verdict.
    pub fn permissions(&self) -> StaffPermissions {
        match self {
            Self::Staff(permissions) => permissions.clone(),
            Self::NotStaff => StaffPermissions::default(),
        }
    }

    /// The consumer-facing status tag for this verdict.
    pub fn status(&self) -> StaffStatus {
        match self {
            Self::Staff(_) => StaffStatus::Staff,
            Self::NotStaff => StaffStatus::NotStaff,
        }
    }
}

/// What consumers know about the current principal's staff standing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    /// No successful lookup is currently reflected in the store.
    #[default]
    Unresolved,
    /// The principal is staff.
    Staff,
    /// The principal is not staff.
    NotStaff,
}

impl StaffStatus {
    /// Only [`StaffStatus::Staff`] grants staff status.
    pub fn is_staff(self) -> bool {
        self == Self::Staff
    }
}
