//! Permission lookup trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{PermissionRow, UserId};

/// The remote call returning staff capability rows for a user.
#[async_trait]
pub trait PermissionLookup: Send + Sync + std::fmt::Debug {
    /// Returns zero rows for non-staff users, otherwise at least one row.
    async fn staff_permissions(&self, user_id: &UserId) -> AppResult<Vec<PermissionRow>>;
}
