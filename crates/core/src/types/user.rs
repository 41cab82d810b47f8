//! Signed-in user view.

use serde::{Deserialize, Serialize};

use crate::types::email::Email;
use crate::types::id::UserId;
use crate::types::status::Role;

/// The simplified identity the storefront works with.
///
/// Built once from a backend session; the role is resolved at that point and
/// never recomputed per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
}

impl CurrentUser {
    /// Whether this user may use the admin dashboard.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
