//! Status and role enums.

use serde::{Deserialize, Serialize};

use crate::types::email::Email;

/// Order lifecycle status.
///
/// There is no enforced transition graph: an administrator may overwrite the
/// status with any value at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Every status, in display order for the admin dashboard.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Canceled,
    ];

    /// Wire name as stored by the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
            Self::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Storefront role of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can manage orders in the admin dashboard.
    Admin,
    /// Regular shopper.
    #[default]
    Customer,
}

impl Role {
    /// Resolve a role once, when the session is fetched.
    ///
    /// A role claim issued by the backend takes precedence. Without a claim,
    /// the account is an admin only if its email matches the configured
    /// administrator address, compared case-insensitively.
    #[must_use]
    pub fn resolve(claim: Option<&str>, email: &Email, admin_email: &Email) -> Self {
        match claim.map(str::trim) {
            Some(claim) if claim.eq_ignore_ascii_case("admin") => Self::Admin,
            Some(claim) if !claim.is_empty() => Self::Customer,
            _ if email.matches(admin_email) => Self::Admin,
            _ => Self::Customer,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Customer => write!(f, "customer"),
        }
    }
}
