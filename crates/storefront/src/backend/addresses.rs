//! Saved shipping addresses in the `addresses` table.

use chrono::{DateTime, Utc};
use marketstall_core::{AddressId, ShippingAddress, UserId};
use serde::{Deserialize, Serialize};

use super::{BackendClient, BackendError};

const TABLE: &str = "addresses";

/// A shipping address saved to a user's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub address: ShippingAddress,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct NewAddress<'a> {
    user_id: UserId,
    #[serde(flatten)]
    address: &'a ShippingAddress,
}

impl BackendClient {
    /// List a user's saved addresses, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn list_addresses(&self, user_id: UserId) -> Result<Vec<SavedAddress>, BackendError> {
        self.select(
            TABLE,
            &[("user_id", user_id.to_string())],
            Some("created_at.desc"),
        )
        .await
    }

    /// Save a new address for a user.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the row.
    pub async fn insert_address(
        &self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<SavedAddress, BackendError> {
        self.insert(TABLE, &NewAddress { user_id, address }).await
    }

    /// Delete one of a user's addresses. Other users' rows are never matched.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn delete_address(&self, user_id: UserId, id: AddressId) -> Result<(), BackendError> {
        self.delete(
            TABLE,
            &[("id", id.to_string()), ("user_id", user_id.to_string())],
        )
        .await
    }
}
