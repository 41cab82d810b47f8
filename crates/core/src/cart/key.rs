//! Cart key derivation.

use std::fmt;

use crate::cart::storage::{LocalStorage, StorageError};
use crate::types::id::UserId;

/// Storage key holding the browser's permanent anonymous id.
pub const ANONYMOUS_ID_KEY: &str = "cart_anonymous_id";

const USER_PREFIX: &str = "cart_";
const ANONYMOUS_PREFIX: &str = "cart_anonymous_";

/// The storage partition a cart lives under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey(String);

impl CartKey {
    /// Key for a signed-in user: `cart_<user_id>`.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self(format!("{USER_PREFIX}{user_id}"))
    }

    /// Key for an anonymous browser: `cart_anonymous_<id>`.
    #[must_use]
    pub fn for_anonymous(anonymous_id: &str) -> Self {
        Self(format!("{ANONYMOUS_PREFIX}{anonymous_id}"))
    }

    /// Resolve the key for the current identity.
    ///
    /// A signed-in user always gets their own key. Otherwise the browser's
    /// anonymous id is read from storage, minting and storing a fresh UUID v4
    /// the first time. Once written the anonymous id is never changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the anonymous id cannot be read or stored.
    pub async fn derive<S: LocalStorage>(
        storage: &S,
        user: Option<UserId>,
    ) -> Result<Self, StorageError> {
        if let Some(user_id) = user {
            return Ok(Self::for_user(user_id));
        }

        let existing = storage
            .get_item(ANONYMOUS_ID_KEY)
            .await?
            .filter(|id| !id.trim().is_empty());

        let anonymous_id = match existing {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                storage.set_item(ANONYMOUS_ID_KEY, id.clone()).await?;
                tracing::debug!(anonymous_id = %id, "minted anonymous cart id");
                id
            }
        };

        Ok(Self::for_anonymous(&anonymous_id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to an anonymous browser.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.starts_with(ANONYMOUS_PREFIX)
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
