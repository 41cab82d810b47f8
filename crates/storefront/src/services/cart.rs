//! Cart storage bound to the browser session.
//!
//! The session cookie identifies one browser, and the session lives for 30
//! days of inactivity, so it stands in for the browser's local storage. Sign
//! out only removes auth entries; the anonymous cart id and every stored cart
//! survive.

use marketstall_core::UserId;
use marketstall_core::cart::{CartStore, LocalStorage, StorageError};
use tower_sessions::Session;

use crate::models::session_keys::LOCAL_STORAGE_PREFIX;

/// [`LocalStorage`] over a `tower_sessions::Session`.
#[derive(Clone)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    fn session_key(key: &str) -> String {
        format!("{LOCAL_STORAGE_PREFIX}{key}")
    }
}

fn storage_error(e: tower_sessions::session::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

impl LocalStorage for SessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.session
            .get::<String>(&Self::session_key(key))
            .await
            .map_err(storage_error)
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.session
            .insert(&Self::session_key(key), value)
            .await
            .map_err(storage_error)
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.session
            .remove_value(&Self::session_key(key))
            .await
            .map(drop)
            .map_err(storage_error)
    }
}

/// Open the cart for this browser and identity.
///
/// # Errors
///
/// Returns `StorageError` if the session store fails.
pub async fn open_cart(
    session: Session,
    user: Option<UserId>,
) -> Result<CartStore<SessionStorage>, StorageError> {
    CartStore::open(SessionStorage::new(session), user).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use marketstall_core::cart::ANONYMOUS_ID_KEY;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_entries_are_namespaced_in_session() {
        let session = session();
        let storage = SessionStorage::new(session.clone());

        storage.set_item("cart_abc", "[]".to_string()).await.unwrap();
        let raw: Option<String> = session.get("local_storage:cart_abc").await.unwrap();
        assert_eq!(raw.as_deref(), Some("[]"));

        storage.remove_item("cart_abc").await.unwrap();
        assert!(storage.get_item("cart_abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_anonymous_id_lives_in_session() {
        let session = session();
        let cart = open_cart(session.clone(), None).await.unwrap();

        let stored: Option<String> = session
            .get(&format!("{LOCAL_STORAGE_PREFIX}{ANONYMOUS_ID_KEY}"))
            .await
            .unwrap();
        let anonymous_id = stored.unwrap();
        assert_eq!(cart.key().as_str(), format!("cart_anonymous_{anonymous_id}"));
    }
}
