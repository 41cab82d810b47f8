//! Durable browser-bound key/value storage.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Errors from a [`LocalStorage`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying store rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A cart could not be encoded for storage.
    #[error("failed to encode cart: {0}")]
    Encode(#[from] serde_json::Error),

    /// An in-process store was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// String key/value storage scoped to one browser.
///
/// Mirrors the shape of the web `localStorage` API. Implementations must be
/// durable across requests from the same browser.
pub trait LocalStorage: Send + Sync {
    /// Read the value under `key`, if any.
    fn get_item(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Deleting an absent key is not an error.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// In-process [`LocalStorage`], shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently holds a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .lock()
            .is_ok_and(|entries| entries.contains_key(key))
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&mut entries))
    }
}

impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            entries.insert(key.to_owned(), value);
        })
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_is_shared_between_clones() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.set_item("k", "v".to_owned()).await.unwrap();
        assert_eq!(other.get_item("k").await.unwrap().as_deref(), Some("v"));

        other.remove_item("k").await.unwrap();
        other.remove_item("k").await.unwrap();
        assert!(!storage.contains_key("k"));
    }
}
