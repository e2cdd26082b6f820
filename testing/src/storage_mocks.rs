//! In-memory storage testing utilities
//!
//! Provides fast, deterministic storage for persistence tests:
//! - [`InMemoryStorage`]: `HashMap`-based [`StateStorage`] with quota and
//!   failure injection

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use listkeeper_core::storage::{StateStorage, StorageError, StorageFuture};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory storage for fast, deterministic testing.
///
/// Clones share the same underlying map, so a test can keep one handle for
/// inspection while the application owns another.
///
/// # Example
///
/// ```
/// use listkeeper_testing::InMemoryStorage;
/// use listkeeper_core::storage::StateStorage;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = InMemoryStorage::new();
///
/// storage.set_item("persist:app", "{}".to_string()).await?;
///
/// let raw = storage.get_item("persist:app").await?;
/// assert_eq!(raw.as_deref(), Some("{}"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
    unavailable: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryStorage {
    /// Create a new empty in-memory storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose value is larger than `bytes`
    #[must_use]
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Make every operation fail with [`StorageError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Store a raw value without going through the trait (for seeding tests)
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.write().unwrap().insert(key.into(), value.into());
    }

    /// Read a raw value without going through the trait
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.data.read().unwrap().get(key).cloned()
    }

    /// Number of successful `set_item` calls so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Clear all stored data (for test isolation)
    pub fn clear(&self) {
        self.data.write().unwrap().clear();
    }

    /// Get the number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Check if the storage is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().unwrap().is_empty()
    }

    /// Check if a key exists in the storage
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().unwrap().contains_key(key)
    }

    /// Get all keys in the storage
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.read().unwrap().keys().cloned().collect()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory storage disabled".to_string()));
        }
        Ok(())
    }
}

impl StateStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> StorageFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_available()?;
            Ok(self.get_raw(&key))
        })
    }

    fn set_item(&self, key: &str, value: String) -> StorageFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_available()?;

            if self.quota.is_some_and(|quota| value.len() > quota) {
                return Err(StorageError::QuotaExceeded {
                    key,
                    bytes: value.len(),
                });
            }

            self.data.write().unwrap().insert(key, value);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn remove_item(&self, key: &str) -> StorageFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_available()?;
            self.data.write().unwrap().remove(&key);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quota_rejects_large_values_and_keeps_old_value() {
        let storage = InMemoryStorage::new().with_quota(8);
        storage.insert_raw("k", "old");

        let result = storage.set_item("k", "far too large".to_string()).await;

        assert_eq!(
            result,
            Err(StorageError::QuotaExceeded {
                key: "k".to_string(),
                bytes: 13
            })
        );
        assert_eq!(storage.get_raw("k").as_deref(), Some("old"));
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn unavailable_storage_fails_every_call() {
        let storage = InMemoryStorage::new();
        storage.set_unavailable(true);

        assert!(storage.get_item("k").await.is_err());
        assert!(storage.set_item("k", String::new()).await.is_err());
        assert!(storage.remove_item("k").await.is_err());

        storage.set_unavailable(false);
        tokio_test::assert_ok!(storage.set_item("k", "v".to_string()).await);
        assert!(storage.contains_key("k"));
    }

    #[tokio::test]
    async fn remove_missing_key_succeeds() {
        let storage = InMemoryStorage::new();
        tokio_test::assert_ok!(storage.remove_item("missing").await);
        assert!(storage.is_empty());
    }
}
