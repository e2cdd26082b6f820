//! Durable key-value storage abstraction.
//!
//! [`StateStorage`] is the seam between the persistence layer and whatever
//! actually keeps the bytes: a directory of files, an in-memory map in
//! tests, or a browser's local storage behind a bridge. Values are strings,
//! mirroring the `getItem`/`setItem`/`removeItem` contract of web storage.
//!
//! # Example
//!
//! ```rust,ignore
//! use listkeeper_core::storage::StateStorage;
//!
//! async fn example(storage: &dyn StateStorage) -> Result<(), StorageError> {
//!     storage.set_item("persist:app", r#"{"theme":"dark"}"#.to_string()).await?;
//!     let raw = storage.get_item("persist:app").await?;
//!     assert!(raw.is_some());
//!     storage.remove_item("persist:app").await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur while reading or writing storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store cannot be reached (missing directory, disabled storage)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Writing the value would exceed the storage quota
    #[error("Storage quota exceeded writing '{key}' ({bytes} bytes)")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Size of the rejected value
        bytes: usize,
    },

    /// I/O failure while reading or writing
    #[error("Storage I/O error: {0}")]
    Io(String),
}

/// Boxed future returned by [`StateStorage`] methods.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Trait for durable string key-value stores.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be shared as `Arc<dyn StateStorage>` between the persistence
/// gateway and effects spawned by the runtime.
pub trait StateStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored under the key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn get_item(&self, key: &str) -> StorageFuture<'_, Option<String>>;

    /// Store `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write fails or exceeds the quota.
    fn set_item(&self, key: &str, value: String) -> StorageFuture<'_, ()>;

    /// Remove the value stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn remove_item(&self, key: &str) -> StorageFuture<'_, ()>;
}
