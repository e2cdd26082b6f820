//! Error types for the todo-lists application.

use listkeeper_core::storage::StorageError;
use listkeeper_core::sync_bus::SyncError;
use listkeeper_runtime::StoreError;
use thiserror::Error;

/// Why a command could not be applied.
///
/// Returned by the reducers; the state is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// No list at the given position
    #[error("List index {index} out of bounds ({len} lists)")]
    ListIndexOutOfBounds {
        /// Requested list index
        index: usize,
        /// Number of lists
        len: usize,
    },

    /// No item at the given position in an existing list
    #[error("Item index {index} out of bounds for list {list_index} ({len} items)")]
    ItemIndexOutOfBounds {
        /// List the item was looked up in
        list_index: usize,
        /// Requested item index
        index: usize,
        /// Number of items in the list
        len: usize,
    },

    /// A lifecycle signal or replay wrapper was dispatched or replayed as a command
    #[error("'{0}' is not a command")]
    NotACommand(&'static str),
}

/// Errors from the persistence gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// Reading the record from storage failed
    #[error("Failed to read persisted state: {0}")]
    ReadFailed(StorageError),

    /// Writing the record to storage failed
    #[error("Failed to write persisted state: {0}")]
    WriteFailed(StorageError),

    /// The stored record is not valid JSON or does not match the layout
    #[error("Persisted state is malformed: {0}")]
    Malformed(String),

    /// The stored record was written by a different version
    #[error("Persisted state version {found} does not match expected version {expected}")]
    VersionMismatch {
        /// Version found in the record
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// The state could not be serialized
    #[error("Failed to encode state: {0}")]
    Encode(String),
}

/// Invalid configuration value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value '{value}' for {key}: {reason}")]
pub struct ConfigError {
    /// Environment variable name
    pub key: String,
    /// Offending value
    pub value: String,
    /// What was expected
    pub reason: String,
}

/// Unknown theme name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown theme '{0}', expected 'light' or 'dark'")]
pub struct ParseThemeError(pub String);

/// Errors surfaced by [`TodoApp`](crate::TodoApp).
#[derive(Error, Debug)]
pub enum AppError {
    /// The command was rejected; state is unchanged
    #[error(transparent)]
    Rejected(#[from] TodoError),

    /// The store refused the command (shutting down) or timed out stopping
    #[error(transparent)]
    Store(StoreError),

    /// Subscribing to the sync channel failed
    #[error("Sync channel unavailable: {0}")]
    Sync(#[from] SyncError),

    /// Persisted state could not be read
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error.rejection::<TodoError>() {
            Some(rejection) => Self::Rejected(rejection.clone()),
            None => Self::Store(error),
        }
    }
}

impl AppError {
    /// The reducer's rejection, if this is one
    #[must_use]
    pub const fn rejection(&self) -> Option<&TodoError> {
        match self {
            Self::Rejected(error) => Some(error),
            Self::Store(_) | Self::Sync(_) | Self::Persist(_) => None,
        }
    }
}
