//! # Listkeeper Testing
//!
//! Testing utilities and helpers for the Listkeeper state engine.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers, including rejections
//! - [`InMemoryStorage`]: `HashMap`-backed storage with quota and failure injection
//! - [`RecordingSyncBus`]: Sync bus that records publishes and injects remote envelopes
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use listkeeper_testing::{InMemoryStorage, RecordingSyncBus};
//!
//! #[tokio::test]
//! async fn test_add_list() {
//!     let storage = Arc::new(InMemoryStorage::new());
//!     let bus = Arc::new(RecordingSyncBus::new());
//!     let app = TodoApp::start(config, storage.clone(), bus.clone()).await?;
//!
//!     app.add_list("Groceries").await?.wait().await;
//!
//!     assert_eq!(bus.published().len(), 1);
//! }
//! ```

mod storage_mocks;
mod sync_mocks;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of the storage and sync seams
pub mod mocks {
    pub use super::storage_mocks::InMemoryStorage;
    pub use super::sync_mocks::RecordingSyncBus;
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Short printable text, possibly empty
    pub fn short_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 #!?-]{0,24}"
    }

    /// Optional short text
    pub fn optional_text() -> impl Strategy<Value = Option<String>> {
        proptest::option::of(short_text())
    }

    /// An index that may or may not be in range for a collection of `len`
    /// elements: mostly valid, sometimes one or a few past the end
    pub fn index_near(len: usize) -> impl Strategy<Value = usize> {
        0..len + 3
    }
}

// Re-export commonly used items
pub use mocks::{InMemoryStorage, RecordingSyncBus};
