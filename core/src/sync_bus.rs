//! Sync bus abstraction for mirroring commands across application instances.
//!
//! This module provides the [`SyncBus`] trait for publishing committed commands
//! to every other open instance of the application and subscribing to the
//! commands they publish. Each instance replays what it receives through its
//! own reducer, so all instances converge on the same state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Command   │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────────┐
//! │    Reducer      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  1. Persist     │◄─── Local durable copy
//! │     snapshot    │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ 2. Publish      │◄─── Best-effort, no retry
//! │    envelope     │
//! └────────┬────────┘
//!          │
//!     ┌────┴────┐
//!     │         │
//!     ▼         ▼
//! ┌───────┐ ┌───────┐
//! │ Tab B │ │ Tab C │  replay through their own reducer, then persist
//! └───────┘ └───────┘
//! ```
//!
//! # Key Principles
//!
//! - **Persist first**: an envelope is published only after the snapshot it
//!   describes has been written locally
//! - **No echo**: subscribers receive their own envelopes too and must skip
//!   them by comparing [`SyncEnvelope::source`]
//! - **No replay loops**: replayed commands and lifecycle signals are never
//!   published again
//! - **Transport order only**: there is no ordering across publishers; the
//!   last write observed wins
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use listkeeper_core::sync_bus::{SyncBus, SyncEnvelope};
//!
//! async fn example(bus: impl SyncBus) -> Result<(), SyncError> {
//!     let envelope = SyncEnvelope::new("AddList", serde_json::json!({"name": "Groceries"}), "tab-a");
//!     bus.publish(&envelope).await?;
//!
//!     let mut stream = bus.subscribe().await?;
//!     while let Some(result) = stream.next().await {
//!         match result {
//!             Ok(envelope) if envelope.source == "tab-a" => continue,
//!             Ok(envelope) => println!("Replay: {}", envelope.command_name),
//!             Err(e) => eprintln!("Sync error: {e}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during sync bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Failed to publish an envelope
    #[error("Publish failed for '{command_name}': {reason}")]
    PublishFailed {
        /// The command that failed to publish
        command_name: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to the channel
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    /// The subscriber fell behind and envelopes were dropped
    #[error("Subscriber lagged, {0} envelopes skipped")]
    Lagged(u64),

    /// An envelope could not be encoded or decoded
    #[error("Envelope codec error: {0}")]
    Codec(String),
}

/// The message unit exchanged between instances.
///
/// Carries the name of a committed command, its payload, and the id of the
/// instance that committed it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEnvelope {
    /// Command name (e.g., `"AddList"`)
    pub command_name: String,
    /// Command payload
    pub payload: serde_json::Value,
    /// Identifier of the publishing instance
    pub source: String,
}

impl SyncEnvelope {
    /// Creates a new envelope
    #[must_use]
    pub fn new(
        command_name: impl Into<String>,
        payload: serde_json::Value,
        source: impl Into<String>,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            payload,
            source: source.into(),
        }
    }

    /// Returns true if this envelope was published by `instance`
    #[must_use]
    pub fn is_from(&self, instance: &str) -> bool {
        self.source == instance
    }
}

/// Stream of envelopes from a subscription.
pub type EnvelopeStream = Pin<Box<dyn Stream<Item = Result<SyncEnvelope, SyncError>> + Send>>;

/// Trait for sync bus implementations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so the bus can be shared between
/// effects executed by the runtime and the listener task.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn SyncBus>`).
pub trait SyncBus: Send + Sync {
    /// Publish an envelope to every subscriber of the channel.
    ///
    /// Publishing with no subscribers is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PublishFailed`] if the transport rejects the envelope.
    fn publish(
        &self,
        envelope: &SyncEnvelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + '_>>;

    /// Subscribe to the channel.
    ///
    /// The returned stream yields every envelope published after the
    /// subscription was established, including the subscriber's own.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SubscriptionFailed`] if subscription fails.
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EnvelopeStream, SyncError>> + Send + '_>>;
}
