//! Sync bus testing utilities
//!
//! [`RecordingSyncBus`] records everything an instance publishes and lets a
//! test inject envelopes as if another instance had published them.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use listkeeper_core::sync_bus::{EnvelopeStream, SyncBus, SyncEnvelope, SyncError};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Sync bus that records publishes and supports injecting remote envelopes.
///
/// Published envelopes are recorded and also delivered to subscribers, the
/// same way a real channel echoes to every listener including the sender.
///
/// # Example
///
/// ```
/// use listkeeper_core::sync_bus::{SyncBus, SyncEnvelope};
/// use listkeeper_testing::RecordingSyncBus;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = RecordingSyncBus::new();
/// bus.publish(&SyncEnvelope::new("SetTheme", serde_json::json!({"mode": "light"}), "tab-a")).await?;
///
/// assert_eq!(bus.published_names(), vec!["SetTheme"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RecordingSyncBus {
    published: Arc<Mutex<Vec<SyncEnvelope>>>,
    sender: broadcast::Sender<SyncEnvelope>,
    failing: Arc<AtomicBool>,
}

impl RecordingSyncBus {
    /// Create a new bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            sender,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make `publish` fail with [`SyncError::PublishFailed`]
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Deliver an envelope to subscribers without recording it
    ///
    /// Simulates another instance publishing on the channel.
    pub fn inject(&self, envelope: SyncEnvelope) {
        let _ = self.sender.send(envelope);
    }

    /// Every envelope published so far, oldest first
    #[must_use]
    pub fn published(&self) -> Vec<SyncEnvelope> {
        self.published.lock().unwrap().clone()
    }

    /// Command names of everything published so far, oldest first
    #[must_use]
    pub fn published_names(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|envelope| envelope.command_name.clone())
            .collect()
    }

    /// Forget recorded envelopes
    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RecordingSyncBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncBus for RecordingSyncBus {
    fn publish(
        &self,
        envelope: &SyncEnvelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + '_>> {
        let envelope = envelope.clone();
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncError::PublishFailed {
                    command_name: envelope.command_name,
                    reason: "recording bus set to fail".to_string(),
                });
            }

            self.published.lock().unwrap().push(envelope.clone());
            let _ = self.sender.send(envelope);
            Ok(())
        })
    }

    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EnvelopeStream, SyncError>> + Send + '_>> {
        Box::pin(async move {
            let mut rx = self.sender.subscribe();

            let stream = async_stream::stream! {
                loop {
                    match rx.recv().await {
                        Ok(envelope) => yield Ok(envelope),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            yield Err(SyncError::Lagged(skipped));
                        },
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };

            Ok(Box::pin(stream) as EnvelopeStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn envelope(name: &str, source: &str) -> SyncEnvelope {
        SyncEnvelope::new(name, serde_json::json!({}), source)
    }

    #[tokio::test]
    async fn publish_records_and_echoes() {
        let bus = RecordingSyncBus::new();
        let mut stream = bus.subscribe().await.unwrap();

        bus.publish(&envelope("AddList", "a")).await.unwrap();

        assert_eq!(bus.published_names(), vec!["AddList"]);
        assert_eq!(stream.next().await, Some(Ok(envelope("AddList", "a"))));
    }

    #[tokio::test]
    async fn inject_reaches_subscribers_without_recording() {
        let bus = RecordingSyncBus::new();
        let mut stream = bus.subscribe().await.unwrap();

        bus.inject(envelope("DeleteList", "remote"));

        assert!(bus.published().is_empty());
        assert_eq!(stream.next().await, Some(Ok(envelope("DeleteList", "remote"))));
    }

    #[tokio::test]
    async fn failing_bus_rejects_publish() {
        let bus = RecordingSyncBus::new();
        bus.set_failing(true);

        let result = bus.publish(&envelope("SetTheme", "a")).await;

        assert!(matches!(result, Err(SyncError::PublishFailed { .. })));
        assert!(bus.published().is_empty());
    }
}
