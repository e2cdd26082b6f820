//! Cross-instance sync: command envelopes, the in-process hub, and the listener.
//!
//! Every committed local command is published as a [`SyncEnvelope`]. Each
//! instance runs one listener task that replays envelopes from other
//! instances into its own store as [`AppAction::Synced`].

use crate::action::AppAction;
use crate::app::AppStore;
use crate::types::InstanceId;
use futures::StreamExt;
use listkeeper_core::sync_bus::{EnvelopeStream, SyncBus, SyncEnvelope, SyncError};
use listkeeper_runtime::StoreError;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Wraps a command in an envelope from `source`
///
/// # Errors
///
/// Returns [`SyncError::Codec`] for lifecycle signals and replays, which
/// are never sent to other instances, or if serialization fails.
pub fn encode_command(action: &AppAction, source: &InstanceId) -> Result<SyncEnvelope, SyncError> {
    if !action.is_command() {
        return Err(SyncError::Codec(format!(
            "'{}' is not a command",
            action.action_name()
        )));
    }

    let mut tagged = serde_json::to_value(action).map_err(|e| SyncError::Codec(e.to_string()))?;
    let payload = tagged
        .get_mut("payload")
        .map_or(Value::Null, Value::take);

    Ok(SyncEnvelope::new(
        action.action_name(),
        payload,
        source.to_string(),
    ))
}

/// Rebuilds the command carried by an envelope
///
/// # Errors
///
/// Returns [`SyncError::Codec`] if the name is not a command or the payload
/// does not match it.
pub fn decode_command(envelope: &SyncEnvelope) -> Result<AppAction, SyncError> {
    if !AppAction::COMMANDS.contains(&envelope.command_name.as_str()) {
        return Err(SyncError::Codec(format!(
            "'{}' is not a command",
            envelope.command_name
        )));
    }

    serde_json::from_value(json!({
        "commandName": envelope.command_name,
        "payload": envelope.payload,
    }))
    .map_err(|e| SyncError::Codec(format!("{}: {e}", envelope.command_name)))
}

/// In-process registry of named sync channels
///
/// Every [`LocalChannel`] obtained for the same name shares one broadcast
/// channel, so instances in one process behave like browser tabs on a
/// same-origin broadcast channel.
#[derive(Clone, Debug)]
pub struct LocalHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<SyncEnvelope>>>>,
    capacity: usize,
}

impl LocalHub {
    /// Creates a hub whose channels buffer `capacity` envelopes per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Returns the channel called `name`, creating it on first use
    #[must_use]
    pub fn channel(&self, name: &str) -> LocalChannel {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();

        LocalChannel {
            name: name.to_string(),
            sender,
        }
    }
}

/// One named channel of a [`LocalHub`]
///
/// Publishing delivers to every subscriber, the publisher's own
/// subscription included; listeners filter by source.
#[derive(Clone, Debug)]
pub struct LocalChannel {
    name: String,
    sender: broadcast::Sender<SyncEnvelope>,
}

impl LocalChannel {
    /// Channel name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl SyncBus for LocalChannel {
    fn publish(
        &self,
        envelope: &SyncEnvelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + '_>> {
        let envelope = envelope.clone();
        Box::pin(async move {
            // No subscribers is not an error: nobody else is listening yet.
            if let Ok(receivers) = self.sender.send(envelope) {
                tracing::trace!(channel = %self.name, receivers, "Published envelope");
            }
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

/// Replays envelopes from other instances into `store` until the stream ends
/// or the store shuts down
pub(crate) async fn listen(store: AppStore, mut envelopes: EnvelopeStream, instance: InstanceId) {
    let own_source = instance.to_string();

    while let Some(next) = envelopes.next().await {
        let envelope = match next {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(error = %error, "Sync channel error, continuing");
                continue;
            },
        };

        if envelope.is_from(&own_source) {
            continue;
        }

        let command = match decode_command(&envelope) {
            Ok(command) => command,
            Err(error) => {
                tracing::warn!(source = %envelope.source, error = %error, "Dropping undecodable envelope");
                continue;
            },
        };

        match store.send(AppAction::Synced(Box::new(command))).await {
            Ok(_) => {
                tracing::debug!(
                    source = %envelope.source,
                    command = %envelope.command_name,
                    "Applied remote command"
                );
            },
            Err(StoreError::ShutdownInProgress) => break,
            Err(error) => {
                tracing::warn!(
                    source = %envelope.source,
                    command = %envelope.command_name,
                    error = %error,
                    "Remote command rejected, local state may diverge until reload"
                );
            },
        }
    }

    tracing::debug!(instance = %own_source, "Sync listener stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Theme, TodoFields, TodoItem};

    #[test]
    fn envelope_carries_name_payload_and_source() {
        let source = InstanceId::new();
        let envelope = encode_command(&AppAction::SetTheme { mode: Theme::Light }, &source).unwrap();

        assert_eq!(envelope.command_name, "SetTheme");
        assert_eq!(envelope.payload, json!({"mode": "light"}));
        assert!(envelope.is_from(&source.to_string()));
    }

    #[test]
    fn decode_inverts_encode() {
        let source = InstanceId::new();
        let command = AppAction::UpdateItem {
            list_index: 0,
            item_index: 3,
            fields: TodoFields {
                title: "Milk".to_string(),
                date: "2024-01-01 09:00".to_string(),
                description: None,
                is_done: true,
            },
        };

        let envelope = encode_command(&command, &source).unwrap();

        assert_eq!(decode_command(&envelope).unwrap(), command);
    }

    #[test]
    fn lifecycle_and_replays_are_not_encoded() {
        let source = InstanceId::new();

        let rehydrate = AppAction::rehydrate(crate::types::AppState::default());
        assert!(matches!(
            encode_command(&rehydrate, &source),
            Err(SyncError::Codec(_))
        ));

        let replay = AppAction::Synced(Box::new(AppAction::add_list("x")));
        assert!(matches!(
            encode_command(&replay, &source),
            Err(SyncError::Codec(_))
        ));
    }

    #[test]
    fn envelopes_naming_non_commands_are_rejected() {
        let envelope = SyncEnvelope::new(
            "Rehydrate",
            json!({"state": {"theme": "dark", "todoLists": []}}),
            "remote",
        );

        assert!(matches!(decode_command(&envelope), Err(SyncError::Codec(_))));
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let envelope = SyncEnvelope::new("AddItem", json!({"listIndex": "zero"}), "remote");

        assert!(matches!(decode_command(&envelope), Err(SyncError::Codec(_))));
    }

    #[tokio::test]
    async fn channels_with_the_same_name_are_connected() {
        let hub = LocalHub::new(8);
        let tab_a = hub.channel("todo-lists-sync");
        let tab_b = hub.channel("todo-lists-sync");
        let other = hub.channel("elsewhere");
        let mut stream_b = tab_b.subscribe().await.unwrap();
        let mut stream_other = other.subscribe().await.unwrap();

        let envelope = encode_command(
            &AppAction::add_item(0, TodoItem::new("Milk", "d")),
            &InstanceId::new(),
        )
        .unwrap();
        tab_a.publish(&envelope).await.unwrap();

        assert_eq!(stream_b.next().await, Some(Ok(envelope)));
        assert_eq!(tab_a.subscriber_count(), 1);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), stream_other.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn publishing_without_subscribers_succeeds() {
        let hub = LocalHub::new(0);
        let channel = hub.channel("empty");

        let envelope = SyncEnvelope::new("DeleteList", json!({"listIndex": 0}), "a");

        assert_eq!(channel.publish(&envelope).await, Ok(()));
        assert_eq!(channel.name(), "empty");
    }
}
