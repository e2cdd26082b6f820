//! Persistence gateway: write-through snapshots of [`AppState`].
//!
//! The whole state is stored as one JSON record under `persist:<storage key>`:
//!
//! ```json
//! {"theme":"dark","todoLists":[...],"_persist":{"version":1}}
//! ```
//!
//! A record written with another version is treated as absent; there is no
//! migration.

use crate::error::PersistError;
use crate::types::AppState;
use listkeeper_core::storage::StateStorage;
use serde_json::{Value, json};
use std::sync::Arc;

/// Prefix added to every storage key
pub const PERSIST_KEY_PREFIX: &str = "persist:";

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "basic-todolist-app-test";

/// Name of the metadata field inside the record
const META_FIELD: &str = "_persist";

/// Reads and writes the persisted [`AppState`] record
#[derive(Clone)]
pub struct PersistenceGateway {
    storage: Arc<dyn StateStorage>,
    key: String,
    version: u32,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("key", &self.key)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl PersistenceGateway {
    /// Creates a gateway for `persist:<storage_key>` at the given version
    #[must_use]
    pub fn new(storage: Arc<dyn StateStorage>, storage_key: &str, version: u32) -> Self {
        Self {
            storage,
            key: format!("{PERSIST_KEY_PREFIX}{storage_key}"),
            version,
        }
    }

    /// Full, namespaced storage key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Version written into and expected from the record
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Serializes `state` into the record layout
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encode`] if the state cannot be serialized.
    pub fn encode(&self, state: &AppState) -> Result<String, PersistError> {
        let mut record =
            serde_json::to_value(state).map_err(|e| PersistError::Encode(e.to_string()))?;

        let Value::Object(fields) = &mut record else {
            return Err(PersistError::Encode("state is not a JSON object".to_string()));
        };
        fields.insert(META_FIELD.to_string(), json!({ "version": self.version }));

        serde_json::to_string(&record).map_err(|e| PersistError::Encode(e.to_string()))
    }

    /// Parses and validates a record
    ///
    /// # Errors
    ///
    /// - [`PersistError::Malformed`] if the payload is not a valid record
    /// - [`PersistError::VersionMismatch`] if it was written with another version
    pub fn decode(&self, raw: &str) -> Result<AppState, PersistError> {
        let mut record: Value =
            serde_json::from_str(raw).map_err(|e| PersistError::Malformed(e.to_string()))?;

        let found = record
            .get(META_FIELD)
            .and_then(|meta| meta.get("version"))
            .and_then(Value::as_u64)
            .ok_or_else(|| PersistError::Malformed(format!("missing {META_FIELD}.version")))?;
        let found = u32::try_from(found)
            .map_err(|_| PersistError::Malformed(format!("version {found} out of range")))?;

        if found != self.version {
            return Err(PersistError::VersionMismatch {
                found,
                expected: self.version,
            });
        }

        if let Value::Object(fields) = &mut record {
            fields.remove(META_FIELD);
        }

        serde_json::from_value(record).map_err(|e| PersistError::Malformed(e.to_string()))
    }

    /// Reads the record, reporting why it could not be used
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::ReadFailed`] if storage fails, or the
    /// [`decode`](Self::decode) error for an unusable record.
    pub async fn try_load(&self) -> Result<Option<AppState>, PersistError> {
        let raw = self
            .storage
            .get_item(&self.key)
            .await
            .map_err(PersistError::ReadFailed)?;

        raw.map(|raw| self.decode(&raw)).transpose()
    }

    /// Reads the record, or `None` if there is nothing usable
    ///
    /// Failures are logged; callers fall back to a default state.
    pub async fn load(&self) -> Option<AppState> {
        match self.try_load().await {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(key = %self.key, error = %error, "Discarding persisted state");
                None
            },
        }
    }

    /// Overwrites the record with `state`
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encode`] or [`PersistError::WriteFailed`].
    #[tracing::instrument(skip(self, state), fields(key = %self.key))]
    pub async fn save(&self, state: &AppState) -> Result<(), PersistError> {
        let raw = self.encode(state)?;
        let bytes = raw.len();

        self.storage
            .set_item(&self.key, raw)
            .await
            .map_err(PersistError::WriteFailed)?;

        tracing::debug!(bytes, "Persisted state");
        Ok(())
    }

    /// Removes the record
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::WriteFailed`] if storage fails.
    pub async fn purge(&self) -> Result<(), PersistError> {
        self.storage
            .remove_item(&self.key)
            .await
            .map_err(PersistError::WriteFailed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Theme, TodoItem, TodoList};
    use listkeeper_core::storage::StorageError;
    use listkeeper_testing::InMemoryStorage;

    fn gateway(storage: &InMemoryStorage) -> PersistenceGateway {
        PersistenceGateway::new(Arc::new(storage.clone()), DEFAULT_STORAGE_KEY, 1)
    }

    fn groceries() -> AppState {
        let mut list = TodoList::new("Groceries", None);
        list.todos
            .push(TodoItem::new("Milk", "2024-01-01 09:00").with_description("2%"));
        AppState {
            theme: Theme::Light,
            todo_lists: vec![Arc::new(list)],
        }
    }

    #[test]
    fn key_is_namespaced() {
        let storage = InMemoryStorage::new();
        assert_eq!(gateway(&storage).key(), "persist:basic-todolist-app-test");
    }

    #[test]
    fn record_layout() {
        let storage = InMemoryStorage::new();
        let raw = gateway(&storage).encode(&AppState::default()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(
            value,
            json!({"theme": "dark", "todoLists": [], "_persist": {"version": 1}})
        );
    }

    #[tokio::test]
    async fn missing_record_loads_as_none() {
        let storage = InMemoryStorage::new();

        assert_eq!(gateway(&storage).try_load().await, Ok(None));
        assert_eq!(gateway(&storage).load().await, None);
    }

    #[tokio::test]
    async fn save_then_load() {
        let storage = InMemoryStorage::new();
        let gateway = gateway(&storage);

        gateway.save(&groceries()).await.unwrap();

        assert_eq!(gateway.load().await, Some(groceries()));
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn resaving_a_loaded_state_leaves_the_payload_unchanged() {
        let storage = InMemoryStorage::new();
        let gateway = gateway(&storage);
        gateway.save(&groceries()).await.unwrap();
        let before = storage.get_raw(gateway.key()).unwrap();

        let loaded = gateway.load().await.unwrap();
        gateway.save(&loaded).await.unwrap();

        assert_eq!(storage.get_raw(gateway.key()).unwrap(), before);
    }

    #[tokio::test]
    async fn corrupted_payload_is_malformed() {
        let storage = InMemoryStorage::new();
        storage.insert_raw("persist:basic-todolist-app-test", "{not json");
        let gateway = gateway(&storage);

        assert!(matches!(
            gateway.try_load().await,
            Err(PersistError::Malformed(_))
        ));
        assert_eq!(gateway.load().await, None);
    }

    #[tokio::test]
    async fn record_without_version_is_malformed() {
        let storage = InMemoryStorage::new();
        storage.insert_raw(
            "persist:basic-todolist-app-test",
            r#"{"theme":"dark","todoLists":[]}"#,
        );

        assert!(matches!(
            gateway(&storage).try_load().await,
            Err(PersistError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn other_version_is_treated_as_absent() {
        let storage = InMemoryStorage::new();
        storage.insert_raw(
            "persist:basic-todolist-app-test",
            r#"{"theme":"light","todoLists":[],"_persist":{"version":2}}"#,
        );
        let gateway = gateway(&storage);

        assert_eq!(
            gateway.try_load().await,
            Err(PersistError::VersionMismatch {
                found: 2,
                expected: 1
            })
        );
        assert_eq!(gateway.load().await, None);
    }

    #[tokio::test]
    async fn unavailable_storage() {
        let storage = InMemoryStorage::new();
        let gateway = gateway(&storage);
        storage.set_unavailable(true);

        assert!(matches!(
            gateway.try_load().await,
            Err(PersistError::ReadFailed(StorageError::Unavailable(_)))
        ));
        assert!(matches!(
            gateway.save(&groceries()).await,
            Err(PersistError::WriteFailed(_))
        ));
    }

    #[tokio::test]
    async fn quota_exceeded_is_a_write_failure() {
        let storage = InMemoryStorage::new().with_quota(16);
        let gateway = gateway(&storage);

        assert!(matches!(
            gateway.save(&groceries()).await,
            Err(PersistError::WriteFailed(StorageError::QuotaExceeded { .. }))
        ));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn purge_removes_the_record() {
        let storage = InMemoryStorage::new();
        let gateway = gateway(&storage);
        gateway.save(&groceries()).await.unwrap();

        gateway.purge().await.unwrap();

        assert!(!storage.contains_key(gateway.key()));
        assert_eq!(gateway.load().await, None);
    }
}
