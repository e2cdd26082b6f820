//! Application shell: one running instance ("tab") of the todo-lists app.

use crate::action::AppAction;
use crate::config::AppConfig;
use crate::error::{AppError, TodoError};
use crate::persistence::PersistenceGateway;
use crate::reducer::{AppEnvironment, AppReducer};
use crate::sync;
use crate::types::{AppState, InstanceId, Theme, TodoFields, TodoItem, TodoList, untitled_list_name};
use listkeeper_core::storage::StateStorage;
use listkeeper_core::sync_bus::SyncBus;
use listkeeper_runtime::{EffectHandle, Store, StoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Store type used by the application
pub type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

/// A running instance wired to storage and the sync bus
///
/// # Example
///
/// ```no_run
/// use listkeeper_testing::{InMemoryStorage, RecordingSyncBus};
/// use std::sync::Arc;
/// use todo_lists::{AppConfig, TodoApp};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = TodoApp::start(
///     AppConfig::default(),
///     Arc::new(InMemoryStorage::new()),
///     Arc::new(RecordingSyncBus::new()),
/// )
/// .await?;
///
/// app.add_list("Groceries").await?;
/// app.add_default_item(0).await?;
/// assert_eq!(app.list(0).await.map(|list| list.todos.len()), Some(1));
/// # Ok(())
/// # }
/// ```
pub struct TodoApp {
    store: AppStore,
    config: AppConfig,
    instance: InstanceId,
    listener: JoinHandle<()>,
}

impl TodoApp {
    /// Rehydrates, builds the store, and starts listening for other instances
    ///
    /// Falls back to [`AppConfig::default_state`] when nothing usable is
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Sync`] if the bus subscription fails.
    #[tracing::instrument(skip_all, fields(key = %config.storage_key))]
    pub async fn start(
        config: AppConfig,
        storage: Arc<dyn StateStorage>,
        bus: Arc<dyn SyncBus>,
    ) -> Result<Self, AppError> {
        let instance = InstanceId::new();
        let gateway =
            PersistenceGateway::new(storage, &config.storage_key, config.storage_version);

        let initial = if let Some(state) = gateway.load().await {
            tracing::info!(lists = state.todo_lists.len(), "Rehydrated persisted state");
            state
        } else {
            tracing::info!("No persisted state, starting from defaults");
            config.default_state()
        };

        let environment = AppEnvironment::new(gateway, Arc::clone(&bus), instance.clone());
        let store = Store::with_config(
            config.default_state(),
            AppReducer::new(),
            environment,
            StoreConfig::default().with_broadcast_capacity(config.sync_capacity),
        );
        store.send(AppAction::rehydrate(initial)).await?;

        let envelopes = bus.subscribe().await?;
        let listener = tokio::spawn(sync::listen(store.clone(), envelopes, instance.clone()));

        tracing::info!(instance = %instance, "Instance started");

        Ok(Self {
            store,
            config,
            instance,
            listener,
        })
    }

    /// Applies a local command
    ///
    /// The returned handle completes once the command has been persisted and
    /// broadcast.
    ///
    /// # Errors
    ///
    /// - [`AppError::Rejected`] with [`TodoError::NotACommand`] for lifecycle
    ///   signals and replays
    /// - [`AppError::Rejected`] if an index is out of range; state is unchanged
    /// - [`AppError::Store`] once the instance is shutting down
    pub async fn dispatch(&self, action: AppAction) -> Result<EffectHandle, AppError> {
        if !action.is_command() {
            return Err(TodoError::NotACommand(action.action_name()).into());
        }

        if !self.config.is_development() {
            return Ok(self.store.send(action).await?);
        }

        tracing::info!(instance = %self.instance, ?action, "Dispatching command");
        let result = self.store.send(action).await;
        match &result {
            Ok(_) => {
                let state = self.snapshot().await;
                tracing::info!(theme = %state.theme, lists = state.todo_lists.len(), "Next state");
            },
            Err(error) => tracing::info!(error = %error, "Command rejected"),
        }
        Ok(result?)
    }

    /// Appends a list
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn add_list(&self, name: impl Into<String>) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::add_list(name)).await
    }

    /// Appends a list named `TODO List #<n+1>`
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn add_untitled_list(&self) -> Result<EffectHandle, AppError> {
        let existing = self.store.state(|state| state.todo_lists.len()).await;
        self.add_list(untitled_list_name(existing)).await
    }

    /// Renames a list
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn rename_list(
        &self,
        list_index: usize,
        name: impl Into<String>,
    ) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::RenameList {
            list_index,
            name: name.into(),
        })
        .await
    }

    /// Removes a list
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn delete_list(&self, list_index: usize) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::DeleteList { list_index }).await
    }

    /// Appends an item to a list
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn add_item(
        &self,
        list_index: usize,
        item: TodoItem,
    ) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::add_item(list_index, item)).await
    }

    /// Appends an item titled `TODO`, dated now
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn add_default_item(&self, list_index: usize) -> Result<EffectHandle, AppError> {
        self.add_item(list_index, TodoItem::dated_now("TODO")).await
    }

    /// Overwrites an item's editable fields
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn update_item(
        &self,
        list_index: usize,
        item_index: usize,
        fields: TodoFields,
    ) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::UpdateItem {
            list_index,
            item_index,
            fields,
        })
        .await
    }

    /// Removes an item
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn delete_item(
        &self,
        list_index: usize,
        item_index: usize,
    ) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::delete_item(list_index, item_index)).await
    }

    /// Flips an item's completion flag
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn toggle_done(
        &self,
        list_index: usize,
        item_index: usize,
    ) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::toggle_done(list_index, item_index)).await
    }

    /// Appends a sub-item to an item
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn add_sub_item(
        &self,
        list_index: usize,
        item_index: usize,
        item: TodoItem,
    ) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::AddSubItem {
            list_index,
            item_index,
            item,
        })
        .await
    }

    /// Sets the theme
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn set_theme(&self, mode: Theme) -> Result<EffectHandle, AppError> {
        self.dispatch(AppAction::SetTheme { mode }).await
    }

    /// Switches between light and dark
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub async fn toggle_theme(&self) -> Result<EffectHandle, AppError> {
        let current = self.theme().await;
        self.set_theme(current.toggled()).await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> AppState {
        self.store.state(Clone::clone).await
    }

    /// Current theme
    pub async fn theme(&self) -> Theme {
        self.store.state(|state| state.theme).await
    }

    /// All lists
    pub async fn todo_lists(&self) -> Vec<Arc<TodoList>> {
        self.store.state(|state| state.todo_lists.clone()).await
    }

    /// List at `index`
    pub async fn list(&self, index: usize) -> Option<Arc<TodoList>> {
        self.store.state(|state| state.list(index).cloned()).await
    }

    /// List at `index`, or the last list if `index` is past the end
    ///
    /// `None` only when there are no lists.
    pub async fn selected_list(&self, index: usize) -> Option<Arc<TodoList>> {
        self.store
            .state(|state| {
                let last = state.todo_lists.len().checked_sub(1)?;
                state.list(index.min(last)).cloned()
            })
            .await
    }

    /// Committed actions, local and remote, in commit order
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AppAction> {
        self.store.subscribe_actions()
    }

    /// Identifier stamped on this instance's envelopes
    #[must_use]
    pub const fn instance_id(&self) -> &InstanceId {
        &self.instance
    }

    /// Configuration this instance was started with
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &AppStore {
        &self.store
    }

    /// Re-reads persisted state and replaces the in-memory state with it
    ///
    /// Returns `false`, leaving state untouched, if nothing is persisted.
    ///
    /// # Errors
    ///
    /// - [`AppError::Persist`] if the record cannot be read or used
    /// - [`AppError::Store`] once the instance is shutting down
    pub async fn reload(&self) -> Result<bool, AppError> {
        let Some(state) = self.store.environment().gateway.try_load().await? else {
            return Ok(false);
        };

        self.store.send(AppAction::rehydrate(state)).await?;
        tracing::info!(instance = %self.instance, "Reloaded persisted state");
        Ok(true)
    }

    /// Stops listening, refuses new commands, and waits for pending
    /// persist and broadcast effects
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if effects are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), AppError> {
        self.listener.abort();
        self.store.shutdown(timeout).await?;
        tracing::info!(instance = %self.instance, "Instance stopped");
        Ok(())
    }
}

impl Drop for TodoApp {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl std::fmt::Debug for TodoApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoApp")
            .field("instance", &self.instance)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
