//! Reducers for the todo-lists application.
//!
//! [`ThemeReducer`] and [`TodoListsReducer`] each own one slice of
//! [`AppState`]; [`AppReducer`] scopes and combines them, and decides which
//! side effects a committed action produces:
//!
//! | Action            | Effects                          |
//! |-------------------|----------------------------------|
//! | local command     | persist, then broadcast          |
//! | `Synced(command)` | persist                          |
//! | `Rehydrate`       | none                             |

use crate::action::AppAction;
use crate::error::TodoError;
use crate::persistence::PersistenceGateway;
use crate::sync::encode_command;
use crate::types::{AppState, InstanceId, Theme, TodoItem, TodoList};
use listkeeper_core::composition::{
    BoxedReducer, CombinedReducer, combine_reducers, scope_reducer,
};
use listkeeper_core::sync_bus::{SyncBus, SyncEnvelope};
use listkeeper_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use std::sync::Arc;

/// Dependencies injected into the reducers
#[derive(Clone)]
pub struct AppEnvironment {
    /// Where committed state is written
    pub gateway: PersistenceGateway,
    /// Where committed local commands are published
    pub sync: Arc<dyn SyncBus>,
    /// This instance, stamped on published envelopes
    pub instance: InstanceId,
}

impl AppEnvironment {
    /// Creates a new `AppEnvironment`
    #[must_use]
    pub fn new(gateway: PersistenceGateway, sync: Arc<dyn SyncBus>, instance: InstanceId) -> Self {
        Self {
            gateway,
            sync,
            instance,
        }
    }
}

impl std::fmt::Debug for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppEnvironment")
            .field("gateway", &self.gateway)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

/// Owns the theme slice
#[derive(Clone, Copy, Debug, Default)]
pub struct ThemeReducer;

impl Reducer for ThemeReducer {
    type State = Theme;
    type Action = AppAction;
    type Environment = AppEnvironment;
    type Error = TodoError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
        if let AppAction::SetTheme { mode } = action {
            *state = mode;
        }
        Ok(SmallVec::new())
    }
}

/// Owns the list slice
///
/// Every edit of a list clones it and installs a new `Arc` at the same
/// position; other lists keep their identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct TodoListsReducer;

impl TodoListsReducer {
    /// Runs `edit` on a copy of the list at `index` and installs the copy
    /// if the edit succeeds
    fn replace_list<F>(
        lists: &mut [Arc<TodoList>],
        index: usize,
        edit: F,
    ) -> Result<(), TodoError>
    where
        F: FnOnce(&mut TodoList) -> Result<(), TodoError>,
    {
        let len = lists.len();
        let slot = lists
            .get_mut(index)
            .ok_or(TodoError::ListIndexOutOfBounds { index, len })?;

        let mut list = (**slot).clone();
        edit(&mut list)?;
        *slot = Arc::new(list);
        Ok(())
    }

    fn item_mut(
        list: &mut TodoList,
        list_index: usize,
        item_index: usize,
    ) -> Result<&mut TodoItem, TodoError> {
        let len = list.todos.len();
        list.todos
            .get_mut(item_index)
            .ok_or(TodoError::ItemIndexOutOfBounds {
                list_index,
                index: item_index,
                len,
            })
    }

    fn item(
        lists: &[Arc<TodoList>],
        list_index: usize,
        item_index: usize,
    ) -> Result<&TodoItem, TodoError> {
        let list = lists
            .get(list_index)
            .ok_or(TodoError::ListIndexOutOfBounds {
                index: list_index,
                len: lists.len(),
            })?;

        list.todos
            .get(item_index)
            .ok_or(TodoError::ItemIndexOutOfBounds {
                list_index,
                index: item_index,
                len: list.todos.len(),
            })
    }
}

impl Reducer for TodoListsReducer {
    type State = Vec<Arc<TodoList>>;
    type Action = AppAction;
    type Environment = AppEnvironment;
    type Error = TodoError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
        match action {
            AppAction::AddList { name, description } => {
                state.push(Arc::new(TodoList::new(name, description)));
            },

            AppAction::RenameList { list_index, name } => {
                Self::replace_list(state, list_index, |list| {
                    list.name = name;
                    Ok(())
                })?;
            },

            AppAction::DeleteList { list_index } => {
                if list_index >= state.len() {
                    return Err(TodoError::ListIndexOutOfBounds {
                        index: list_index,
                        len: state.len(),
                    });
                }
                state.remove(list_index);
            },

            AppAction::AddItem { list_index, item } => {
                Self::replace_list(state, list_index, |list| {
                    list.todos.push(item);
                    Ok(())
                })?;
            },

            AppAction::UpdateItem {
                list_index,
                item_index,
                fields,
            } => {
                Self::replace_list(state, list_index, |list| {
                    Self::item_mut(list, list_index, item_index)?.apply(fields);
                    Ok(())
                })?;
            },

            AppAction::DeleteItem {
                list_index,
                item_index,
            } => {
                Self::replace_list(state, list_index, |list| {
                    let len = list.todos.len();
                    if item_index >= len {
                        return Err(TodoError::ItemIndexOutOfBounds {
                            list_index,
                            index: item_index,
                            len,
                        });
                    }
                    list.todos.remove(item_index);
                    Ok(())
                })?;
            },

            AppAction::ToggleDone {
                list_index,
                item_index,
            } => {
                let mut fields = Self::item(state, list_index, item_index)?.fields();
                fields.is_done = !fields.is_done;

                return self.reduce(
                    state,
                    AppAction::UpdateItem {
                        list_index,
                        item_index,
                        fields,
                    },
                    env,
                );
            },

            AppAction::AddSubItem {
                list_index,
                item_index,
                item,
            } => {
                Self::replace_list(state, list_index, |list| {
                    Self::item_mut(list, list_index, item_index)?
                        .sub_todos
                        .push(item);
                    Ok(())
                })?;
            },

            // Other slices and wrappers
            AppAction::SetTheme { .. } | AppAction::Rehydrate { .. } | AppAction::Synced(_) => {},
        }

        Ok(SmallVec::new())
    }
}

/// Root reducer
pub struct AppReducer {
    slices: CombinedReducer<AppState, AppAction, AppEnvironment, TodoError>,
}

fn theme_slice(state: &AppState) -> &Theme {
    &state.theme
}

fn set_theme_slice(state: &mut AppState, theme: Theme) {
    state.theme = theme;
}

fn lists_slice(state: &AppState) -> &Vec<Arc<TodoList>> {
    &state.todo_lists
}

fn set_lists_slice(state: &mut AppState, lists: Vec<Arc<TodoList>>) {
    state.todo_lists = lists;
}

impl AppReducer {
    /// Creates a new `AppReducer`
    #[must_use]
    pub fn new() -> Self {
        let slices: Vec<BoxedReducer<AppState, AppAction, AppEnvironment, TodoError>> = vec![
            Box::new(scope_reducer(ThemeReducer, theme_slice, set_theme_slice)),
            Box::new(scope_reducer(TodoListsReducer, lists_slice, set_lists_slice)),
        ];

        Self {
            slices: combine_reducers(slices),
        }
    }

    /// Writes a snapshot of the committed state
    fn persist(state: &AppState, env: &AppEnvironment) -> Effect<AppAction> {
        let snapshot = state.clone();
        let gateway = env.gateway.clone();

        Effect::fire_and_forget(async move {
            if let Err(error) = gateway.save(&snapshot).await {
                tracing::warn!(error = %error, "Failed to persist state");
            }
        })
    }

    /// Publishes a committed local command to other instances
    fn broadcast(envelope: SyncEnvelope, env: &AppEnvironment) -> Effect<AppAction> {
        let sync = Arc::clone(&env.sync);

        Effect::fire_and_forget(async move {
            if let Err(error) = sync.publish(&envelope).await {
                tracing::warn!(command = %envelope.command_name, error = %error, "Failed to broadcast command");
            }
        })
    }
}

impl Default for AppReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppReducer")
            .field("slices", &self.slices.len())
            .finish()
    }
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment;
    type Error = TodoError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
        match action {
            AppAction::Rehydrate { state: loaded } => {
                *state = *loaded;
                Ok(SmallVec::new())
            },

            AppAction::Synced(command) => {
                if !command.is_command() {
                    return Err(TodoError::NotACommand(command.action_name()));
                }

                self.slices.reduce(state, *command, env)?;
                Ok(smallvec![Self::persist(state, env)])
            },

            command => {
                let envelope = encode_command(&command, &env.instance);

                self.slices.reduce(state, command, env)?;

                let broadcast = match envelope {
                    Ok(envelope) => Self::broadcast(envelope, env),
                    Err(error) => {
                        tracing::warn!(error = %error, "Committed command will not be broadcast");
                        Effect::None
                    },
                };

                Ok(smallvec![Effect::chain(vec![
                    Self::persist(state, env),
                    broadcast,
                ])])
            },
        }
    }
}
