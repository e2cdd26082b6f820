//! Actions accepted by the todo-lists store.

use crate::types::{AppState, Theme, TodoFields, TodoItem};
use listkeeper_macros::Action;
use serde::{Deserialize, Serialize};

/// Every input the application store accepts
///
/// Commands serialize adjacently tagged, `{"commandName": .., "payload": {..}}`,
/// which is also the shape carried across instances.
#[derive(Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "commandName",
    content = "payload",
    rename_all_fields = "camelCase"
)]
pub enum AppAction {
    /// Append a new, empty list
    #[command]
    AddList {
        /// List name
        name: String,
        /// Optional description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// Rename a list
    #[command]
    RenameList {
        /// Position of the list
        list_index: usize,
        /// New name
        name: String,
    },

    /// Remove a list, shifting later lists down
    #[command]
    DeleteList {
        /// Position of the list
        list_index: usize,
    },

    /// Append an item to a list
    #[command]
    AddItem {
        /// Position of the list
        list_index: usize,
        /// Item to append
        item: TodoItem,
    },

    /// Overwrite the editable fields of an item
    #[command]
    UpdateItem {
        /// Position of the list
        list_index: usize,
        /// Position of the item
        item_index: usize,
        /// New field values
        fields: TodoFields,
    },

    /// Remove an item, shifting later items down
    #[command]
    DeleteItem {
        /// Position of the list
        list_index: usize,
        /// Position of the item
        item_index: usize,
    },

    /// Flip the completion flag of an item
    #[command]
    ToggleDone {
        /// Position of the list
        list_index: usize,
        /// Position of the item
        item_index: usize,
    },

    /// Append a sub-item to an item
    #[command]
    AddSubItem {
        /// Position of the list
        list_index: usize,
        /// Position of the parent item
        item_index: usize,
        /// Sub-item to append
        item: TodoItem,
    },

    /// Replace the theme
    #[command]
    SetTheme {
        /// New theme
        mode: Theme,
    },

    /// Replace the whole state with a rehydrated one
    #[lifecycle]
    Rehydrate {
        /// Loaded state
        state: Box<AppState>,
    },

    /// A command received from another instance
    Synced(Box<AppAction>),
}

impl AppAction {
    /// Builds an `AddList` without description
    #[must_use]
    pub fn add_list(name: impl Into<String>) -> Self {
        Self::AddList {
            name: name.into(),
            description: None,
        }
    }

    /// Builds an `AddItem`
    #[must_use]
    pub const fn add_item(list_index: usize, item: TodoItem) -> Self {
        Self::AddItem { list_index, item }
    }

    /// Builds a `ToggleDone`
    #[must_use]
    pub const fn toggle_done(list_index: usize, item_index: usize) -> Self {
        Self::ToggleDone {
            list_index,
            item_index,
        }
    }

    /// Builds a `DeleteItem`
    #[must_use]
    pub const fn delete_item(list_index: usize, item_index: usize) -> Self {
        Self::DeleteItem {
            list_index,
            item_index,
        }
    }

    /// Builds a `Rehydrate`
    #[must_use]
    pub fn rehydrate(state: AppState) -> Self {
        Self::Rehydrate {
            state: Box::new(state),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commands_are_classified() {
        assert!(AppAction::add_list("Groceries").is_command());
        assert!(AppAction::SetTheme { mode: Theme::Light }.is_command());
        assert!(AppAction::rehydrate(AppState::default()).is_lifecycle());

        let synced = AppAction::Synced(Box::new(AppAction::toggle_done(0, 0)));
        assert!(!synced.is_command());
        assert!(!synced.is_lifecycle());
        assert_eq!(synced.action_name(), "Synced");
    }

    #[test]
    fn nine_commands() {
        assert_eq!(
            AppAction::COMMANDS,
            &[
                "AddList",
                "RenameList",
                "DeleteList",
                "AddItem",
                "UpdateItem",
                "DeleteItem",
                "ToggleDone",
                "AddSubItem",
                "SetTheme",
            ]
        );
    }

    #[test]
    fn serializes_adjacently_tagged_with_camel_case_payload() {
        let action = AppAction::toggle_done(1, 2);

        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"commandName": "ToggleDone", "payload": {"listIndex": 1, "itemIndex": 2}})
        );
    }

    #[test]
    fn add_list_description_is_optional_on_the_wire() {
        let action: AppAction = serde_json::from_value(json!({
            "commandName": "AddList",
            "payload": {"name": "Groceries"}
        }))
        .unwrap();

        assert_eq!(action, AppAction::add_list("Groceries"));
    }

    #[test]
    fn set_theme_payload_uses_lowercase_mode() {
        let action = AppAction::SetTheme { mode: Theme::Light };

        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"commandName": "SetTheme", "payload": {"mode": "light"}})
        );
    }
}
