//! Domain types for the todo-lists application.
//!
//! Lists and items are addressed by position. The root [`AppState`] keeps each
//! list behind an [`Arc`]: every mutation of a list installs a new `Arc` at the
//! same position, so a renderer can skip lists whose pointer did not change.

use crate::error::ParseThemeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// `chrono` format used for item dates
pub const DATE_TIME_FMT: &str = "%Y-%m-%d %H:%M";

/// Visual theme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background
    Light,
    /// Dark background
    #[default]
    Dark,
}

impl Theme {
    /// The other theme
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Lowercase name, as persisted
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(ParseThemeError(s.to_string())),
        }
    }
}

/// The four user-editable fields of an item
///
/// Payload of `UpdateItem`: all four are overwritten together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFields {
    /// Title
    pub title: String,
    /// Timestamp string, see [`DATE_TIME_FMT`]
    pub date: String,
    /// Markdown description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion flag
    pub is_done: bool,
}

/// A single item in a list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Title (not unique)
    pub title: String,
    /// Timestamp string, see [`DATE_TIME_FMT`]
    pub date: String,
    /// Markdown description; `None` is distinct from an empty description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion flag
    pub is_done: bool,
    /// Ordered sub-items
    #[serde(default)]
    pub sub_todos: Vec<TodoItem>,
}

impl TodoItem {
    /// Creates a new, not yet done item without description or sub-items
    #[must_use]
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            description: None,
            is_done: false,
            sub_todos: Vec::new(),
        }
    }

    /// Creates a new item dated with the local time
    #[must_use]
    pub fn dated_now(title: impl Into<String>) -> Self {
        Self::new(title, chrono::Local::now().format(DATE_TIME_FMT).to_string())
    }

    /// Sets the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Copies out the editable fields
    #[must_use]
    pub fn fields(&self) -> TodoFields {
        TodoFields {
            title: self.title.clone(),
            date: self.date.clone(),
            description: self.description.clone(),
            is_done: self.is_done,
        }
    }

    /// Overwrites the editable fields, keeping sub-items
    pub fn apply(&mut self, fields: TodoFields) {
        self.title = fields.title;
        self.date = fields.date;
        self.description = fields.description;
        self.is_done = fields.is_done;
    }
}

/// A named, ordered list of items
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    /// Display name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Items in display order
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

impl TodoList {
    /// Creates an empty list
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            todos: Vec::new(),
        }
    }

    /// Number of items marked done
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|todo| todo.is_done).count()
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.todos.len()
    }

    /// Returns true if the list has no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }
}

/// Root application state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Current theme
    pub theme: Theme,
    /// All lists, index-addressable
    pub todo_lists: Vec<Arc<TodoList>>,
}

impl AppState {
    /// Creates a state with the given theme and no lists
    #[must_use]
    pub const fn new(theme: Theme) -> Self {
        Self {
            theme,
            todo_lists: Vec::new(),
        }
    }

    /// Creates a state with one empty sample list
    #[must_use]
    pub fn with_sample_list(theme: Theme) -> Self {
        Self {
            theme,
            todo_lists: vec![Arc::new(TodoList::new(untitled_list_name(0), None))],
        }
    }

    /// List at `index`
    #[must_use]
    pub fn list(&self, index: usize) -> Option<&Arc<TodoList>> {
        self.todo_lists.get(index)
    }
}

/// Name given to a new list when `existing` lists are already present
#[must_use]
pub fn untitled_list_name(existing: usize) -> String {
    format!("TODO List #{}", existing + 1)
}

/// Identifies one running instance ("tab") on the sync channel
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a new random `InstanceId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an `InstanceId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn instance_id_display() {
        let id = InstanceId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }

    #[test]
    fn todo_item_new() {
        let item = TodoItem::new("Milk", "2024-01-01 09:00");

        assert_eq!(item.title, "Milk");
        assert!(!item.is_done);
        assert_eq!(item.description, None);
        assert!(item.sub_todos.is_empty());
    }

    #[test]
    fn empty_description_is_kept_distinct_from_none() {
        let item = TodoItem::new("Milk", "d").with_description("");
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["description"], json!(""));
        let back: TodoItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.description, Some(String::new()));
    }

    #[test]
    fn item_layout_is_camel_case_and_omits_absent_description() {
        let item = TodoItem::new("Milk", "2024-01-01 09:00");

        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"title": "Milk", "date": "2024-01-01 09:00", "isDone": false, "subTodos": []})
        );
    }

    #[test]
    fn nested_items_may_omit_sub_todos() {
        let item: TodoItem = serde_json::from_value(json!({
            "title": "Parent",
            "date": "d",
            "isDone": false,
            "subTodos": [{"title": "Child", "date": "d", "isDone": true}]
        }))
        .unwrap();

        assert_eq!(item.sub_todos.len(), 1);
        assert!(item.sub_todos[0].sub_todos.is_empty());
        assert!(item.sub_todos[0].is_done);
    }

    #[test]
    fn apply_overwrites_fields_and_keeps_sub_todos() {
        let mut item = TodoItem::new("Old", "d1");
        item.sub_todos.push(TodoItem::new("Child", "d"));

        item.apply(TodoFields {
            title: "New".to_string(),
            date: "d2".to_string(),
            description: Some("notes".to_string()),
            is_done: true,
        });

        assert_eq!(item.title, "New");
        assert_eq!(item.date, "d2");
        assert_eq!(item.description.as_deref(), Some("notes"));
        assert!(item.is_done);
        assert_eq!(item.sub_todos.len(), 1);
        assert_eq!(item.fields().title, "New");
    }

    #[test]
    fn theme_toggle_and_parse() {
        assert_eq!(Theme::default(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled().toggled(), Theme::Light);
        assert_eq!(" Light ".parse::<Theme>(), Ok(Theme::Light));
        assert_eq!(Theme::Dark.to_string(), "dark");
        assert!("blue".parse::<Theme>().is_err());
        assert_eq!(serde_json::to_value(Theme::Light).unwrap(), json!("light"));
    }

    #[test]
    fn list_counts() {
        let mut list = TodoList::new("Chores", None);
        assert!(list.is_empty());

        list.todos.push(TodoItem::new("a", "d"));
        let mut done = TodoItem::new("b", "d");
        done.is_done = true;
        list.todos.push(done);

        assert_eq!(list.len(), 2);
        assert_eq!(list.completed_count(), 1);
    }

    #[test]
    fn sample_state_has_one_numbered_list() {
        let state = AppState::with_sample_list(Theme::Light);

        assert_eq!(state.todo_lists.len(), 1);
        assert_eq!(state.list(0).unwrap().name, "TODO List #1");
        assert_eq!(untitled_list_name(2), "TODO List #3");
    }
}
