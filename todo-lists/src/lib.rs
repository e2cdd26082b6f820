//! Client-side state engine for a multi-list todo application.
//!
//! This crate holds everything below the presentation layer:
//!
//! - Entity model: lists of items with sub-items, plus a light/dark theme
//! - Reducers: pure, index-addressed commands that fail without side effects
//! - Persistence: write-through JSON snapshots with a version stamp
//! - Sync: every committed local command is broadcast so other instances
//!   sharing the same storage converge
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use todo_lists::{AppConfig, FileStorage, LocalHub, TodoApp, TodoItem};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let storage = Arc::new(FileStorage::new(&config.data_dir));
//! let hub = LocalHub::new(config.sync_capacity);
//!
//! let tab = TodoApp::start(config.clone(), storage, Arc::new(hub.channel(&config.sync_channel))).await?;
//!
//! tab.add_list("Groceries").await?;
//! let mut handle = tab.add_item(0, TodoItem::dated_now("Milk")).await?;
//! handle.wait().await; // persisted and broadcast
//!
//! tab.toggle_done(0, 0).await?;
//! if let Some(list) = tab.list(0).await {
//!     println!("{}: {}/{} done", list.name, list.completed_count(), list.todos.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod app;
pub mod config;
pub mod error;
pub mod persistence;
pub mod reducer;
pub mod storage;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use action::AppAction;
pub use app::{AppStore, TodoApp};
pub use config::{AppConfig, Mode};
pub use error::{AppError, ConfigError, PersistError, TodoError};
pub use persistence::PersistenceGateway;
pub use reducer::{AppEnvironment, AppReducer, ThemeReducer, TodoListsReducer};
pub use storage::FileStorage;
pub use sync::{LocalChannel, LocalHub};
pub use types::{AppState, InstanceId, Theme, TodoFields, TodoItem, TodoList};
