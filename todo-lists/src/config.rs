//! Configuration management for the todo-lists application.
//!
//! Loads configuration from `TODO_LISTS_*` environment variables with
//! sensible defaults. Unset variables take their default; set but invalid
//! values are an error.

use crate::error::ConfigError;
use crate::persistence::DEFAULT_STORAGE_KEY;
use crate::types::{AppState, Theme};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Build mode; development logs every dispatched command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Verbose command logging
    Development,
    /// Quiet
    #[default]
    Production,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err("expected 'development' or 'production'".to_string()),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `TODO_LISTS_MODE` (default: production)
    pub mode: Mode,
    /// `TODO_LISTS_STORAGE_KEY`, stored under `persist:<key>`
    pub storage_key: String,
    /// `TODO_LISTS_STORAGE_VERSION` (default: 1)
    pub storage_version: u32,
    /// `TODO_LISTS_DATA_DIR` for file storage (default: `.todo-lists`)
    pub data_dir: PathBuf,
    /// `TODO_LISTS_SYNC_CHANNEL` (default: `todo-lists-sync`)
    pub sync_channel: String,
    /// `TODO_LISTS_SYNC_CAPACITY`, envelopes buffered per subscriber (default: 64)
    pub sync_capacity: usize,
    /// `TODO_LISTS_DEFAULT_THEME` when nothing is persisted (default: dark)
    pub default_theme: Theme,
    /// `TODO_LISTS_SEED_SAMPLE`: start with one empty list (default: false)
    pub seed_sample: bool,
    /// `TODO_LISTS_LOG`, used when `RUST_LOG` is unset (default: `todo_lists=info`)
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_version: 1,
            data_dir: PathBuf::from(".todo-lists"),
            sync_channel: "todo-lists-sync".to_string(),
            sync_capacity: 64,
            default_theme: Theme::default(),
            seed_sample: false,
            log_filter: "todo_lists=info".to_string(),
        }
    }
}

fn parse<T, E>(key: &str, value: String) -> Result<T, ConfigError>
where
    T: FromStr<Err = E>,
    E: std::fmt::Display,
{
    value.parse().map_err(|error: E| ConfigError {
        key: key.to_string(),
        value,
        reason: error.to_string(),
    })
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any variable source
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            mode: lookup("TODO_LISTS_MODE")
                .map(|value| parse("TODO_LISTS_MODE", value))
                .transpose()?
                .unwrap_or(defaults.mode),
            storage_key: lookup("TODO_LISTS_STORAGE_KEY").unwrap_or(defaults.storage_key),
            storage_version: lookup("TODO_LISTS_STORAGE_VERSION")
                .map(|value| parse("TODO_LISTS_STORAGE_VERSION", value))
                .transpose()?
                .unwrap_or(defaults.storage_version),
            data_dir: lookup("TODO_LISTS_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            sync_channel: lookup("TODO_LISTS_SYNC_CHANNEL").unwrap_or(defaults.sync_channel),
            sync_capacity: lookup("TODO_LISTS_SYNC_CAPACITY")
                .map(|value| parse("TODO_LISTS_SYNC_CAPACITY", value))
                .transpose()?
                .unwrap_or(defaults.sync_capacity),
            default_theme: lookup("TODO_LISTS_DEFAULT_THEME")
                .map(|value| parse("TODO_LISTS_DEFAULT_THEME", value))
                .transpose()?
                .unwrap_or(defaults.default_theme),
            seed_sample: lookup("TODO_LISTS_SEED_SAMPLE")
                .map(|value| parse("TODO_LISTS_SEED_SAMPLE", value))
                .transpose()?
                .unwrap_or(defaults.seed_sample),
            log_filter: lookup("TODO_LISTS_LOG").unwrap_or(defaults.log_filter),
        };

        if config.sync_capacity == 0 {
            return Err(ConfigError {
                key: "TODO_LISTS_SYNC_CAPACITY".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(config)
    }

    /// State to start from when nothing usable is persisted
    #[must_use]
    pub fn default_state(&self) -> AppState {
        if self.seed_sample {
            AppState::with_sample_list(self.default_theme)
        } else {
            AppState::new(self.default_theme)
        }
    }

    /// Returns true in development mode
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage_key, "basic-todolist-app-test");
        assert_eq!(config.storage_version, 1);
        assert_eq!(config.sync_capacity, 64);
        assert_eq!(config.default_theme, Theme::Dark);
        assert!(!config.is_development());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TODO_LISTS_MODE", "development"),
            ("TODO_LISTS_STORAGE_KEY", "my-lists"),
            ("TODO_LISTS_STORAGE_VERSION", "3"),
            ("TODO_LISTS_DATA_DIR", "/tmp/lists"),
            ("TODO_LISTS_SYNC_CHANNEL", "tabs"),
            ("TODO_LISTS_SYNC_CAPACITY", "8"),
            ("TODO_LISTS_DEFAULT_THEME", "light"),
            ("TODO_LISTS_SEED_SAMPLE", "true"),
            ("TODO_LISTS_LOG", "debug"),
        ]))
        .unwrap();

        assert!(config.is_development());
        assert_eq!(config.storage_key, "my-lists");
        assert_eq!(config.storage_version, 3);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/lists"));
        assert_eq!(config.sync_channel, "tabs");
        assert_eq!(config.sync_capacity, 8);
        assert_eq!(config.default_theme, Theme::Light);
        assert!(config.seed_sample);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn invalid_values_are_errors() {
        let error = AppConfig::from_lookup(lookup(&[("TODO_LISTS_STORAGE_VERSION", "one")]))
            .unwrap_err();
        assert_eq!(error.key, "TODO_LISTS_STORAGE_VERSION");
        assert_eq!(error.value, "one");

        let error =
            AppConfig::from_lookup(lookup(&[("TODO_LISTS_DEFAULT_THEME", "blue")])).unwrap_err();
        assert_eq!(error.key, "TODO_LISTS_DEFAULT_THEME");

        let error = AppConfig::from_lookup(lookup(&[("TODO_LISTS_MODE", "staging")])).unwrap_err();
        assert_eq!(error.key, "TODO_LISTS_MODE");

        let error =
            AppConfig::from_lookup(lookup(&[("TODO_LISTS_SYNC_CAPACITY", "0")])).unwrap_err();
        assert_eq!(error.reason, "must be at least 1");
    }

    #[test]
    fn default_state_follows_configuration() {
        let empty = AppConfig::default().default_state();
        assert_eq!(empty, AppState::default());

        let seeded = AppConfig {
            seed_sample: true,
            default_theme: Theme::Light,
            ..AppConfig::default()
        }
        .default_state();
        assert_eq!(seeded.theme, Theme::Light);
        assert_eq!(seeded.todo_lists[0].name, "TODO List #1");
    }
}
