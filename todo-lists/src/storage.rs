//! File-backed [`StateStorage`].

use listkeeper_core::storage::{StateStorage, StorageError, StorageFuture};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stores each key as `<dir>/<sanitized key>.json`
///
/// Writes go to a uniquely named temporary file that is then renamed over
/// the target, so readers never observe a partial value.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates storage rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.dir.join(format!("{file}.json"))
    }
}

fn io_error(action: &str, path: &Path, error: &std::io::Error) -> StorageError {
    StorageError::Io(format!("{action} {}: {error}", path.display()))
}

impl StateStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageFuture<'_, Option<String>> {
        let path = self.path_for(key);
        Box::pin(async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => Ok(Some(raw)),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
                Err(error) => Err(io_error("reading", &path, &error)),
            }
        })
    }

    fn set_item(&self, key: &str, value: String) -> StorageFuture<'_, ()> {
        let path = self.path_for(key);
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.dir.display())))?;

            let temp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
            tokio::fs::write(&temp, value)
                .await
                .map_err(|e| io_error("writing", &temp, &e))?;
            tokio::fs::rename(&temp, &path)
                .await
                .map_err(|e| io_error("replacing", &path, &e))?;

            tracing::trace!(path = %path.display(), "Wrote storage file");
            Ok(())
        })
    }

    fn remove_item(&self, key: &str) -> StorageFuture<'_, ()> {
        let path = self.path_for(key);
        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
                Err(error) => Err(io_error("removing", &path, &error)),
            }
        })
    }
}
