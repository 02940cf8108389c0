//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Watcher configuration
//! └── jobs_data.json        # Seen fingerprints per source
//! ```
//!
//! Writes go to a temporary sibling first and are renamed into place, so an
//! interrupted save leaves the previous state intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::DedupState;
use crate::storage::{LoadStatus, LoadedState, StateStore};

const DEFAULT_STATE_FILE: &str = "jobs_data.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    state_key: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_state_file(root_dir, DEFAULT_STATE_FILE)
    }

    /// Create a LocalStorage with a custom state file name.
    pub fn with_state_file(root_dir: impl Into<PathBuf>, state_file: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            state_key: state_file.into(),
        }
    }

    /// Full path of the state file.
    pub fn state_path(&self) -> PathBuf {
        self.path(&self.state_key)
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StateStore for LocalStorage {
    async fn load_with_status(&self) -> LoadedState {
        match self.read_json::<DedupState>(&self.state_key).await {
            Ok(Some(state)) => {
                log::debug!(
                    "Loaded {} fingerprints for {} sources from {}",
                    state.total(),
                    state.source_count(),
                    self.state_path().display()
                );
                LoadedState {
                    state,
                    status: LoadStatus::Loaded,
                }
            }
            Ok(None) => {
                log::info!(
                    "No state file at {}; starting empty",
                    self.state_path().display()
                );
                LoadedState {
                    state: DedupState::new(),
                    status: LoadStatus::Missing,
                }
            }
            Err(e) => {
                log::error!(
                    "Failed to load state from {}: {}. Starting empty",
                    self.state_path().display(),
                    e
                );
                LoadedState {
                    state: DedupState::new(),
                    status: LoadStatus::Corrupt,
                }
            }
        }
    }

    async fn save(&self, state: &DedupState) -> Result<()> {
        self.write_json(&self.state_key, state).await?;
        log::debug!(
            "Saved {} fingerprints to {}",
            state.total(),
            self.state_path().display()
        );
        Ok(())
    }
}
