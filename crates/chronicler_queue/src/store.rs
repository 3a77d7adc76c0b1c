//! Queue persistence backends.

use async_trait::async_trait;
use chronicler_core::QueueSnapshot;
use chronicler_error::{StorageError, StorageErrorKind};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Durable home for the queue snapshot.
///
/// The scheduler saves after every state transition and loads once when the
/// queue is opened.
#[async_trait]
pub trait QueueStore: Send + Sync + std::fmt::Debug {
    /// Load the last saved snapshot, or `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<QueueSnapshot>, StorageError>;

    /// Replace the saved snapshot.
    async fn save(&self, snapshot: &QueueSnapshot) -> Result<(), StorageError>;
}

/// Store that keeps the snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    snapshot: Mutex<Option<QueueSnapshot>>,
}

impl MemoryQueueStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: QueueSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    /// Copy of the last saved snapshot.
    pub fn saved(&self) -> Option<QueueSnapshot> {
        self.snapshot.lock().clone()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self) -> Result<Option<QueueSnapshot>, StorageError> {
        Ok(self.saved())
    }

    async fn save(&self, snapshot: &QueueSnapshot) -> Result<(), StorageError> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }
}

/// Store that writes the snapshot as pretty-printed JSON.
///
/// Writes go to a sibling temporary file that is renamed over the target, so
/// readers never observe a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileQueueStore {
    path: PathBuf,
}

impl JsonFileQueueStore {
    /// Store backed by the file at `path`. Parent directories are created on
    /// first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "queue.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl QueueStore for JsonFileQueueStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<QueueSnapshot>, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No queue file yet");
                return Ok(None);
            }
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                ))));
            }
        };

        let snapshot: QueueSnapshot = serde_json::from_str(&contents).map_err(|e| {
            StorageError::new(StorageErrorKind::Corrupt(format!(
                "{}: {}",
                self.path.display(),
                e
            )))
        })?;

        debug!(operations = snapshot.operations.len(), "Loaded queue");
        Ok(Some(snapshot))
    }

    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    async fn save(&self, snapshot: &QueueSnapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let contents = serde_json::to_string_pretty(snapshot).map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "Failed to serialize queue: {}",
                e
            )))
        })?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, contents).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                self.path.display(),
                e
            )))
        })?;

        debug!(operations = snapshot.operations.len(), "Saved queue");
        Ok(())
    }
}
