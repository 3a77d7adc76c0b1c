//! Shared handle to the session metadata the guard stages and restores.

use chronicler_core::{CheckpointState, SessionMetadata};
use parking_lot::RwLock;
use std::sync::Arc;

/// The two metadata keys a transaction may overwrite, as they were before it.
#[derive(Debug, Clone, PartialEq, Eq, Default, derive_getters::Getters)]
pub struct MetadataSnapshot {
    /// Knowledge store attached before the transaction
    knowledge_store_ref: Option<String>,
    /// Checkpoint marker before the transaction; `None` means the key was absent
    checkpoint_state: Option<CheckpointState>,
}

/// Session metadata shared between the transaction guard, pipeline handlers
/// and the host.
///
/// Clones share the same metadata.
#[derive(Debug, Clone, Default)]
pub struct SharedSessionMetadata {
    inner: Arc<RwLock<SessionMetadata>>,
}

impl SharedSessionMetadata {
    /// Handle holding `metadata`.
    pub fn new(metadata: SessionMetadata) -> Self {
        Self {
            inner: Arc::new(RwLock::new(metadata)),
        }
    }

    /// Copy of the current metadata.
    pub fn read(&self) -> SessionMetadata {
        self.inner.read().clone()
    }

    /// Replace the metadata, e.g. when the host switches chats.
    pub fn replace(&self, metadata: SessionMetadata) {
        *self.inner.write() = metadata;
    }

    /// Mutate the metadata in place.
    pub fn update<T>(&self, f: impl FnOnce(&mut SessionMetadata) -> T) -> T {
        f(&mut self.inner.write())
    }

    /// Name of the attached knowledge store.
    pub fn knowledge_store_ref(&self) -> Option<String> {
        self.inner.read().knowledge_store_ref.clone()
    }

    /// Record the keys a transaction is about to overwrite.
    pub fn snapshot(&self) -> MetadataSnapshot {
        let metadata = self.inner.read();
        MetadataSnapshot {
            knowledge_store_ref: metadata.knowledge_store_ref.clone(),
            checkpoint_state: metadata.checkpoint_state.clone(),
        }
    }

    /// Write the values a checkpoint or branch should inherit.
    pub fn stage(&self, knowledge_store_ref: Option<String>, state: CheckpointState) {
        let mut metadata = self.inner.write();
        metadata.knowledge_store_ref = knowledge_store_ref;
        metadata.checkpoint_state = Some(state);
    }

    /// Put the snapshotted keys back. Other keys are left alone.
    pub fn restore(&self, snapshot: &MetadataSnapshot) {
        let mut metadata = self.inner.write();
        metadata.knowledge_store_ref = snapshot.knowledge_store_ref.clone();
        metadata.checkpoint_state = snapshot.checkpoint_state.clone();
    }
}

impl From<SessionMetadata> for SharedSessionMetadata {
    fn from(metadata: SessionMetadata) -> Self {
        Self::new(metadata)
    }
}
