//! Host collaborators the transaction guard drives.
//!
//! The host application owns chats, bookmarks and knowledge stores. The guard
//! only sees them through these traits.

use async_trait::async_trait;
use chronicler_core::{LoreBook, LoreEntry, SessionMetadata};
use chronicler_error::SessionError;

/// Index of the chat message a checkpoint or branch is anchored to.
pub type MessageRef = u64;

/// Named knowledge-store persistence.
#[async_trait]
pub trait LoreStore: Send + Sync {
    /// Load a store by name. `Ok(None)` if it does not exist.
    async fn load_store(&self, name: &str) -> Result<Option<LoreBook>, SessionError>;

    /// Create an empty store. Returns `false` if the host refused.
    async fn create_store(&self, name: &str) -> Result<bool, SessionError>;

    /// Write a store. `immediate` skips any debounce the host applies.
    async fn save_store(
        &self,
        name: &str,
        book: &LoreBook,
        immediate: bool,
    ) -> Result<(), SessionError>;

    /// Allocate a new entry in `book`. `None` if the host could not.
    fn create_entry<'a>(&self, _name: &str, book: &'a mut LoreBook) -> Option<&'a mut LoreEntry> {
        Some(book.create_entry())
    }
}

/// Chat-level primitives of the host application.
#[async_trait]
pub trait SessionHost: Send + Sync {
    /// Identifier of the chat currently open, if any.
    fn current_chat_id(&self) -> Option<String>;

    /// Group the open chat belongs to, if it is a group chat.
    fn selected_group(&self) -> Option<String>;

    /// Create a named checkpoint at `message_ref`. Returns the checkpoint
    /// identifier, or `None` if the host created nothing.
    async fn create_checkpoint_bookmark(
        &self,
        name: &str,
        message_ref: MessageRef,
    ) -> Result<Option<String>, SessionError>;

    /// Create a branch at `message_ref`. Returns the branch reference, or
    /// `None` if the host created nothing.
    async fn create_branch(&self, message_ref: MessageRef)
    -> Result<Option<String>, SessionError>;

    /// Save the metadata of the open chat.
    async fn persist_session_metadata(&self, metadata: &SessionMetadata)
    -> Result<(), SessionError>;

    /// Navigate to a branch of a single-character chat.
    async fn open_character_chat(&self, branch_ref: &str) -> Result<(), SessionError>;

    /// Navigate to a branch of a group chat.
    async fn open_group_chat(&self, group: &str, branch_ref: &str) -> Result<(), SessionError>;
}
