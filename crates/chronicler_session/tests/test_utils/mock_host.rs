//! In-memory host for transaction tests.

use async_trait::async_trait;
use chronicler_core::{LoreBook, SessionMetadata};
use chronicler_error::{SessionError, SessionErrorKind};
use chronicler_session::{LoreStore, MessageRef, SessionHost, SharedSessionMetadata};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// What the host checkpoint/branch primitive does when called.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum DelegateBehavior {
    /// Return this identifier
    Return(Option<String>),
    /// Fail with this message
    Fail(String),
    /// Never answer
    Hang,
    /// Switch to another chat, then return the identifier
    SwitchChat { to: String, id: String },
    /// Signal `entered`, wait for `release`, then return the identifier
    Gate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        id: String,
    },
}

/// Host with one open chat and a map of named stores.
#[allow(dead_code)]
pub struct MockHost {
    chat_id: Mutex<Option<String>>,
    group: Option<String>,
    stores: Mutex<HashMap<String, LoreBook>>,
    behavior: DelegateBehavior,
    refuse_create: bool,
    fail_persist: bool,
    fail_open: bool,
    watched: Option<SharedSessionMetadata>,
    seen_at_delegate: Mutex<Option<SessionMetadata>>,
    persisted: Mutex<Vec<SessionMetadata>>,
    opened: Mutex<Vec<(Option<String>, String)>>,
    delegate_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockHost {
    /// Host with chat `chat` open whose delegate returns `id`.
    pub fn new(chat: &str, id: &str) -> Self {
        Self {
            chat_id: Mutex::new(Some(chat.to_string())),
            group: None,
            stores: Mutex::new(HashMap::new()),
            behavior: DelegateBehavior::Return(Some(id.to_string())),
            refuse_create: false,
            fail_persist: false,
            fail_open: false,
            watched: None,
            seen_at_delegate: Mutex::new(None),
            persisted: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            delegate_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_behavior(mut self, behavior: DelegateBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_store(self, name: &str, book: LoreBook) -> Self {
        self.stores.lock().unwrap().insert(name.to_string(), book);
        self
    }

    pub fn refusing_create(mut self) -> Self {
        self.refuse_create = true;
        self
    }

    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Record the metadata visible while the delegate runs.
    pub fn watching(mut self, metadata: &SharedSessionMetadata) -> Self {
        self.watched = Some(metadata.clone());
        self
    }

    pub fn seen_at_delegate(&self) -> Option<SessionMetadata> {
        self.seen_at_delegate.lock().unwrap().clone()
    }

    pub fn persisted(&self) -> Vec<SessionMetadata> {
        self.persisted.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<(Option<String>, String)> {
        self.opened.lock().unwrap().clone()
    }

    pub fn delegate_calls(&self) -> usize {
        self.delegate_calls.load(Ordering::SeqCst)
    }

    pub fn store(&self, name: &str) -> Option<LoreBook> {
        self.stores.lock().unwrap().get(name).cloned()
    }

    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    async fn delegate(&self) -> Result<Option<String>, SessionError> {
        self.delegate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(metadata) = &self.watched {
            *self.seen_at_delegate.lock().unwrap() = Some(metadata.read());
        }
        match &self.behavior {
            DelegateBehavior::Return(id) => Ok(id.clone()),
            DelegateBehavior::Fail(message) => {
                Err(SessionError::new(SessionErrorKind::Host(message.clone())))
            }
            DelegateBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(None)
            }
            DelegateBehavior::SwitchChat { to, id } => {
                *self.chat_id.lock().unwrap() = Some(to.clone());
                Ok(Some(id.clone()))
            }
            DelegateBehavior::Gate {
                entered,
                release,
                id,
            } => {
                entered.notify_one();
                release.notified().await;
                Ok(Some(id.clone()))
            }
        }
    }
}

#[async_trait]
impl SessionHost for MockHost {
    fn current_chat_id(&self) -> Option<String> {
        self.chat_id.lock().unwrap().clone()
    }

    fn selected_group(&self) -> Option<String> {
        self.group.clone()
    }

    async fn create_checkpoint_bookmark(
        &self,
        _name: &str,
        _message_ref: MessageRef,
    ) -> Result<Option<String>, SessionError> {
        self.delegate().await
    }

    async fn create_branch(
        &self,
        _message_ref: MessageRef,
    ) -> Result<Option<String>, SessionError> {
        self.delegate().await
    }

    async fn persist_session_metadata(
        &self,
        metadata: &SessionMetadata,
    ) -> Result<(), SessionError> {
        if self.fail_persist {
            return Err(SessionError::new(SessionErrorKind::Host(
                "disk full".to_string(),
            )));
        }
        self.persisted.lock().unwrap().push(metadata.clone());
        Ok(())
    }

    async fn open_character_chat(&self, branch_ref: &str) -> Result<(), SessionError> {
        self.open(None, branch_ref)
    }

    async fn open_group_chat(&self, group: &str, branch_ref: &str) -> Result<(), SessionError> {
        self.open(Some(group.to_string()), branch_ref)
    }
}

impl MockHost {
    fn open(&self, group: Option<String>, branch_ref: &str) -> Result<(), SessionError> {
        if self.fail_open {
            return Err(SessionError::new(SessionErrorKind::Host(
                "chat not found".to_string(),
            )));
        }
        self.opened
            .lock()
            .unwrap()
            .push((group, branch_ref.to_string()));
        Ok(())
    }
}

#[async_trait]
impl LoreStore for MockHost {
    async fn load_store(&self, name: &str) -> Result<Option<LoreBook>, SessionError> {
        Ok(self.stores.lock().unwrap().get(name).cloned())
    }

    async fn create_store(&self, name: &str) -> Result<bool, SessionError> {
        if self.refuse_create {
            return Ok(false);
        }
        self.stores
            .lock()
            .unwrap()
            .insert(name.to_string(), LoreBook::default());
        Ok(true)
    }

    async fn save_store(
        &self,
        name: &str,
        book: &LoreBook,
        _immediate: bool,
    ) -> Result<(), SessionError> {
        self.stores
            .lock()
            .unwrap()
            .insert(name.to_string(), book.clone());
        Ok(())
    }
}
