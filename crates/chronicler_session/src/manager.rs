//! Checkpoint and branch transactions.
//!
//! A transaction clones the attached knowledge store, stages metadata that
//! points at the clone, asks the host to create the checkpoint or branch,
//! and then puts the original metadata back. The checkpoint or branch keeps
//! the staged values because the host copies metadata at creation time.

use crate::{
    LoreStore, MessageRef, MetadataSnapshot, SessionConfig, SessionHost, SharedSessionMetadata,
    SingleFlight, clone_store,
};
use chrono::Utc;
use chronicler_core::CheckpointState;
use chronicler_error::{SessionError, SessionErrorKind};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of [`CheckpointManager::create_checkpoint`].
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct CheckpointResult {
    /// Whether the checkpoint was created
    success: bool,
    /// Name of the created checkpoint
    checkpoint_name: Option<String>,
    /// Whether the knowledge store was cloned for it
    store_cloned: bool,
    /// Failure reason
    error: Option<SessionErrorKind>,
}

impl CheckpointResult {
    fn created(name: &str, store_cloned: bool) -> Self {
        Self {
            success: true,
            checkpoint_name: Some(name.to_string()),
            store_cloned,
            error: None,
        }
    }

    fn failed(kind: SessionErrorKind) -> Self {
        Self {
            success: false,
            checkpoint_name: None,
            store_cloned: false,
            error: Some(kind),
        }
    }

    /// Whether another transaction held the lock.
    pub fn blocked(&self) -> bool {
        self.error == Some(SessionErrorKind::Blocked)
    }

    /// Failure reason as text.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Outcome of [`CheckpointManager::create_branch`].
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct BranchResult {
    /// Whether the branch was created and opened
    success: bool,
    /// Reference of the created branch
    branch_ref: Option<String>,
    /// Whether the knowledge store was cloned for it
    store_cloned: bool,
    /// Failure reason
    error: Option<SessionErrorKind>,
}

impl BranchResult {
    fn created(branch_ref: String, store_cloned: bool) -> Self {
        Self {
            success: true,
            branch_ref: Some(branch_ref),
            store_cloned,
            error: None,
        }
    }

    fn failed(kind: SessionErrorKind) -> Self {
        Self {
            success: false,
            branch_ref: None,
            store_cloned: false,
            error: Some(kind),
        }
    }

    /// Whether another transaction held the lock.
    pub fn blocked(&self) -> bool {
        self.error == Some(SessionErrorKind::Blocked)
    }

    /// Failure reason as text.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

#[derive(Debug, Clone, Copy)]
enum Transaction<'a> {
    Checkpoint(&'a str),
    Branch,
}

impl Transaction<'_> {
    fn label(&self) -> &'static str {
        match self {
            Self::Checkpoint(_) => "checkpoint",
            Self::Branch => "branch",
        }
    }

    fn is_branch(&self) -> bool {
        matches!(self, Self::Branch)
    }
}

#[derive(Debug)]
struct Staged {
    identifier: String,
    store_cloned: bool,
}

/// Runs checkpoint and branch transactions against a host.
///
/// At most one transaction runs at a time per [`SingleFlight`]. Managers
/// built with [`new`](Self::new) share the process-wide lock.
#[derive(Clone)]
pub struct CheckpointManager {
    host: Arc<dyn SessionHost>,
    store: Arc<dyn LoreStore>,
    metadata: SharedSessionMetadata,
    config: SessionConfig,
    lock: Arc<SingleFlight>,
}

impl std::fmt::Debug for CheckpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointManager")
            .field("config", &self.config)
            .field("locked", &self.lock.is_held())
            .finish_non_exhaustive()
    }
}

impl CheckpointManager {
    /// Manager using the process-wide lock.
    pub fn new(
        host: Arc<dyn SessionHost>,
        store: Arc<dyn LoreStore>,
        metadata: SharedSessionMetadata,
        config: SessionConfig,
    ) -> Self {
        Self::with_lock(host, store, metadata, config, SingleFlight::global())
    }

    /// Manager using `lock`.
    pub fn with_lock(
        host: Arc<dyn SessionHost>,
        store: Arc<dyn LoreStore>,
        metadata: SharedSessionMetadata,
        config: SessionConfig,
        lock: Arc<SingleFlight>,
    ) -> Self {
        Self {
            host,
            store,
            metadata,
            config,
            lock,
        }
    }

    /// Session metadata this manager stages and restores.
    pub fn metadata(&self) -> &SharedSessionMetadata {
        &self.metadata
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether a transaction is running on this manager's lock.
    pub fn is_busy(&self) -> bool {
        self.lock.is_held()
    }

    /// Clone `source` into `target`, leaving internal entries behind.
    pub async fn clone_store(
        &self,
        source: Option<&str>,
        target: &str,
    ) -> Result<Option<String>, SessionError> {
        clone_store(
            self.store.as_ref(),
            source,
            target,
            self.config.internal_prefixes(),
        )
        .await
    }

    /// Create a named checkpoint at `message_ref` with its own store clone.
    #[instrument(skip(self))]
    pub async fn create_checkpoint(&self, message_ref: MessageRef, name: &str) -> CheckpointResult {
        if name.trim().is_empty() {
            return CheckpointResult::failed(SessionErrorKind::MissingName);
        }
        let Some(_guard) = self.lock.try_acquire() else {
            warn!("Checkpoint blocked by another transaction");
            return CheckpointResult::failed(SessionErrorKind::Blocked);
        };

        match self.run(Transaction::Checkpoint(name), message_ref).await {
            Ok(staged) => {
                info!(checkpoint = %staged.identifier, cloned = staged.store_cloned, "Checkpoint created");
                CheckpointResult::created(name, staged.store_cloned)
            }
            Err(e) => {
                error!(error = %e, "Checkpoint creation failed");
                CheckpointResult::failed(e.kind)
            }
        }
    }

    /// Create a branch at `message_ref` with its own store clone, then open it.
    #[instrument(skip(self))]
    pub async fn create_branch(&self, message_ref: MessageRef) -> BranchResult {
        let outcome = {
            let Some(_guard) = self.lock.try_acquire() else {
                warn!("Branch blocked by another transaction");
                return BranchResult::failed(SessionErrorKind::Blocked);
            };
            self.run(Transaction::Branch, message_ref).await
        };

        let staged = match outcome {
            Ok(staged) => staged,
            Err(e) => {
                error!(error = %e, "Branch creation failed");
                return BranchResult::failed(e.kind);
            }
        };

        let opened = match self.host.selected_group() {
            Some(group) => self.host.open_group_chat(&group, &staged.identifier).await,
            None => self.host.open_character_chat(&staged.identifier).await,
        };
        match opened {
            Ok(()) => {
                info!(branch = %staged.identifier, cloned = staged.store_cloned, "Branch created and opened");
                BranchResult::created(staged.identifier, staged.store_cloned)
            }
            Err(e) => {
                error!(branch = %staged.identifier, error = %e, "Failed to open branch");
                BranchResult::failed(SessionErrorKind::BranchNotOpened(e.kind.to_string()))
            }
        }
    }

    async fn run(
        &self,
        transaction: Transaction<'_>,
        message_ref: MessageRef,
    ) -> Result<Staged, SessionError> {
        let start_chat = self.host.current_chat_id();
        let snapshot = self.metadata.snapshot();
        debug!(chat = ?start_chat, store = ?snapshot.knowledge_store_ref(), "Transaction started");

        let result = self
            .stage_and_delegate(transaction, message_ref, start_chat.as_deref(), &snapshot)
            .await;
        self.restore(start_chat.as_deref(), &snapshot).await;
        result
    }

    async fn stage_and_delegate(
        &self,
        transaction: Transaction<'_>,
        message_ref: MessageRef,
        start_chat: Option<&str>,
        snapshot: &MetadataSnapshot,
    ) -> Result<Staged, SessionError> {
        let original = snapshot.knowledge_store_ref().clone();
        let target = original.as_ref().map(|source| {
            format!(
                "{source}_{}_{}",
                transaction.label(),
                Utc::now().timestamp_millis()
            )
        });
        let cloned = match &target {
            Some(target) => self.clone_store(original.as_deref(), target).await?,
            None => None,
        };
        let store_cloned = cloned.is_some();

        self.metadata.stage(
            cloned,
            CheckpointState::new(Utc::now(), store_cloned, original, transaction.is_branch()),
        );

        let timeout = self.config.delegate_timeout();
        let delegated = tokio::time::timeout(timeout, async {
            match transaction {
                Transaction::Checkpoint(name) => {
                    self.host.create_checkpoint_bookmark(name, message_ref).await
                }
                Transaction::Branch => self.host.create_branch(message_ref).await,
            }
        })
        .await;

        if self.host.current_chat_id().as_deref() != start_chat {
            return Err(SessionError::new(SessionErrorKind::ContextDrift(format!(
                "{} creation",
                transaction.label()
            ))));
        }

        let identifier = match delegated {
            Err(_) => {
                return Err(SessionError::new(SessionErrorKind::DelegateTimeout(
                    *self.config.delegate_timeout_secs(),
                )));
            }
            Ok(Err(e)) => {
                return Err(SessionError::new(SessionErrorKind::DelegateFailed(
                    e.kind.to_string(),
                )));
            }
            Ok(Ok(identifier)) => identifier,
        };

        match identifier.filter(|id| !id.is_empty()) {
            Some(identifier) => Ok(Staged {
                identifier,
                store_cloned,
            }),
            None => Err(SessionError::new(SessionErrorKind::NoIdentifier(
                transaction.label().to_string(),
            ))),
        }
    }

    async fn restore(&self, start_chat: Option<&str>, snapshot: &MetadataSnapshot) {
        if self.host.current_chat_id().as_deref() != start_chat {
            error!("Chat context changed, leaving session metadata untouched");
            return;
        }
        self.metadata.restore(snapshot);
        let metadata = self.metadata.read();
        match self.host.persist_session_metadata(&metadata).await {
            Ok(()) => debug!("Session metadata restored"),
            Err(e) => error!(error = %e, "Failed to persist restored session metadata"),
        }
    }
}
