mod test_utils;

use chronicler_core::{LoreBook, SessionMetadata};
use chronicler_error::SessionErrorKind;
use chronicler_session::{
    CheckpointManager, SessionConfig, SharedSessionMetadata, SingleFlight, clone_store,
};
use serde_json::json;
use std::sync::Arc;
use test_utils::{DelegateBehavior, MockHost};
use tokio::sync::Notify;

fn lorebook() -> LoreBook {
    let mut book = LoreBook::default();
    let mira = book.create_entry();
    mira.comment = "Mira".into();
    mira.content = "A dockhand who hides a map.".into();
    mira.key = vec!["mira".into()];
    mira.order = Some(100);
    book.create_entry().comment = "_registry_character".into();
    book.create_entry().comment = "__operation_queue".into();
    book
}

fn attached() -> SharedSessionMetadata {
    let mut metadata = SessionMetadata::with_store("Lore");
    metadata.extra.insert("note".into(), json!("kept"));
    SharedSessionMetadata::new(metadata)
}

fn manager_with(
    host: &Arc<MockHost>,
    metadata: &SharedSessionMetadata,
    config: SessionConfig,
) -> CheckpointManager {
    CheckpointManager::with_lock(
        host.clone(),
        host.clone(),
        metadata.clone(),
        config,
        Arc::new(SingleFlight::new()),
    )
}

fn manager(host: &Arc<MockHost>, metadata: &SharedSessionMetadata) -> CheckpointManager {
    manager_with(host, metadata, SessionConfig::default())
}

fn assert_restored(metadata: &SharedSessionMetadata) {
    let current = metadata.read();
    assert_eq!(current.knowledge_store_ref.as_deref(), Some("Lore"));
    assert!(current.checkpoint_state.is_none());
    assert_eq!(current.extra.get("note"), Some(&json!("kept")));
}

#[tokio::test]
async fn test_empty_name_fails_without_touching_host() {
    let metadata = attached();
    let host = Arc::new(MockHost::new("chat-1", "cp").with_store("Lore", lorebook()));
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(3, "   ").await;
    assert!(!result.success());
    assert_eq!(result.error(), &Some(SessionErrorKind::MissingName));
    assert!(!result.blocked());
    assert_eq!(host.delegate_calls(), 0);
    assert_eq!(host.store_names(), vec!["Lore".to_string()]);
    assert!(!manager.is_busy());
}

#[tokio::test]
async fn test_checkpoint_clones_store_without_internal_entries() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "Before the storm")
            .with_store("Lore", lorebook())
            .watching(&metadata),
    );
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(3, "Before the storm").await;
    assert!(*result.success(), "{:?}", result.error_message());
    assert_eq!(result.checkpoint_name().as_deref(), Some("Before the storm"));
    assert!(*result.store_cloned());

    let names = host.store_names();
    assert_eq!(names.len(), 2);
    let clone_name = names
        .iter()
        .find(|name| name.starts_with("Lore_checkpoint_"))
        .unwrap();
    let clone = host.store(clone_name).unwrap();
    assert_eq!(clone.len(), 1);
    let copied = clone.find_by_comment("Mira").unwrap();
    assert_eq!(copied.content, "A dockhand who hides a map.");
    assert_eq!(copied.order, Some(100));

    let staged = host.seen_at_delegate().unwrap();
    assert_eq!(staged.knowledge_store_ref.as_deref(), Some(clone_name.as_str()));
    let state = staged.checkpoint_state.unwrap();
    assert!(*state.store_was_cloned());
    assert_eq!(state.original_store_ref().as_deref(), Some("Lore"));
    assert!(!*state.is_branch());
    assert_eq!(staged.extra.get("note"), Some(&json!("kept")));
}

#[tokio::test]
async fn test_metadata_restored_and_persisted_after_success() {
    let metadata = attached();
    let host = Arc::new(MockHost::new("chat-1", "cp").with_store("Lore", lorebook()));
    let manager = manager(&host, &metadata);

    assert!(*manager.create_checkpoint(0, "cp").await.success());
    assert_restored(&metadata);
    let persisted = host.persisted();
    assert_eq!(persisted.last(), Some(&metadata.read()));
    assert!(!manager.is_busy());
}

#[tokio::test]
async fn test_metadata_restored_after_delegate_failure() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "cp")
            .with_store("Lore", lorebook())
            .with_behavior(DelegateBehavior::Fail("bookmark rejected".into())),
    );
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(0, "cp").await;
    assert!(!result.success());
    assert!(matches!(
        result.error(),
        Some(SessionErrorKind::DelegateFailed(message)) if message.contains("bookmark rejected")
    ));
    assert_restored(&metadata);
    assert_eq!(host.persisted().len(), 1);
}

#[tokio::test]
async fn test_missing_identifier_is_a_failure() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "cp")
            .with_store("Lore", lorebook())
            .with_behavior(DelegateBehavior::Return(None)),
    );
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(0, "cp").await;
    assert_eq!(
        result.error(),
        &Some(SessionErrorKind::NoIdentifier("checkpoint".into()))
    );
    assert_restored(&metadata);
}

#[tokio::test]
async fn test_chat_switch_is_drift_and_leaves_staged_metadata() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "cp")
            .with_store("Lore", lorebook())
            .with_behavior(DelegateBehavior::SwitchChat {
                to: "chat-2".into(),
                id: "cp".into(),
            }),
    );
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(0, "cp").await;
    assert!(!result.success());
    assert_eq!(
        result.error(),
        &Some(SessionErrorKind::ContextDrift("checkpoint creation".into()))
    );

    let current = metadata.read();
    assert!(
        current
            .knowledge_store_ref
            .as_deref()
            .is_some_and(|name| name.starts_with("Lore_checkpoint_"))
    );
    assert!(current.checkpoint_state.is_some());
    assert!(host.persisted().is_empty());
    assert!(!manager.is_busy());
}

#[tokio::test]
async fn test_restore_persist_failure_keeps_success() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "cp")
            .with_store("Lore", lorebook())
            .failing_persist(),
    );
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(0, "cp").await;
    assert!(*result.success());
    assert!(result.error().is_none());
    assert_restored(&metadata);
}

#[tokio::test]
async fn test_second_transaction_is_blocked() {
    let metadata = attached();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let host = Arc::new(
        MockHost::new("chat-1", "cp")
            .with_store("Lore", lorebook())
            .with_behavior(DelegateBehavior::Gate {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
                id: "first".into(),
            }),
    );
    let manager = manager(&host, &metadata);

    let running = manager.clone();
    let first = tokio::spawn(async move { running.create_checkpoint(0, "first").await });
    entered.notified().await;
    assert!(manager.is_busy());

    let staged = metadata.read();
    let blocked = manager.create_branch(1).await;
    assert!(!blocked.success());
    assert!(blocked.blocked());
    assert_eq!(metadata.read(), staged);
    let blocked = manager.create_checkpoint(1, "second").await;
    assert!(blocked.blocked());
    assert_eq!(metadata.read(), staged);
    assert_eq!(host.delegate_calls(), 1);
    assert_eq!(host.store_names().len(), 2);
    assert!(host.persisted().is_empty());

    release.notify_one();
    let first = first.await.unwrap();
    assert!(*first.success());
    assert!(!manager.is_busy());
    assert_restored(&metadata);
}

#[tokio::test]
async fn test_branch_opens_character_chat() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "Branch #3")
            .with_store("Lore", lorebook())
            .watching(&metadata),
    );
    let manager = manager(&host, &metadata);

    let result = manager.create_branch(3).await;
    assert!(*result.success());
    assert_eq!(result.branch_ref().as_deref(), Some("Branch #3"));
    assert!(*result.store_cloned());
    assert_eq!(host.opened(), vec![(None, "Branch #3".to_string())]);

    let staged = host.seen_at_delegate().unwrap();
    assert!(
        staged
            .knowledge_store_ref
            .as_deref()
            .is_some_and(|name| name.starts_with("Lore_branch_"))
    );
    assert!(*staged.checkpoint_state.unwrap().is_branch());
    assert_restored(&metadata);
}

#[tokio::test]
async fn test_branch_opens_group_chat() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "Branch #3")
            .with_store("Lore", lorebook())
            .with_group("crew"),
    );
    let manager = manager(&host, &metadata);

    assert!(*manager.create_branch(3).await.success());
    assert_eq!(
        host.opened(),
        vec![(Some("crew".to_string()), "Branch #3".to_string())]
    );
}

#[tokio::test]
async fn test_branch_open_failure_reported_after_release() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "Branch #3")
            .with_store("Lore", lorebook())
            .failing_open(),
    );
    let manager = manager(&host, &metadata);

    let result = manager.create_branch(3).await;
    assert!(!result.success());
    assert!(matches!(
        result.error(),
        Some(SessionErrorKind::BranchNotOpened(message)) if message.contains("chat not found")
    ));
    assert!(!manager.is_busy());
    assert_restored(&metadata);
}

#[tokio::test]
async fn test_delegate_timeout() {
    let metadata = attached();
    let host = Arc::new(
        MockHost::new("chat-1", "cp")
            .with_store("Lore", lorebook())
            .with_behavior(DelegateBehavior::Hang),
    );
    let manager = manager_with(
        &host,
        &metadata,
        SessionConfig::default().with_delegate_timeout_secs(1),
    );

    let result = manager.create_checkpoint(0, "cp").await;
    assert_eq!(result.error(), &Some(SessionErrorKind::DelegateTimeout(1)));
    assert!(!manager.is_busy());
    assert_restored(&metadata);
}

#[tokio::test]
async fn test_no_attached_store_skips_clone() {
    let metadata = SharedSessionMetadata::default();
    let host = Arc::new(MockHost::new("chat-1", "cp").watching(&metadata));
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(0, "cp").await;
    assert!(*result.success());
    assert!(!*result.store_cloned());
    assert!(host.store_names().is_empty());

    let staged = host.seen_at_delegate().unwrap();
    assert!(staged.knowledge_store_ref.is_none());
    let state = staged.checkpoint_state.unwrap();
    assert!(!*state.store_was_cloned());
    assert!(state.original_store_ref().is_none());
    assert!(metadata.read().checkpoint_state.is_none());
}

#[tokio::test]
async fn test_clone_failure_aborts_before_delegate() {
    let metadata = attached();
    let host = Arc::new(MockHost::new("chat-1", "cp"));
    let manager = manager(&host, &metadata);

    let result = manager.create_checkpoint(0, "cp").await;
    assert!(matches!(
        result.error(),
        Some(SessionErrorKind::CloneFailed(message)) if message.contains("not found")
    ));
    assert_eq!(host.delegate_calls(), 0);
    assert!(!manager.is_busy());
    assert_restored(&metadata);
}

#[tokio::test]
async fn test_clone_store_reports_refused_creation() {
    let host = MockHost::new("chat-1", "cp")
        .with_store("Lore", lorebook())
        .refusing_create();

    let none = clone_store(&host, None, "Lore_copy", &["_registry_"]).await;
    assert!(none.unwrap().is_none());

    let err = clone_store(&host, Some("Lore"), "Lore_copy", &["_registry_"])
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SessionErrorKind::CloneFailed(_)));
}

#[tokio::test]
async fn test_clone_store_honours_custom_prefixes() {
    let host = MockHost::new("chat-1", "cp").with_store("Lore", lorebook());

    let name = clone_store(&host, Some("Lore"), "Lore_copy", &["_registry_"])
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some("Lore_copy"));
    let copy = host.store("Lore_copy").unwrap();
    assert_eq!(copy.len(), 2);
    assert!(copy.find_by_comment("__operation_queue").is_some());
}

#[test]
fn test_default_managers_share_global_lock() {
    let first = SingleFlight::global();
    let second = SingleFlight::global();
    assert!(Arc::ptr_eq(&first, &second));
}
