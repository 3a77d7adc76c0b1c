use chrono::Utc;
use chronicler_core::{
    EnqueueOptions, LoreBook, LoreEntry, Operation, OperationKind, OperationStatus, QueueSnapshot,
    QueueStats, RecapRecord, INTERNAL_ENTRY_PREFIXES,
};
use serde_json::json;

fn op(kind: OperationKind, sequence: u64) -> Operation {
    Operation::new(kind, json!({}), EnqueueOptions::default(), sequence, Utc::now())
}

#[test]
fn test_stats_total_is_sum_of_statuses() {
    let mut ops = vec![
        op(OperationKind::DetectSceneBreak, 0),
        op(OperationKind::GenerateSceneRecap, 1),
        op(OperationKind::Chat, 2),
        op(OperationKind::MergeLorebookEntry, 3),
    ];
    ops[1].mark_in_progress(Utc::now());
    ops[2].mark_completed();
    ops[3].mark_failed("boom");

    let stats = QueueStats::from_operations(&ops, false);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(
        stats.total,
        stats.pending + stats.in_progress + stats.completed + stats.failed
    );
}

#[test]
fn test_priority_is_stored_exactly() {
    for priority in [0, -5, 20, i64::MAX, i64::MIN] {
        let op = Operation::new(
            OperationKind::Chat,
            json!(null),
            EnqueueOptions::default().with_priority(priority),
            0,
            Utc::now(),
        );
        assert_eq!(*op.priority(), priority);
    }
}

#[test]
fn test_recover_resets_stale_in_progress() {
    let mut running = op(OperationKind::ParseSceneRecap, 7);
    running.mark_in_progress(Utc::now());
    let id = running.id().clone();

    let mut snapshot = QueueSnapshot {
        operations: vec![op(OperationKind::Chat, 3), running],
        current_operation_id: Some(id),
        ..QueueSnapshot::default()
    };

    assert_eq!(snapshot.recover(), 1);
    assert!(snapshot
        .operations
        .iter()
        .all(|op| *op.status() == OperationStatus::Pending));
    assert!(snapshot.current_operation_id.is_none());
    assert_eq!(snapshot.next_sequence, 8);
}

#[test]
fn test_snapshot_json_uses_persisted_names() {
    let mut operation = op(OperationKind::CompactLorebookEntry, 0);
    operation.toggle_pause_before();
    let snapshot = QueueSnapshot {
        operations: vec![operation],
        paused: true,
        generation: 4,
        ..QueueSnapshot::default()
    };

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["version"], json!(1));
    assert_eq!(value["queue_version"], json!(4));
    assert_eq!(
        value["queue"][0]["type"],
        json!("auto_lorebooks_recap_lorebook_entry_compaction")
    );
    assert_eq!(value["queue"][0]["pause_before_execution"], json!(true));

    let back: QueueSnapshot = serde_json::from_value(value).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn test_recap_record_accepts_legacy_field_names() {
    let record: RecapRecord = serde_json::from_value(json!({
        "scene_name": "Harbor",
        "recap": "They sail.",
        "entries": [
            {"comment": "Mira", "content": "Captain", "keywords": ["mira", "Mira", "mira", " "], "uid": 12},
            {"type": "location", "name": "Harbor", "uid": "abc"}
        ]
    }))
    .unwrap();

    let entries = record.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name(), "Mira");
    assert_eq!(entries[0].entry_type(), "character");
    assert_eq!(entries[0].keywords(), &vec!["mira".to_string(), "Mira".to_string()]);
    assert_eq!(entries[0].uid().as_deref(), Some("12"));
    assert_eq!(entries[1].entry_type(), "location");
    assert_eq!(entries[1].uid().as_deref(), Some("abc"));

    let value = serde_json::to_value(&record).unwrap();
    assert!(value.get("setting_lore").is_some());
}

#[test]
fn test_lorebook_create_entry_allocates_uids() {
    let mut book = LoreBook::default();
    assert_eq!(book.create_entry().uid, 0);
    book.create_entry().comment = "second".to_string();
    assert_eq!(book.len(), 2);
    assert_eq!(book.find_by_comment("second").map(|e| e.uid), Some(1));
}

#[test]
fn test_copy_attributes_keeps_uid_and_skips_extra() {
    let mut source = LoreEntry::new(9);
    source.comment = "Mira".into();
    source.key = vec!["mira".into()];
    source.order = Some(100);
    source.constant = Some(true);
    source.tags = Some(vec!["crew".into()]);
    source.extra.insert("displayIndex".into(), json!(3));

    let mut target = LoreEntry::new(0);
    target.depth = Some(4);
    target.copy_attributes_from(&source);

    assert_eq!(target.uid, 0);
    assert_eq!(target.comment, "Mira");
    assert_eq!(target.order, Some(100));
    assert_eq!(target.depth, Some(4));
    assert_eq!(target.constant, Some(true));
    assert_eq!(target.tags, Some(vec!["crew".to_string()]));
    assert!(target.extra.is_empty());
}

#[test]
fn test_internal_prefix_detection() {
    let mut entry = LoreEntry::new(0);
    entry.comment = "__operation_queue".into();
    assert!(entry.is_internal(INTERNAL_ENTRY_PREFIXES));
    entry.comment = "registry notes".into();
    assert!(!entry.is_internal(INTERNAL_ENTRY_PREFIXES));
}
