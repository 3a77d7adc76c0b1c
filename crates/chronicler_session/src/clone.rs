//! Knowledge-store cloning for checkpoints and branches.

use crate::LoreStore;
use chronicler_error::{SessionError, SessionErrorKind};
use tracing::{debug, error, info, instrument};

/// Copy every non-internal entry of `source` into a new store named `target`.
///
/// Returns `Ok(None)` when there is no source store, otherwise the name of
/// the new store. Bookkeeping entries whose label starts with one of
/// `internal_prefixes` stay with the source.
#[instrument(skip(store, internal_prefixes))]
pub async fn clone_store<S: AsRef<str>>(
    store: &dyn LoreStore,
    source: Option<&str>,
    target: &str,
    internal_prefixes: &[S],
) -> Result<Option<String>, SessionError> {
    let Some(source) = source.filter(|s| !s.is_empty()) else {
        debug!("No lorebook attached, nothing to clone");
        return Ok(None);
    };

    let source_book = store
        .load_store(source)
        .await
        .map_err(|e| clone_failed(format!("failed to load source lorebook '{source}': {}", e.kind)))?
        .ok_or_else(|| clone_failed(format!("source lorebook '{source}' not found")))?;

    let created = store
        .create_store(target)
        .await
        .map_err(|e| clone_failed(format!("failed to create lorebook '{target}': {}", e.kind)))?;
    if !created {
        return Err(clone_failed(format!("failed to create lorebook '{target}'")));
    }

    let mut target_book = store
        .load_store(target)
        .await
        .map_err(|e| clone_failed(format!("failed to load new lorebook '{target}': {}", e.kind)))?
        .ok_or_else(|| clone_failed(format!("new lorebook '{target}' not found")))?;

    let mut copied = 0usize;
    let mut skipped = 0usize;
    for entry in source_book.entries.values() {
        if entry.is_internal(internal_prefixes) {
            skipped += 1;
            continue;
        }
        match store.create_entry(target, &mut target_book) {
            Some(new_entry) => {
                new_entry.copy_attributes_from(entry);
                copied += 1;
            }
            None => error!(uid = entry.uid, "Failed to create entry in cloned lorebook"),
        }
    }

    store
        .save_store(target, &target_book, true)
        .await
        .map_err(|e| clone_failed(format!("failed to save lorebook '{target}': {}", e.kind)))?;

    info!(copied, skipped, "Cloned lorebook");
    Ok(Some(target.to_string()))
}

#[track_caller]
fn clone_failed(message: String) -> SessionError {
    SessionError::new(SessionErrorKind::CloneFailed(message))
}
