//! The operation scheduler.

use crate::{
    HandlerRegistry, HandlerResult, MemoryQueueStore, OperationHandler, QueueConfig, QueueEvent,
    QueueListener, QueueStore,
};
use chrono::Utc;
use chronicler_core::{
    EnqueueOptions, Operation, OperationId, OperationKind, OperationStatus, QueueSnapshot,
    QueueStats,
};
use chronicler_error::{
    HandlerError, HandlerErrorKind, QueueError, QueueErrorKind, RetryableError, StorageError,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

/// Persistent priority queue of pipeline operations with a single worker.
///
/// Operations run one at a time: the highest-priority ready operation first,
/// ties broken by enqueue order. Handler failures are classified through
/// [`RetryableError`]; transient failures are retried according to the
/// configured [`RetryPolicy`](crate::RetryPolicy), everything else leaves the
/// queue immediately. Every state change is saved to the [`QueueStore`] and
/// reported to listeners.
///
/// The queue is a cheap handle; clones share the same state.
///
/// # Examples
///
/// ```
/// use chronicler_core::{EnqueueOptions, OperationKind};
/// use chronicler_queue::{OperationQueue, QueueConfig, handler_fn};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = OperationQueue::new(QueueConfig::default());
/// queue.register_handler(
///     OperationKind::DetectSceneBreak,
///     handler_fn(|_op| async { Ok(json!({ "break": false })) }),
/// );
///
/// let id = queue
///     .enqueue(OperationKind::DetectSceneBreak, json!({ "index": 4 }), EnqueueOptions::default())
///     .await;
/// queue.wait_until_idle().await;
///
/// assert!(queue.get(&id).is_none());
/// assert_eq!(queue.stats().total, 0);
/// # }
/// ```
#[derive(Clone)]
pub struct OperationQueue {
    shared: Arc<Shared>,
}

struct Shared {
    config: QueueConfig,
    store: Arc<dyn QueueStore>,
    handlers: HandlerRegistry,
    state: Mutex<State>,
    listeners: RwLock<Vec<QueueListener>>,
    save_lock: tokio::sync::Mutex<()>,
    busy: watch::Sender<bool>,
    paused: watch::Sender<bool>,
}

struct State {
    snapshot: QueueSnapshot,
    worker_active: bool,
    abort: Option<oneshot::Sender<()>>,
}

enum Step {
    Idle,
    PausedBefore(OperationId),
    Run(Dispatch),
}

struct Dispatch {
    operation: Operation,
    generation: u64,
    abort: oneshot::Receiver<()>,
}

enum Outcome {
    Succeeded,
    Failed(HandlerError),
    Paused,
    Aborted,
}

impl std::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("stats", &self.stats())
            .field("handlers", &self.shared.handlers)
            .field("store", &self.shared.store)
            .finish()
    }
}

impl OperationQueue {
    /// Empty queue kept in memory.
    pub fn new(config: QueueConfig) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryQueueStore::new()),
            QueueSnapshot::default(),
        )
    }

    /// Load the queue saved in `store`.
    ///
    /// Operations that were running when the snapshot was taken are reset to
    /// `pending`. The worker does not start until [`start`](Self::start) or the
    /// next [`enqueue`](Self::enqueue), so handlers can be registered first.
    #[instrument(skip(config, store))]
    pub async fn open(
        config: QueueConfig,
        store: Arc<dyn QueueStore>,
    ) -> Result<Self, StorageError> {
        let mut snapshot = store.load().await?.unwrap_or_default();
        let reset = snapshot.recover();
        let (operations, paused) = (snapshot.operations.len(), snapshot.paused);

        let queue = Self::from_parts(config, store, snapshot);
        if reset > 0 {
            info!(reset, "Reset interrupted operations to pending");
            queue.shared.persist().await;
        }

        info!(operations, paused, "Opened operation queue");
        Ok(queue)
    }

    fn from_parts(config: QueueConfig, store: Arc<dyn QueueStore>, snapshot: QueueSnapshot) -> Self {
        let paused = snapshot.paused;
        Self {
            shared: Arc::new(Shared {
                config,
                store,
                handlers: HandlerRegistry::new(),
                state: Mutex::new(State {
                    snapshot,
                    worker_active: false,
                    abort: None,
                }),
                listeners: RwLock::new(Vec::new()),
                save_lock: tokio::sync::Mutex::new(()),
                busy: watch::channel(false).0,
                paused: watch::channel(paused).0,
            }),
        }
    }

    /// Scheduler configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Handler dispatch table.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.shared.handlers
    }

    /// Install the handler for `kind`, replacing any previous one.
    pub fn register_handler(&self, kind: OperationKind, handler: impl OperationHandler + 'static) {
        debug!(%kind, "Registered handler");
        self.shared.handlers.register(kind, handler);
    }

    /// Register a listener for queue changes.
    pub fn on_update(&self, listener: impl Fn(&QueueEvent) + Send + Sync + 'static) {
        self.shared.listeners.write().push(Arc::new(listener));
    }

    /// Add an operation and start the worker unless the queue is paused.
    #[instrument(skip(self, payload, options), fields(%kind))]
    pub async fn enqueue(
        &self,
        kind: OperationKind,
        payload: Value,
        options: EnqueueOptions,
    ) -> OperationId {
        let id = {
            let mut state = self.shared.state.lock();
            let sequence = state.snapshot.next_sequence;
            state.snapshot.next_sequence += 1;
            let operation = Operation::new(kind, payload, options, sequence, Utc::now());
            let id = operation.id().clone();
            state.snapshot.operations.push(operation);
            id
        };

        debug!(%id, "Enqueued operation");
        self.shared.persist().await;
        self.shared.emit(&QueueEvent::Enqueued {
            id: id.clone(),
            kind,
        });
        Shared::ensure_worker(&self.shared);
        id
    }

    /// Start the worker if there is work and the queue is not paused.
    pub async fn start(&self) {
        Shared::ensure_worker(&self.shared);
    }

    /// Stop dispatching. The running operation finishes; one that is backing
    /// off returns to `pending`.
    #[instrument(skip(self))]
    pub async fn pause(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.snapshot.paused {
                return;
            }
            state.snapshot.paused = true;
            self.shared.paused.send_replace(true);
        }
        info!("Queue paused");
        self.shared.persist().await;
        self.shared.emit(&QueueEvent::Paused);
    }

    /// Resume dispatching.
    #[instrument(skip(self))]
    pub async fn resume(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.snapshot.paused {
                return;
            }
            state.snapshot.paused = false;
            self.shared.paused.send_replace(false);
        }
        info!("Queue resumed");
        self.shared.persist().await;
        self.shared.emit(&QueueEvent::Resumed);
        Shared::ensure_worker(&self.shared);
    }

    /// Whether dispatch is suspended.
    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().snapshot.paused
    }

    /// Whether a worker task is running.
    pub fn is_worker_active(&self) -> bool {
        self.shared.state.lock().worker_active
    }

    /// Wait until the worker has stopped, either because no operation is
    /// ready or because the queue was paused.
    pub async fn wait_until_idle(&self) {
        let mut busy = self.shared.busy.subscribe();
        let _ = busy.wait_for(|busy| !*busy).await;
    }

    /// Operation counts by status.
    pub fn stats(&self) -> QueueStats {
        self.shared.state.lock().snapshot.stats()
    }

    /// Copy of the operation with `id`.
    pub fn get(&self, id: &OperationId) -> Option<Operation> {
        self.shared
            .state
            .lock()
            .snapshot
            .operations
            .iter()
            .find(|op| op.id() == id)
            .cloned()
    }

    /// Copy of the persisted state.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.shared.state.lock().snapshot.clone()
    }

    /// All operations in enqueue order.
    pub fn operations(&self) -> Vec<Operation> {
        self.shared.state.lock().snapshot.operations.clone()
    }

    /// Operations waiting for dispatch.
    pub fn pending_operations(&self) -> Vec<Operation> {
        self.with_status(OperationStatus::Pending)
    }

    /// Operations running or backing off.
    pub fn in_progress_operations(&self) -> Vec<Operation> {
        self.with_status(OperationStatus::InProgress)
    }

    /// Retained failures. Always empty unless `retain_failed` is set.
    pub fn failed_operations(&self) -> Vec<Operation> {
        self.with_status(OperationStatus::Failed)
    }

    fn with_status(&self, status: OperationStatus) -> Vec<Operation> {
        self.shared
            .state
            .lock()
            .snapshot
            .operations
            .iter()
            .filter(|op| *op.status() == status)
            .cloned()
            .collect()
    }

    /// Remove every operation.
    ///
    /// The running operation is told to abort and whatever it returns is
    /// discarded. Returns the number of operations removed.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> usize {
        let count = {
            let mut state = self.shared.state.lock();
            let count = state.snapshot.clear();
            if let Some(abort) = state.abort.take() {
                let _ = abort.send(());
            }
            count
        };

        info!(count, "Cleared queue");
        self.shared.persist().await;
        self.shared.emit(&QueueEvent::Cleared(count));
        count
    }

    /// Remove completed and retained failed operations.
    #[instrument(skip(self))]
    pub async fn clear_completed(&self) -> usize {
        let count = {
            let mut state = self.shared.state.lock();
            let before = state.snapshot.operations.len();
            state
                .snapshot
                .operations
                .retain(|op| !op.status().is_terminal());
            before - state.snapshot.operations.len()
        };

        if count > 0 {
            debug!(count, "Cleared finished operations");
            self.shared.persist().await;
            self.shared.emit(&QueueEvent::Cleared(count));
        }
        count
    }

    /// Remove a single operation that is not running.
    ///
    /// Other operations stop depending on it.
    #[instrument(skip(self), fields(%id))]
    pub async fn remove(&self, id: &OperationId) -> Result<Operation, QueueError> {
        let removed = {
            let mut state = self.shared.state.lock();
            let operations = &mut state.snapshot.operations;
            let index = operations
                .iter()
                .position(|op| op.id() == id)
                .ok_or_else(|| QueueError::new(QueueErrorKind::NotFound(id.to_string())))?;
            if *operations[index].status() == OperationStatus::InProgress {
                return Err(QueueError::new(QueueErrorKind::InProgress(id.to_string())));
            }
            let removed = operations.remove(index);
            for op in operations.iter_mut() {
                op.remove_dependency(id);
            }
            removed
        };

        debug!("Removed operation");
        self.shared.persist().await;
        self.shared.emit(&QueueEvent::Removed(id.clone()));
        Shared::ensure_worker(&self.shared);
        Ok(removed)
    }

    /// Make every operation waiting on `from` wait on `to` instead.
    ///
    /// Returns the number of operations changed.
    #[instrument(skip(self), fields(%from, %to))]
    pub async fn transfer_dependencies(&self, from: &OperationId, to: &OperationId) -> usize {
        let changed: Vec<OperationId> = {
            let mut state = self.shared.state.lock();
            state
                .snapshot
                .operations
                .iter_mut()
                .filter_map(|op| op.replace_dependency(from, to).then(|| op.id().clone()))
                .collect()
        };

        if !changed.is_empty() {
            debug!(count = changed.len(), "Transferred dependencies");
            self.shared.persist().await;
            for id in &changed {
                self.shared.emit(&QueueEvent::Updated(id.clone()));
            }
        }
        changed.len()
    }

    /// Merge `patch` into the operation's metadata.
    #[instrument(skip(self, patch), fields(%id))]
    pub async fn update_metadata(
        &self,
        id: &OperationId,
        patch: Map<String, Value>,
    ) -> Result<(), QueueError> {
        self.update(id, |op| op.merge_metadata(patch)).await
    }

    /// Flip the operation's pause-before flag, returning the new value.
    #[instrument(skip(self), fields(%id))]
    pub async fn toggle_pause_before(&self, id: &OperationId) -> Result<bool, QueueError> {
        self.update(id, Operation::toggle_pause_before).await
    }

    async fn update<T>(
        &self,
        id: &OperationId,
        f: impl FnOnce(&mut Operation) -> T,
    ) -> Result<T, QueueError> {
        let value = {
            let mut state = self.shared.state.lock();
            let op = state
                .snapshot
                .operations
                .iter_mut()
                .find(|op| op.id() == id)
                .ok_or_else(|| QueueError::new(QueueErrorKind::NotFound(id.to_string())))?;
            f(op)
        };

        self.shared.persist().await;
        self.shared.emit(&QueueEvent::Updated(id.clone()));
        Ok(value)
    }
}

impl Shared {
    fn ensure_worker(shared: &Arc<Shared>) {
        {
            let mut state = shared.state.lock();
            if state.worker_active || state.snapshot.paused {
                return;
            }
            state.worker_active = true;
            shared.busy.send_replace(true);
        }

        let shared = Arc::clone(shared);
        tokio::spawn(async move { shared.run_worker().await });
    }

    async fn run_worker(&self) {
        debug!("Queue worker started");
        loop {
            match self.next_step() {
                Step::Idle => break,
                Step::PausedBefore(id) => {
                    info!(%id, "Paused before operation");
                    self.persist().await;
                    self.emit(&QueueEvent::Paused);
                    break;
                }
                Step::Run(Dispatch {
                    operation,
                    generation,
                    abort,
                }) => {
                    let id = operation.id().clone();
                    let kind = *operation.kind();
                    info!(%id, %kind, priority = operation.priority(), "Dispatching operation");
                    self.persist().await;
                    self.emit(&QueueEvent::Started(id.clone()));

                    let outcome = self.execute(operation, abort).await;
                    self.finish(&id, generation, outcome).await;

                    let interval = self.config.dispatch_interval();
                    if kind.calls_model() && !interval.is_zero() {
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        }
        debug!("Queue worker stopped");
    }

    /// Pick the next operation, or retire the worker when there is none.
    fn next_step(&self) -> Step {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let selected = if state.snapshot.paused {
            None
        } else {
            select_ready(&state.snapshot.operations)
        };

        let Some(index) = selected else {
            state.worker_active = false;
            self.busy.send_replace(false);
            return Step::Idle;
        };

        let operation = &mut state.snapshot.operations[index];
        if operation.take_pause_before() {
            let id = operation.id().clone();
            state.snapshot.paused = true;
            state.worker_active = false;
            self.paused.send_replace(true);
            self.busy.send_replace(false);
            return Step::PausedBefore(id);
        }

        operation.mark_in_progress(Utc::now());
        let operation = operation.clone();
        state.snapshot.current_operation_id = Some(operation.id().clone());
        let (abort_tx, abort_rx) = oneshot::channel();
        state.abort = Some(abort_tx);

        Step::Run(Dispatch {
            operation,
            generation: state.snapshot.generation,
            abort: abort_rx,
        })
    }

    async fn execute(&self, operation: Operation, abort: oneshot::Receiver<()>) -> Outcome {
        let kind = *operation.kind();
        let Some(handler) = self.handlers.get(kind) else {
            return Outcome::Failed(HandlerError::new(HandlerErrorKind::MissingHandler(
                kind.to_string(),
            )));
        };

        // Resolves only on an explicit abort, never when the sender is dropped.
        let aborted = async {
            if abort.await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(aborted);

        // Retries already spent before a pause or restart count against the budget.
        let mut attempt = *operation.retries();
        let mut delays = self.config.retry().delays().skip(attempt as usize);
        let mut paused = self.paused.subscribe();

        loop {
            let result = tokio::select! {
                result = self.attempt(handler.as_ref(), &operation) => result,
                _ = &mut aborted => return Outcome::Aborted,
            };

            let error = match result {
                Ok(_) => return Outcome::Succeeded,
                Err(error) => error,
            };
            if !error.is_retryable() {
                return Outcome::Failed(error);
            }
            let Some(delay) = delays.next() else {
                return Outcome::Failed(error);
            };

            attempt += 1;
            self.record_retry(operation.id(), &error, attempt, delay).await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut aborted => return Outcome::Aborted,
                _ = paused.wait_for(|paused| *paused) => return Outcome::Paused,
            }
        }
    }

    async fn attempt(&self, handler: &dyn OperationHandler, operation: &Operation) -> HandlerResult {
        match self.config.handler_timeout() {
            Some(limit) => tokio::time::timeout(limit, handler.handle(operation))
                .await
                .unwrap_or_else(|_| Err(HandlerError::new(HandlerErrorKind::Timeout(limit.as_secs())))),
            None => handler.handle(operation).await,
        }
    }

    async fn record_retry(
        &self,
        id: &OperationId,
        error: &HandlerError,
        attempt: u32,
        delay: Duration,
    ) {
        let message = error.message();
        {
            let mut state = self.state.lock();
            if let Some(op) = state.snapshot.operations.iter_mut().find(|op| op.id() == id) {
                op.record_retry(message.clone());
            }
        }

        warn!(%id, attempt, ?delay, error = %message, "Operation failed, retrying after backoff");
        self.persist().await;
        self.emit(&QueueEvent::Retrying {
            id: id.clone(),
            attempt,
            delay,
            error: message,
        });
    }

    async fn finish(&self, id: &OperationId, generation: u64, outcome: Outcome) {
        let event = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.abort = None;
            if state.snapshot.current_operation_id.as_ref() == Some(id) {
                state.snapshot.current_operation_id = None;
            }

            let index = state.snapshot.operations.iter().position(|op| op.id() == id);
            match index {
                Some(index) if state.snapshot.generation == generation => {
                    let operations = &mut state.snapshot.operations;
                    match outcome {
                        Outcome::Succeeded => {
                            operations[index].mark_completed();
                            operations.remove(index);
                            info!(%id, "Operation completed");
                            Some(QueueEvent::Completed(id.clone()))
                        }
                        Outcome::Failed(error) => {
                            let message = error.message();
                            let retained = *self.config.retain_failed();
                            if retained {
                                operations[index].mark_failed(message.clone());
                            } else {
                                operations.remove(index);
                            }
                            error!(%id, error = %message, retryable = error.is_retryable(), "Operation failed");
                            Some(QueueEvent::Failed {
                                id: id.clone(),
                                error: message,
                                retained,
                            })
                        }
                        Outcome::Paused => {
                            operations[index].reset_to_pending();
                            info!(%id, "Queue paused during backoff, operation returned to pending");
                            Some(QueueEvent::Requeued(id.clone()))
                        }
                        Outcome::Aborted => None,
                    }
                }
                _ => {
                    debug!(%id, "Discarding result of removed operation");
                    None
                }
            }
        };

        if let Some(event) = event {
            self.persist().await;
            self.emit(&event);
        }
    }

    /// Save the current snapshot, logging failures.
    async fn persist(&self) {
        let _serialized = self.save_lock.lock().await;
        let snapshot = self.state.lock().snapshot.clone();
        if let Err(e) = self.store.save(&snapshot).await {
            error!(error = %e, "Failed to persist queue");
        }
    }

    fn emit(&self, event: &QueueEvent) {
        let listeners: Vec<QueueListener> = self.listeners.read().clone();
        for listener in listeners {
            listener(event);
        }
    }
}

/// Index of the highest-priority pending operation whose dependencies have
/// left the queue (or completed). Ties go to the earliest enqueued.
fn select_ready(operations: &[Operation]) -> Option<usize> {
    operations
        .iter()
        .enumerate()
        .filter(|(_, op)| op.is_pending() && dependencies_met(op, operations))
        .max_by(|(_, a), (_, b)| {
            a.priority()
                .cmp(b.priority())
                .then_with(|| b.sequence().cmp(a.sequence()))
        })
        .map(|(index, _)| index)
}

fn dependencies_met(operation: &Operation, operations: &[Operation]) -> bool {
    operation.depends_on().iter().all(|dep| {
        operations
            .iter()
            .find(|op| op.id() == dep)
            .is_none_or(|op| *op.status() == OperationStatus::Completed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(priority: i64, sequence: u64) -> Operation {
        Operation::new(
            OperationKind::Chat,
            json!(null),
            EnqueueOptions::default().with_priority(priority),
            sequence,
            Utc::now(),
        )
    }

    #[test]
    fn selects_highest_priority_then_oldest() {
        let ops = vec![op(0, 0), op(5, 1), op(5, 2), op(-1, 3)];
        assert_eq!(select_ready(&ops), Some(1));
    }

    #[test]
    fn skips_operations_with_pending_dependencies() {
        let first = op(0, 0);
        let blocked = Operation::new(
            OperationKind::Chat,
            json!(null),
            EnqueueOptions::default()
                .with_priority(10)
                .with_depends_on(vec![first.id().clone()]),
            1,
            Utc::now(),
        );
        let ops = vec![first, blocked];
        assert_eq!(select_ready(&ops), Some(0));
        assert_eq!(select_ready(&ops[1..]), Some(0));
    }

    #[test]
    fn nothing_ready_when_all_in_progress() {
        let mut running = op(0, 0);
        running.mark_in_progress(Utc::now());
        assert_eq!(select_ready(&[running]), None);
    }
}
