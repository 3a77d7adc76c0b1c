//! Operation handlers and the registry the worker dispatches through.

use async_trait::async_trait;
use chronicler_core::{Operation, OperationKind};
use chronicler_error::HandlerError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Result produced by a handler.
pub type HandlerResult = Result<Value, HandlerError>;

/// Executes one kind of pipeline operation.
///
/// Return [`HandlerError::permanent`] for failures that must not be retried
/// and [`HandlerError::transient`] for failures worth another attempt.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Run the operation.
    async fn handle(&self, operation: &Operation) -> HandlerResult;
}

/// Handler backed by an async closure. Built with [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Wrap an async closure as an [`OperationHandler`].
///
/// ```
/// use chronicler_queue::{OperationHandler, handler_fn};
/// use serde_json::json;
///
/// let handler = handler_fn(|op| async move { Ok(json!({ "echo": op.payload().clone() })) });
/// # let _: &dyn OperationHandler = &handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Operation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> OperationHandler for HandlerFn<F>
where
    F: Fn(Operation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, operation: &Operation) -> HandlerResult {
        (self.f)(operation.clone()).await
    }
}

/// Dispatch table from operation kind to handler.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<OperationKind, Arc<dyn OperationHandler>>>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl HandlerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `kind`, replacing any previous one.
    pub fn register(&self, kind: OperationKind, handler: impl OperationHandler + 'static) {
        self.handlers.write().insert(kind, Arc::new(handler));
    }

    /// Handler registered for `kind`.
    pub fn get(&self, kind: OperationKind) -> Option<Arc<dyn OperationHandler>> {
        self.handlers.read().get(&kind).cloned()
    }

    /// Whether `kind` has a handler.
    pub fn contains(&self, kind: OperationKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<_> = self.handlers.read().keys().copied().collect();
        kinds.sort();
        kinds
    }
}
