//! Operation queue error types.

/// Specific error conditions for queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum QueueErrorKind {
    /// Operation id is not present in the queue
    #[display("Operation not found: {}", _0)]
    NotFound(String),
    /// Operation is executing and cannot be modified
    #[display("Operation {} is in progress", _0)]
    InProgress(String),
    /// Operation kind tag is not recognised
    #[display("Unknown operation kind: {}", _0)]
    UnknownKind(String),
}

/// Queue error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Queue Error: {} at line {} in {}", kind, line, file)]
pub struct QueueError {
    /// The specific error condition
    pub kind: QueueErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl QueueError {
    /// Create a new QueueError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: QueueErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
