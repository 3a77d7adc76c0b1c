//! Top-level error wrapper types.

use crate::{
    ConfigError, HandlerError, JsonError, QueueError, SessionError, StorageError,
};

/// Every error condition the Chronicler crates can surface.
///
/// # Examples
///
/// ```
/// use chronicler_error::{ChroniclerError, JsonError};
///
/// let json_err = JsonError::new("expected value at line 1");
/// let err: ChroniclerError = json_err.into();
/// assert!(format!("{}", err).contains("JSON Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ChroniclerErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Queue persistence error
    #[from(StorageError)]
    Storage(StorageError),
    /// Queue bookkeeping error
    #[from(QueueError)]
    Queue(QueueError),
    /// Operation handler failure
    #[from(HandlerError)]
    Handler(HandlerError),
    /// Checkpoint/branch transaction error
    #[from(SessionError)]
    Session(SessionError),
}

/// Chronicler error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Chronicler Error: {}", _0)]
pub struct ChroniclerError(Box<ChroniclerErrorKind>);

impl ChroniclerError {
    /// Create a new error from a kind.
    pub fn new(kind: ChroniclerErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ChroniclerErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to ChroniclerErrorKind
impl<T> From<T> for ChroniclerError
where
    T: Into<ChroniclerErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Chronicler operations.
pub type ChroniclerResult<T> = std::result::Result<T, ChroniclerError>;
