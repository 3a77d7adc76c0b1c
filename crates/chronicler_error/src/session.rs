//! Session transaction error types.

/// Specific error conditions for checkpoint and branch transactions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum SessionErrorKind {
    /// Checkpoint name was empty
    #[display("Checkpoint name is required")]
    MissingName,
    /// Another checkpoint or branch transaction holds the lock
    #[display("Another checkpoint/branch operation is in progress")]
    Blocked,
    /// Chat identity changed while the transaction was running
    #[display("Chat context changed during {}", _0)]
    ContextDrift(String),
    /// Knowledge store clone failed
    #[display("Failed to clone lorebook: {}", _0)]
    CloneFailed(String),
    /// Host checkpoint/branch primitive failed
    #[display("Host call failed: {}", _0)]
    DelegateFailed(String),
    /// Host checkpoint/branch primitive did not answer in time
    #[display("Host call timed out after {}s", _0)]
    DelegateTimeout(u64),
    /// Host primitive returned no identifier
    #[display("Failed to create {} via host bookmarks API", _0)]
    NoIdentifier(String),
    /// Branch exists but navigation to it failed
    #[display("Branch created but failed to open: {}", _0)]
    BranchNotOpened(String),
    /// Host collaborator reported an error
    #[display("Host error: {}", _0)]
    Host(String),
}

/// Session error with location tracking.
///
/// # Examples
///
/// ```
/// use chronicler_error::{SessionError, SessionErrorKind};
///
/// let err = SessionError::new(SessionErrorKind::ContextDrift("branch creation".into()));
/// assert!(format!("{}", err).contains("Chat context changed"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Session Error: {} at line {} in {}", kind, line, file)]
pub struct SessionError {
    /// The specific error condition
    pub kind: SessionErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl SessionError {
    /// Create a new SessionError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SessionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SessionErrorKind {
        &self.kind
    }
}
