//! Operation handler error types and retry classification.

/// Message fragments that mark an untyped failure as an authorization problem.
const PERMANENT_SIGNATURES: &[&str] = &[
    "unauthorized",
    "forbidden",
    "authentication",
    "invalid api key",
    "invalid_api_key",
    "invalid-api-key",
];

/// Outcome classification carried by a failed handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum HandlerErrorKind {
    /// Failure that will not go away on retry (credentials, malformed payload)
    #[display("Permanent failure: {}", _0)]
    Permanent(String),
    /// Failure that may succeed on a later attempt (rate limit, outage)
    #[display("Transient failure: {}", _0)]
    Transient(String),
    /// Handler exceeded its time budget
    #[display("Handler timed out after {}s", _0)]
    Timeout(u64),
    /// No handler is registered for the operation kind
    #[display("No handler registered for operation kind: {}", _0)]
    MissingHandler(String),
}

impl HandlerErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HandlerErrorKind::Transient(_) | HandlerErrorKind::Timeout(_)
        )
    }
}

/// Error returned by an operation handler.
///
/// Handlers choose the classification explicitly with [`HandlerError::permanent`]
/// or [`HandlerError::transient`]. Errors bubbling up from collaborators that only
/// carry text go through [`HandlerError::from_message`].
///
/// # Examples
///
/// ```
/// use chronicler_error::{HandlerError, RetryableError};
///
/// let err = HandlerError::from_message("401 Unauthorized");
/// assert!(!err.is_retryable());
///
/// let err = HandlerError::from_message("Bad Request");
/// assert!(err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Handler Error: {} at line {} in {}", kind, line, file)]
pub struct HandlerError {
    /// The kind of error that occurred
    pub kind: HandlerErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl HandlerError {
    /// Create a new HandlerError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: HandlerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Failure that must not be retried.
    #[track_caller]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::Permanent(message.into()))
    }

    /// Failure worth another attempt.
    #[track_caller]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::Transient(message.into()))
    }

    /// Classify an untyped error message.
    ///
    /// Authorization and credential failures are permanent, everything else is
    /// treated as transient because upstream errors often hide rate limits behind
    /// generic messages.
    #[track_caller]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_permanent_message(&message) {
            Self::permanent(message)
        } else {
            Self::transient(message)
        }
    }

    /// Plain message without the location suffix.
    pub fn message(&self) -> String {
        match &self.kind {
            HandlerErrorKind::Permanent(msg) | HandlerErrorKind::Transient(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<String> for HandlerError {
    #[track_caller]
    fn from(message: String) -> Self {
        Self::from_message(message)
    }
}

impl From<&str> for HandlerError {
    #[track_caller]
    fn from(message: &str) -> Self {
        Self::from_message(message)
    }
}

/// Returns true when the text carries an authorization failure signature.
pub(crate) fn is_permanent_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    PERMANENT_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
}

/// Trait for errors that support retry logic.
///
/// This trait allows error types to specify whether they should trigger a retry.
pub trait RetryableError {
    /// Returns true if the failed call may succeed on a later attempt.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for HandlerError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_signatures_are_permanent() {
        for msg in [
            "Unauthorized",
            "403 Forbidden",
            "Authentication required",
            "Invalid API key supplied",
            "error: invalid_api_key",
        ] {
            assert!(!HandlerError::from_message(msg).is_retryable(), "{msg}");
        }
    }

    #[test]
    fn other_messages_are_transient() {
        for msg in ["Bad Request", "rate limited", "connection reset", ""] {
            assert!(HandlerError::from_message(msg).is_retryable(), "{msg}");
        }
    }

    #[test]
    fn timeout_is_retryable_and_missing_handler_is_not() {
        assert!(HandlerError::new(HandlerErrorKind::Timeout(30)).is_retryable());
        assert!(
            !HandlerError::new(HandlerErrorKind::MissingHandler("chat".into())).is_retryable()
        );
    }

    #[test]
    fn message_strips_location() {
        let err = HandlerError::transient("upstream 503");
        assert_eq!(err.message(), "upstream 503");
    }
}
