//! Configuration error types.

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use chronicler_error::ConfigError;
    ///
    /// let err = ConfigError::new("Missing [queue] section");
    /// assert!(err.message.contains("[queue]"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// A setting the command needs was not provided by any source.
    ///
    /// ```
    /// use chronicler_error::ConfigError;
    ///
    /// let err = ConfigError::missing_key("queue.store_path", "pass --path");
    /// assert_eq!(err.message, "Missing queue.store_path: pass --path");
    /// ```
    #[track_caller]
    pub fn missing_key(key: &str, hint: &str) -> Self {
        Self::new(format!("Missing {}: {}", key, hint))
    }

    /// A setting was present but could not be used.
    ///
    /// ```
    /// use chronicler_error::ConfigError;
    ///
    /// let err = ConfigError::invalid_value("logging.level", "loud", "unknown level");
    /// assert_eq!(err.message, "Invalid logging.level 'loud': unknown level");
    /// ```
    #[track_caller]
    pub fn invalid_value(key: &str, value: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(format!("Invalid {} '{}': {}", key, value, reason))
    }
}
