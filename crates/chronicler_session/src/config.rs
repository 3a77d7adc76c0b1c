//! Configuration for checkpoint and branch transactions.

use chronicler_core::INTERNAL_ENTRY_PREFIXES;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_delegate_timeout_secs() -> u64 {
    60
}

fn default_internal_prefixes() -> Vec<String> {
    INTERNAL_ENTRY_PREFIXES.iter().map(|p| p.to_string()).collect()
}

/// Transaction guard settings.
///
/// # Examples
///
/// ```
/// use chronicler_session::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::default().with_delegate_timeout_secs(5);
/// assert_eq!(config.delegate_timeout(), Duration::from_secs(5));
/// assert!(config.internal_prefixes().iter().any(|p| p == "_registry_"));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct SessionConfig {
    /// Upper bound on the host checkpoint/branch call
    #[serde(default = "default_delegate_timeout_secs")]
    delegate_timeout_secs: u64,

    /// Entry label prefixes that are never cloned
    #[serde(default = "default_internal_prefixes")]
    internal_prefixes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delegate_timeout_secs: default_delegate_timeout_secs(),
            internal_prefixes: default_internal_prefixes(),
        }
    }
}

impl SessionConfig {
    /// Delegate timeout as a duration.
    pub fn delegate_timeout(&self) -> Duration {
        Duration::from_secs(self.delegate_timeout_secs)
    }
}
