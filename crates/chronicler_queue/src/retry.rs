//! Backoff policy for transient handler failures.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};

/// How often and how patiently transient failures are retried.
///
/// Delays grow as `base^n * factor_millis` and are capped at
/// `max_delay_secs`. The defaults give 10s, 20s and 40s before the third and
/// final retry. A `max_retries` of zero disables retries.
///
/// # Examples
///
/// ```
/// use chronicler_queue::RetryPolicy;
/// use std::time::Duration;
///
/// let delays: Vec<Duration> = RetryPolicy::default().delays().collect();
/// assert_eq!(
///     delays,
///     vec![
///         Duration::from_secs(10),
///         Duration::from_secs(20),
///         Duration::from_secs(40),
///     ]
/// );
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
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    /// Exponential base
    #[serde(default = "default_base_millis")]
    base_millis: u64,
    /// Multiplier applied to each exponential step, in milliseconds
    #[serde(default = "default_factor_millis")]
    factor_millis: u64,
    /// Upper bound for a single delay
    #[serde(default = "default_max_delay_secs")]
    max_delay_secs: u64,
    /// Randomize each delay
    #[serde(default)]
    jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_millis() -> u64 {
    2
}

fn default_factor_millis() -> u64 {
    5000
}

fn default_max_delay_secs() -> u64 {
    300 // 5 minutes
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_millis: default_base_millis(),
            factor_millis: default_factor_millis(),
            max_delay_secs: default_max_delay_secs(),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Delays to wait before each retry, in order.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let backoff = ExponentialBackoff::from_millis(self.base_millis.max(1))
            .factor(self.factor_millis)
            .max_delay(Duration::from_secs(self.max_delay_secs));

        let delays: Box<dyn Iterator<Item = Duration> + Send> = if self.jitter {
            Box::new(backoff.map(jitter))
        } else {
            Box::new(backoff)
        };

        Box::new(delays.take(self.max_retries as usize))
    }
}
