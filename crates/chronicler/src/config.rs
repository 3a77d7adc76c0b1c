//! Layered configuration for the Chronicler components.
//!
//! Sources, lowest precedence first:
//! 1. Bundled defaults (`include_str!` of `chronicler.toml`)
//! 2. `~/.config/chronicler/chronicler.toml`
//! 3. `./chronicler.toml`
//! 4. `CHRONICLER__SECTION__KEY` environment variables

use chronicler_error::{ChroniclerError, ChroniclerResult, ConfigError};
use chronicler_queue::QueueConfig;
use chronicler_session::SessionConfig;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

/// Bundled default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../chronicler.toml");

fn default_level() -> String {
    "info".to_string()
}

/// Log output settings.
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
#[setters(prefix = "with_", into)]
#[builder(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Configuration for every Chronicler component.
///
/// # Examples
///
/// ```
/// use chronicler::ChroniclerConfig;
///
/// let config = ChroniclerConfig::from_toml_str("[queue]\nretain_failed = true\n").unwrap();
/// assert!(*config.queue().retain_failed());
/// assert_eq!(*config.queue().retry().max_retries(), 3);
/// assert_eq!(config.logging().level(), "info");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct ChroniclerConfig {
    /// Operation scheduler settings
    #[serde(default)]
    queue: QueueConfig,
    /// Checkpoint and branch transaction settings
    #[serde(default)]
    session: SessionConfig,
    /// Log output settings
    #[serde(default)]
    logging: LoggingConfig,
}

impl ChroniclerConfig {
    /// Load configuration from every source.
    #[instrument]
    pub fn load() -> ChroniclerResult<Self> {
        debug!("Loading configuration: env > current dir > home dir > bundled defaults");

        let mut builder = Self::defaults();
        if let Some(config_dir) = dirs::home_dir().map(|home| home.join(".config").join("chronicler")) {
            let user_config = config_dir.join("chronicler.toml");
            builder = builder.add_source(File::from(user_config).required(false));
        }
        builder = builder
            .add_source(File::with_name("chronicler").required(false))
            .add_source(
                Environment::with_prefix("CHRONICLER")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Load the bundled defaults overridden by a single file.
    pub fn from_file(path: impl AsRef<Path>) -> ChroniclerResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration file");
        let builder = Self::defaults().add_source(File::from(path));
        Self::finish(builder).map_err(|e| {
            ChroniclerError::from(ConfigError::new(format!(
                "Failed to read configuration from {}: {}",
                path.display(),
                e
            )))
        })
    }

    /// Load the bundled defaults overridden by TOML text.
    pub fn from_toml_str(toml: &str) -> ChroniclerResult<Self> {
        Self::finish(Self::defaults().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> ChroniclerResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ChroniclerError::from(ConfigError::new(format!(
                "Failed to serialize configuration: {}",
                e
            )))
        })
    }

    fn defaults() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> ChroniclerResult<Self> {
        builder
            .build()
            .map_err(|e| {
                ChroniclerError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ChroniclerError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_match_type_defaults() {
        let bundled = ChroniclerConfig::from_toml_str("").unwrap();
        assert_eq!(bundled, ChroniclerConfig::default());
    }
}
