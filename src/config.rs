//! Startup configuration for the logging interceptors.
//!
//! Mirrors the `logging-starter.*` property namespace: a minimum severity
//! and a toggle deciding whether interception is wired at all. The value is
//! resolved once and then handed to each interceptor by clone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const LEVEL_VAR: &str = "LOGGING_STARTER_LEVEL";
const ENABLED_VAR: &str = "LOGGING_STARTER_ENABLED";

/// Severity used for request/response log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

/// Emit a `tracing` event at a [`LogLevel`] chosen at runtime.
///
/// `tracing` macros need a constant level, so this expands to one arm per
/// severity.
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            $crate::config::LogLevel::Trace => ::tracing::trace!($($arg)+),
            $crate::config::LogLevel::Debug => ::tracing::debug!($($arg)+),
            $crate::config::LogLevel::Info => ::tracing::info!($($arg)+),
            $crate::config::LogLevel::Warn => ::tracing::warn!($($arg)+),
            $crate::config::LogLevel::Error => ::tracing::error!($($arg)+),
        }
    };
}

pub(crate) use log_at;

/// Process-wide logging configuration.
///
/// # Examples
///
/// ```rust
/// use logging_starter::{LoggingConfig, LogLevel};
///
/// let config = LoggingConfig::builder()
///     .level(LogLevel::Debug)
///     .build();
/// assert!(config.enabled);
/// assert_eq!(config.level, LogLevel::Debug);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the interceptors are wired at all
    pub enabled: bool,
    /// Severity of the request/response log lines
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
        }
    }
}

impl LoggingConfig {
    pub fn builder() -> LoggingConfigBuilder {
        LoggingConfigBuilder::new()
    }

    /// Resolve the configuration from `LOGGING_STARTER_LEVEL` and
    /// `LOGGING_STARTER_ENABLED`.
    ///
    /// Unset variables keep their defaults. An unknown level is a startup
    /// error; the toggle enables interception only for `true`
    /// (case-insensitive) and disables it for any other value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration from an arbitrary key lookup, using the same
    /// keys as [`LoggingConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup(LEVEL_VAR) {
            config.level = level.parse()?;
        }

        if let Some(enabled) = lookup(ENABLED_VAR) {
            config.enabled = parse_toggle(&enabled);
        }

        Ok(config)
    }
}

fn parse_toggle(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Builder for [`LoggingConfig`].
#[must_use = "builder does nothing until you call build()"]
pub struct LoggingConfigBuilder {
    config: LoggingConfig,
}

impl LoggingConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggingConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn build(self) -> LoggingConfig {
        self.config
    }
}

impl Default for LoggingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
