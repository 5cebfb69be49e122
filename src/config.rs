//! # Configuration for simpleq
//!
//! Connection settings for the Redis list store and tuning for background
//! listeners. Values come from defaults layered with `SIMPLEQ_*` environment
//! variables.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimpleqError};

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default listener block timeout, in whole seconds
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 1;

/// Default capacity of the listener element and error channels
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Configuration for simpleq
///
/// # Examples
///
/// ```rust
/// use simpleq::SimpleqConfig;
///
/// let config = SimpleqConfig::new()
///     .with_redis_url("redis://cache.internal:6379/2")
///     .with_listener_poll_timeout_secs(2);
///
/// assert_eq!(config.listener_poll_timeout_secs, 2);
/// assert_eq!(config.listener_buffer_size, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleqConfig {
    /// Redis connection URL
    pub redis_url: String,

    /// How long each listener iteration blocks before re-checking for close.
    /// Zero would block forever and is rejected by `validate`.
    pub listener_poll_timeout_secs: u64,

    /// Capacity of the bounded element and error channels of a listener
    pub listener_buffer_size: usize,
}

impl Default for SimpleqConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            listener_poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            listener_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl SimpleqConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from defaults overridden by `SIMPLEQ_*` variables,
    /// e.g. `SIMPLEQ_REDIS_URL`, `SIMPLEQ_LISTENER_POLL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config: Self = config::Config::builder()
            .set_default("redis_url", defaults.redis_url)?
            .set_default(
                "listener_poll_timeout_secs",
                defaults.listener_poll_timeout_secs,
            )?
            .set_default("listener_buffer_size", defaults.listener_buffer_size as u64)?
            .add_source(config::Environment::with_prefix("SIMPLEQ").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Set the Redis connection URL
    pub fn with_redis_url<S: Into<String>>(mut self, url: S) -> Self {
        self.redis_url = url.into();
        self
    }

    /// Set the listener poll timeout
    pub fn with_listener_poll_timeout_secs(mut self, secs: u64) -> Self {
        self.listener_poll_timeout_secs = secs;
        self
    }

    /// Set the listener channel capacity
    pub fn with_listener_buffer_size(mut self, size: usize) -> Self {
        self.listener_buffer_size = size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.redis_url.is_empty() {
            return Err(SimpleqError::config("redis_url cannot be empty"));
        }

        self.queue_config().validate()
    }

    /// Per-queue settings derived from this configuration
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            poll_timeout_secs: self.listener_poll_timeout_secs,
            buffer_size: self.listener_buffer_size,
        }
    }
}

/// Listener settings carried by each `Queue`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Block timeout of each listener iteration, in whole seconds
    pub poll_timeout_secs: u64,
    /// Capacity of the listener channels
    pub buffer_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        SimpleqConfig::default().queue_config()
    }
}

impl QueueConfig {
    /// Validate the listener settings
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout_secs == 0 {
            return Err(SimpleqError::config(
                "listener poll timeout must be at least 1 second, 0 would block forever",
            ));
        }

        if self.buffer_size == 0 {
            return Err(SimpleqError::config(
                "listener buffer size must be greater than 0",
            ));
        }

        Ok(())
    }
}
