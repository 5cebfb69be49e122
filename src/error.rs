//! Error types for simpleq

use thiserror::Error;

/// Result type for simpleq operations
pub type Result<T> = std::result::Result<T, SimpleqError>;

/// Errors that can occur in simpleq operations
#[derive(Error, Debug)]
pub enum SimpleqError {
    /// Connection, protocol or command errors reported by Redis
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Transport error reported by a non-Redis list store
    #[error("Store error: {message}")]
    Store { message: String },

    /// A blocking pop elapsed without an element.
    ///
    /// Only `Queue::blocking_pop` reports this; the blocking transfer reports
    /// a timeout as an empty result instead.
    #[error("Blocking pop on {key} timed out after {timeout_secs}s")]
    Timeout { key: String, timeout_secs: u64 },

    /// The queue already has an attached listener
    #[error("Queue {key} already has a listener")]
    AlreadyListening { key: String },

    /// A listener was requested outside a tokio runtime
    #[error("No tokio runtime available to run the listener for {key}")]
    NoRuntime { key: String },

    /// Queue keys must be non-empty
    #[error("Invalid queue key: {key:?}")]
    InvalidKey { key: String },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Configuration source could not be read or deserialized
    #[error("Config source error: {0}")]
    Config(#[from] config::ConfigError),
}

impl SimpleqError {
    /// Create a store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a blocking pop timeout error
    pub fn timeout<S: Into<String>>(key: S, timeout_secs: u64) -> Self {
        Self::Timeout {
            key: key.into(),
            timeout_secs,
        }
    }

    /// Create an already listening error
    pub fn already_listening<S: Into<String>>(key: S) -> Self {
        Self::AlreadyListening { key: key.into() }
    }

    /// Create a missing runtime error
    pub fn no_runtime<S: Into<String>>(key: S) -> Self {
        Self::NoRuntime { key: key.into() }
    }

    /// Whether this error is the blocking pop timeout rather than a real failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
