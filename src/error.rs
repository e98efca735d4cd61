//! Unified error types for Chaser-Pilot

use serde_json::Value;
use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Chaser-Pilot
#[derive(Error, Debug)]
pub enum Error {
    /// No debugging endpoint or page target could be resolved
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Transport unreachable, or the retry budget was exhausted
    #[error("Connection error: {0}")]
    Connection(String),

    /// Recoverable I/O failure on a live connection (closed socket, timeout, broken pipe)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The browser answered a well-formed command with an error payload
    #[error("Protocol error: {message} (code: {code})")]
    Protocol {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// JavaScript exception raised inside the page
    #[error("Script error: {0}")]
    Script(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new discovery error
    pub fn discovery<S: Into<String>>(msg: S) -> Self {
        Error::Discovery(msg.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Error::Connection(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(code: i64, message: S, data: Option<Value>) -> Self {
        Error::Protocol {
            code,
            message: message.into(),
            data,
        }
    }

    /// Create a new script error
    pub fn script<S: Into<String>>(msg: S) -> Self {
        Error::Script(msg.into())
    }

    /// Create a new navigation failed error
    pub fn navigation_failed<S: Into<String>>(msg: S) -> Self {
        Error::NavigationFailed(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Whether the dispatcher may reconnect and retry after this error
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
