use std::error::Error;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the bus.
///
/// Handler failures never appear here: they are captured per invocation and
/// reported as [`HandlerError`] results plus telemetry.
#[derive(Debug, Error)]
pub enum BusError {
    /// The event could not be built (missing or empty type).
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A synchronous publish did not see every handler finish in time.
    ///
    /// The log append and any dispatched handlers are not undone.
    #[error("synchronous publish timed out after {0:?}")]
    SyncTimeout(Duration),

    /// The coordinator mailbox is full; the command was not queued.
    #[error("event bus mailbox is full ({0} pending commands)")]
    Overloaded(usize),

    /// The coordinator is no longer running.
    #[error("event bus is closed")]
    Closed,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure raised by a single handler invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler reported a failure.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler panicked; the panic was caught by the dispatcher.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The event payload did not match what the handler expected.
    #[error("payload decode failed: {0}")]
    Decode(String),

    #[error("handler error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    /// Convenience constructor for handler code.
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed(reason.into())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Decode(err.to_string())
    }
}

/// Transport-level failure of the cross-node broadcast.
///
/// Publishers never observe this; the coordinator logs it and keeps
/// delivering locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("broadcast transport unavailable: {0}")]
    Unavailable(String),

    #[error("broadcast codec error: {0}")]
    Codec(String),
}

impl From<bitcode::Error> for BroadcastError {
    fn from(err: bitcode::Error) -> Self {
        BroadcastError::Codec(err.to_string())
    }
}

impl From<serde_json::Error> for BroadcastError {
    fn from(err: serde_json::Error) -> Self {
        BroadcastError::Codec(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
