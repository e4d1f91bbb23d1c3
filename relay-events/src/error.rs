//! Error types for events, listeners and dispatch

use crate::listener::{ListenerKind, Protocol};
use thiserror::Error;

/// Errors raised by [`Event`](crate::Event) construction and parameter access.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parameter not found: {0}")]
    KeyNotFound(String),

    #[error("Parameter '{key}' has an unexpected shape: {source}")]
    InvalidParameter {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EventError {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::InvalidArgument(_) => "event_invalid_argument",
            EventError::KeyNotFound(_) => "event_key_not_found",
            EventError::InvalidParameter { .. } => "event_invalid_parameter",
        }
    }
}

/// Error returned by a listener.
///
/// The dispatcher never swallows these: the first failing listener aborts the
/// dispatch and its error is handed back to the caller inside
/// [`DispatchError::ListenerFailed`].
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Listener failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ListenerError {
    /// Convenience constructor for ad-hoc failures.
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed(message.into())
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerError::Failed(_) => "listener_failed",
            ListenerError::Event(e) => e.as_label(),
            ListenerError::Other(_) => "listener_other",
        }
    }
}

/// Dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Listener #{position} for '{event}' is a {kind} listener and cannot serve {protocol}")]
    InvalidListener {
        event: String,
        position: usize,
        protocol: Protocol,
        kind: ListenerKind,
    },

    #[error("Listener #{position} for '{event}' failed: {source}")]
    ListenerFailed {
        event: String,
        position: usize,
        #[source]
        source: ListenerError,
    },

    #[error("Value conversion failed: {0}")]
    Conversion(#[from] serde_json::Error),
}

impl DispatchError {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::InvalidListener { .. } => "dispatch_invalid_listener",
            DispatchError::ListenerFailed { .. } => "dispatch_listener_failed",
            DispatchError::Conversion(_) => "dispatch_conversion",
        }
    }

    /// The listener error behind a [`DispatchError::ListenerFailed`], if any.
    pub fn listener_error(&self) -> Option<&ListenerError> {
        match self {
            DispatchError::ListenerFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
