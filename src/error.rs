//! Error types shared by every stage of a run.
//!
//! Resolution errors (`InvalidAddress`, `InvalidConfig`) abort before any
//! listener exists. Listen and serve errors are returned to the caller of a
//! single-shot run, or logged and retried by the persistent supervisor.
//! Health probe failures never show up here; they only ever close the listener.

use std::time::Duration;

/// Top-level error for resolving, acquiring and serving.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The address is neither a bare bind specifier nor a parseable URL.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A recognised query parameter carries a value that does not parse.
    #[error("invalid value {value:?} for parameter {param:?}: {reason}")]
    InvalidConfig {
        param: &'static str,
        value: String,
        reason: String,
    },

    /// The transport could not produce a listener in time.
    #[error("listen on {address}: {source}")]
    ListenFailed {
        address: String,
        #[source]
        source: ListenError,
    },

    /// The accept/serve loop stopped for a reason other than listener closure.
    #[error("serve: {0}")]
    ServeFailed(#[source] std::io::Error),
}

/// Cause of a failed listener acquisition.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("dial timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] std::io::Error),
}

/// Coarse classification of a [`ServeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAddress,
    InvalidConfig,
    ListenFailed,
    ServeFailed,
}

impl ServeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServeError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            ServeError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            ServeError::ListenFailed { .. } => ErrorKind::ListenFailed,
            ServeError::ServeFailed(_) => ErrorKind::ServeFailed,
        }
    }

    pub(crate) fn invalid_config(
        param: &'static str,
        value: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        ServeError::InvalidConfig {
            param,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
