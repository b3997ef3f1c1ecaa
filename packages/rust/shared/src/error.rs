//! Error types for Frontdesk.
//!
//! Library crates use [`FrontdeskError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! A knowledge lookup miss is not an error anywhere in this taxonomy: lookup
//! operations return `Option` and the engine handles `None` by escalating.

use std::path::PathBuf;

/// Top-level error type for all Frontdesk operations.
#[derive(Debug, thiserror::Error)]
pub enum FrontdeskError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Store unreachable or failed to open. Fatal at startup; the process
    /// must not serve sessions without a working store.
    #[error("store connection error: {0}")]
    StoreConnection(String),

    /// A query requires an index the database does not have. The message
    /// tells the operator how to fix it; the failing sweep is abandoned but
    /// the session-serving loop keeps running.
    #[error("store index error: {message}")]
    QueryIndex { message: String },

    /// A create or batch update failed to persist.
    #[error("store write error: {0}")]
    StoreWrite(String),

    /// A read or row decode failed.
    #[error("store query error: {0}")]
    StoreQuery(String),

    /// Transport framing or socket error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FrontdeskError>;

impl FrontdeskError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a missing-index error from any displayable message.
    pub fn query_index(msg: impl Into<String>) -> Self {
        Self::QueryIndex {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FrontdeskError::config("missing home directory");
        assert_eq!(err.to_string(), "config error: missing home directory");

        let err = FrontdeskError::StoreWrite("disk full".into());
        assert_eq!(err.to_string(), "store write error: disk full");
    }

    #[test]
    fn index_error_carries_operator_message() {
        let err = FrontdeskError::query_index(
            "composite index idx_help_requests_pending_age is missing",
        );
        assert!(err.to_string().contains("idx_help_requests_pending_age"));
    }
}
