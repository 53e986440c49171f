use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientError;

/// Errors that abort a publishing run.
///
/// Every variant is terminal: the run stops and the open edit is never
/// committed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("failed to {operation}: {source}")]
    RemoteCall {
        operation: String,
        #[source]
        source: ClientError,
    },

    #[error("could not find track with name {0}")]
    NotFound(String),

    #[error("malformed expansion file entry '{entry}': {reason}")]
    MalformedInput { entry: String, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Adapter for `map_err` that tags a client failure with the operation name.
    pub fn remote(operation: impl Into<String>) -> impl FnOnce(ClientError) -> Self {
        let operation = operation.into();
        move |source| Self::RemoteCall { operation, source }
    }

    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
