//! Error types for host access and scanning.

use std::path::PathBuf;

use thiserror::Error;

use crate::node::ItemId;

/// Errors raised by the host model while it is being read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The document was closed or otherwise disposed.
    #[error("Document has been disposed")]
    Disposed,

    /// A specific item can no longer be resolved.
    #[error("Model item {item} is no longer available")]
    ItemUnavailable { item: ItemId },

    /// Other host failure.
    #[error("{message}")]
    Other { message: String },
}

impl HostError {
    /// Create a generic host error from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Errors that can occur when starting or running a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan is already running in this session.
    #[error("A scan is already in progress")]
    AlreadyInProgress,

    /// The host model could not be read.
    #[error("Host model access failed: {0}")]
    Host(#[from] HostError),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The background worker could not be started.
    #[error("Failed to start scan worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// A model document could not be read or parsed.
    #[error("Invalid model document {path}: {message}")]
    Document { path: PathBuf, message: String },
}

impl ScanError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a document error with path context.
    pub fn document(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Document {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
