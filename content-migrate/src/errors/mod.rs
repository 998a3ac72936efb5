//! Error types for the content migration pipeline.
//!
//! Only errors that stop a whole run (or a whole phase) are modelled here. Failures of
//! individual records, files and collections are recorded in the run report instead.

use std::path::PathBuf;

use content_migrate_repository::ContentStoreError;
use thiserror::Error;

/// Errors from reading or writing the on-disk snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// A snapshot file or directory does not exist.
    #[error("Snapshot entry not found: {0}")]
    NotFound(PathBuf),

    /// Filesystem error on a snapshot path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file does not hold the JSON shape expected for it.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A collection name that cannot be used as a file name.
    #[error("Invalid collection name: {0}")]
    InvalidName(String),
}

impl SnapshotError {
    /// Wrap an I/O error, mapping `NotFound` to [`SnapshotError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Create a JSON error.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that stop a migration run or one of its phases.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An endpoint could not be reached at all.
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// Snapshot error that prevents the phase from starting.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Content store error that prevents the phase from starting.
    #[error("Content store error: {0}")]
    Store(#[from] ContentStoreError),
}

impl MigrationError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an unreachable endpoint error.
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }
}
