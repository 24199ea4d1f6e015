//! Error types for depot-sync.

use std::path::PathBuf;

use thiserror::Error;

use depot_core::{ConfigError, ManifestError};

/// A failed network fetch, for the manifest or a single file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Connection, TLS, timeout or body-read failure.
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The configured base URL cannot be used.
    #[error("invalid remote URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Why one entry of the download set could not be made ready for commit.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The bytes arrived but could not be written to the staging area.
    #[error("failed to stage {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All errors that abort a build or sync session outright.
///
/// Per-file download failures are not errors at this level; they are
/// collected into [`crate::SyncOutcome::Aborted`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Something on disk would block the commit; checked before any mutation.
    #[error("cannot apply sync at {path}: {reason}")]
    Conflict { path: PathBuf, reason: &'static str },

    /// The remote manifest could not be fetched.
    #[error("network error: {0}")]
    Network(#[from] FetchError),

    /// Reading the confirmation answer failed.
    #[error("prompt error: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("download pool error: {0}")]
    Pool(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
