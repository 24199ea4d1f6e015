//! Error types for depot-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading, validating or persisting a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying I/O failure, with the path that was being accessed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest content is not a valid JSON object of entries.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An entry lacks one of the required fields.
    #[error("manifest at {path}: entry '{key}' is missing field `{field}`")]
    MissingField {
        path: PathBuf,
        key: String,
        field: &'static str,
    },

    /// The mapping key disagrees with the entry's own `fullPath`.
    #[error("manifest at {path}: key '{key}' does not match fullPath '{full_path}'")]
    KeyMismatch {
        path: PathBuf,
        key: String,
        full_path: String,
    },

    /// `fullPath` is absolute, empty, or escapes the project root.
    #[error("manifest at {path}: unsafe path '{full_path}'")]
    UnsafePath { path: PathBuf, full_path: String },

    /// One entry's `fullPath` is a parent directory of another's.
    #[error("manifest at {path}: '{file}' is both a file and a parent of '{nested}'")]
    PathConflict {
        path: PathBuf,
        file: String,
        nested: String,
    },

    /// JSON serialization error (save path).
    #[error("manifest JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while reading `depot.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the config path for context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Neither `depot.yaml` nor the command line named a remote to sync from.
    #[error("no remote configured; set `remote.base_url` in {path} or pass --remote")]
    MissingRemote { path: PathBuf },
}

/// Convenience constructor for [`ManifestError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}
