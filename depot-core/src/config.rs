//! `depot.yaml` — publisher and consumer settings for a project root.
//!
//! ```text
//! publish:
//!   manifest: depot-manifest.json
//!   tracked: [assets, assets/icons]
//!   blacklist: [assets/secret.txt]
//! remote:
//!   base_url: https://example.com/project/
//!   manifest: depot-manifest.json
//!   timeout_secs: 30
//!   retries: 2
//!   concurrency: 4
//! ```
//!
//! A missing file yields [`DepotConfig::default`]; a malformed one is an error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::{config_path, DEFAULT_MANIFEST};
use crate::types::{local_path, normalize_path};

/// Root of `depot.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    pub publish: PublishConfig,
    pub remote: RemoteConfig,
}

/// What the publisher tracks and where it writes the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Manifest location, relative to the project root.
    pub manifest: String,
    /// Directories scanned non-recursively, in order.
    pub tracked: Vec<String>,
    /// `fullPath` values never included in a build.
    pub blacklist: Vec<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            manifest: DEFAULT_MANIFEST.to_owned(),
            tracked: Vec::new(),
            blacklist: Vec::new(),
        }
    }
}

impl PublishConfig {
    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        local_path(root, &normalize_path(&self.manifest))
    }

    /// Tracked directories, normalized and de-duplicated in first-seen order.
    pub fn tracked_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = Vec::with_capacity(self.tracked.len());
        for dir in self.tracked.iter().map(|d| normalize_path(d)) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    pub fn is_blacklisted(&self, full_path: &str) -> bool {
        self.blacklist
            .iter()
            .any(|excluded| normalize_path(excluded) == full_path)
    }
}

/// Where the consumer fetches from, and how patiently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    /// Manifest name relative to `base_url`.
    pub manifest: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Extra attempts after the first for transport errors and 5xx responses.
    pub retries: u32,
    pub retry_delay_ms: u64,
    /// Maximum simultaneous file downloads.
    pub concurrency: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            manifest: DEFAULT_MANIFEST.to_owned(),
            timeout_secs: 30,
            retries: 2,
            retry_delay_ms: 500,
            concurrency: 4,
        }
    }
}

/// Load `<root>/depot.yaml`, or defaults if it does not exist.
pub fn load_at(root: &Path) -> Result<DepotConfig, ConfigError> {
    let path = config_path(root);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(DepotConfig::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    if contents.trim().is_empty() {
        return Ok(DepotConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}
