use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "depot.yaml";
pub const DEFAULT_MANIFEST: &str = "depot-manifest.json";

pub const STATE_DIR: &str = ".depot";
pub const LOCAL_MANIFEST: &str = "manifest.json";
pub const REMOTE_MANIFEST: &str = "remote-manifest.json";
pub const STAGING_DIR: &str = "staging";

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

/// Consumer's last-synced manifest.
pub fn local_manifest_path(root: &Path) -> PathBuf {
    state_dir(root).join(LOCAL_MANIFEST)
}

/// Transient copy of the fetched remote manifest; lives only for one session.
pub fn remote_manifest_path(root: &Path) -> PathBuf {
    state_dir(root).join(REMOTE_MANIFEST)
}

/// Downloaded files wait here until every fetch in the session has succeeded.
pub fn staging_dir(root: &Path) -> PathBuf {
    state_dir(root).join(STAGING_DIR)
}
