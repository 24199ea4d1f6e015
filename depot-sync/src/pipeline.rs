//! Shared publish/update entrypoints used by both CLI binaries.

use std::path::Path;

use depot_core::{paths::config_path, ConfigError, PublishConfig, RemoteConfig};

use crate::builder::{BuildReport, CacheBuilder};
use crate::confirm::Confirm;
use crate::executor::{SyncExecutor, SyncOptions, SyncOutcome};
use crate::fetch::fetcher_for;
use crate::SyncError;

/// Rebuild the manifest for `root` from its tracked directories.
pub fn publish(root: &Path, config: &PublishConfig, dry_run: bool) -> Result<BuildReport, SyncError> {
    CacheBuilder::new(root, config.clone()).build(dry_run)
}

/// Sync `root` against its remote.
///
/// `base_override` wins over `remote.base_url`; with neither set this fails
/// with [`ConfigError::MissingRemote`] before anything is fetched.
pub fn update(
    root: &Path,
    remote: &RemoteConfig,
    base_override: Option<&str>,
    options: SyncOptions,
    confirm: &mut dyn Confirm,
) -> Result<SyncOutcome, SyncError> {
    let base_url = resolve_base_url(root, remote, base_override)?;
    tracing::info!("syncing {} from {base_url}", root.display());
    let fetcher = fetcher_for(base_url, remote)?;
    SyncExecutor::new(root, fetcher.as_ref(), options).run(confirm)
}

fn resolve_base_url<'a>(
    root: &Path,
    remote: &'a RemoteConfig,
    base_override: Option<&'a str>,
) -> Result<&'a str, ConfigError> {
    base_override
        .or(remote.base_url.as_deref())
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingRemote {
            path: config_path(root),
        })
}
