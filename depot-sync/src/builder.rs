//! Publisher-side manifest builder.
//!
//! Each build rescans every tracked directory (one level deep), fingerprints
//! every file and compares against the previous manifest on disk:
//!
//! 1. Not in the previous manifest → version 0, reported as created.
//! 2. Same fingerprint → previous entry carried forward untouched.
//! 3. New fingerprint → version + 1, reported as modified.
//!
//! The result replaces the previous manifest wholesale; paths that were not
//! revisited drop out and are reported as removed. Nothing is written unless
//! every tracked file was read successfully.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use depot_core::{
    fingerprint::fingerprint_file,
    paths::CONFIG_FILE,
    store,
    types::{join_full_path, local_path, normalize_path},
    Entry, Manifest, PublishConfig,
};

use crate::error::{io_err, SyncError};

/// Outcome of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Newly tracked paths, sorted.
    pub created: Vec<String>,
    /// Paths whose fingerprint (and therefore version) changed, sorted.
    pub modified: Vec<String>,
    /// Paths in the previous manifest that this scan did not see, sorted.
    pub removed: Vec<String>,
    pub unchanged: usize,
    /// The complete new manifest.
    pub manifest: Manifest,
}

impl BuildReport {
    /// `true` if the new manifest is identical to the previous one.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Scans tracked directories under a project root.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    root: PathBuf,
    config: PublishConfig,
}

impl CacheBuilder {
    pub fn new(root: impl Into<PathBuf>, config: PublishConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config.manifest_path(&self.root)
    }

    /// Load the previous manifest, scan, and save the result.
    ///
    /// With `dry_run` the report is computed but nothing is written, not even
    /// the empty manifest that a first load would otherwise create.
    pub fn build(&self, dry_run: bool) -> Result<BuildReport, SyncError> {
        let manifest_path = self.manifest_path();
        let previous = if dry_run && !manifest_path.exists() {
            Manifest::new()
        } else {
            store::load(&manifest_path)?
        };

        let report = self.scan(&previous)?;

        if dry_run {
            tracing::info!("[dry-run] would write {}", manifest_path.display());
        } else {
            store::save(&manifest_path, &report.manifest)?;
            tracing::info!(
                "wrote {} ({} entries)",
                manifest_path.display(),
                report.manifest.len()
            );
        }
        Ok(report)
    }

    /// Build a new manifest against `previous` without touching the disk.
    pub fn scan(&self, previous: &Manifest) -> Result<BuildReport, SyncError> {
        let manifest_key = normalize_path(&self.config.manifest);

        let mut manifest = Manifest::new();
        let mut created = Vec::new();
        let mut modified = Vec::new();
        let mut unchanged = 0usize;

        for dir in self.config.tracked_dirs() {
            for file in list_files(&local_path(&self.root, &dir))? {
                let full_path = join_full_path(&dir, &file);
                if full_path == manifest_key || full_path == CONFIG_FILE {
                    continue;
                }
                if self.config.is_blacklisted(&full_path) {
                    tracing::debug!("blacklisted: {full_path}");
                    continue;
                }

                let fingerprint = fingerprint_file(&local_path(&self.root, &full_path))?;
                let entry = match previous.get(&full_path) {
                    None => {
                        tracing::debug!("created: {full_path}");
                        created.push(full_path.clone());
                        Entry::new(&dir, &file, fingerprint)
                    }
                    Some(prev) if prev.fingerprint == fingerprint => {
                        unchanged += 1;
                        prev.clone()
                    }
                    Some(prev) => {
                        let version = prev.version + 1;
                        tracing::debug!("modified: {full_path} (v{version})");
                        modified.push(full_path.clone());
                        Entry {
                            version,
                            ..Entry::new(&dir, &file, fingerprint)
                        }
                    }
                };
                manifest.insert(entry);
            }
        }

        let mut removed: Vec<String> = previous
            .paths()
            .into_iter()
            .filter(|path| !manifest.contains(path))
            .map(str::to_owned)
            .collect();
        removed.sort();
        created.sort();
        modified.sort();

        Ok(BuildReport {
            created,
            modified,
            removed,
            unchanged,
            manifest,
        })
    }
}

/// Names of the regular files directly inside `dir`, sorted. Symlinks are
/// followed; subdirectories and dangling links are skipped.
fn list_files(dir: &Path) -> Result<Vec<String>, SyncError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!("skipping dangling link {}", path.display());
                continue;
            }
            Err(err) => return Err(io_err(&path, err)),
        };
        if !meta.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => tracing::warn!("skipping non-UTF-8 file name {name:?} in {}", dir.display()),
        }
    }
    names.sort();
    Ok(names)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
