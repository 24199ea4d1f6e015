//! Consumer-side sync session.
//!
//! ```text
//! Idle → FetchManifest → Diff ─┬─ (nothing to do) ─────────────────────→ Done
//!                              └─ AwaitConfirm ─┬─ (declined) ─────────→ Done
//!                                               └─ Downloading ─┬─ (any failed) → Aborted
//!                                                               └─ Committing ──→ Done
//! ```
//!
//! Downloads land in `.depot/staging/` first. Only when every fetch has
//! succeeded are deletions applied, staged files renamed into place, and the
//! remote manifest bytes written verbatim over the local manifest. An aborted
//! or declined session leaves the tracked tree and local manifest untouched.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use depot_core::{
    paths::{local_manifest_path, remote_manifest_path, staging_dir, CONFIG_FILE, STATE_DIR},
    store,
    types::local_path,
    Entry, ManifestError,
};

use crate::confirm::Confirm;
use crate::error::{io_err, DownloadError, SyncError};
use crate::fetch::RemoteFetcher;
use crate::reconcile::{self, ChangeSet};

/// Default number of simultaneous downloads.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Session states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    FetchManifest,
    Diff,
    AwaitConfirm,
    Downloading,
    Committing,
    Done,
    Aborted,
}

/// Knobs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Treat the local manifest as empty and download everything.
    pub full_resync: bool,
    /// Skip the confirmation prompt.
    pub force: bool,
    /// Maximum simultaneous downloads.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            full_resync: false,
            force: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// One entry of the download set that could not be fetched or staged.
#[derive(Debug)]
pub struct FailedDownload {
    pub path: String,
    pub error: DownloadError,
}

/// What a committed session changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub bytes_downloaded: u64,
}

/// Terminal result of a session that did not hit a structural error.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Local manifest already matches the remote.
    UpToDate,
    /// The confirmation gate said no; nothing was touched.
    Declined(ChangeSet),
    /// At least one download failed; nothing was touched.
    Aborted {
        changes: ChangeSet,
        failed: Vec<FailedDownload>,
    },
    /// All changes applied and the local manifest replaced.
    Synced(SyncReport),
}

/// Drives one sync of `root` against a remote.
pub struct SyncExecutor<'a> {
    root: PathBuf,
    fetcher: &'a dyn RemoteFetcher,
    options: SyncOptions,
    state: SyncState,
}

impl<'a> SyncExecutor<'a> {
    pub fn new(root: impl Into<PathBuf>, fetcher: &'a dyn RemoteFetcher, options: SyncOptions) -> Self {
        Self {
            root: root.into(),
            fetcher,
            options,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run the session to a terminal state.
    ///
    /// `Err` means a structural failure (unreadable root, unparseable
    /// manifest, unreachable remote manifest, an obstacle found before
    /// committing, I/O error while committing).
    pub fn run(&mut self, confirm: &mut dyn Confirm) -> Result<SyncOutcome, SyncError> {
        let result = self.run_inner(confirm);
        if result.is_err() {
            self.transition(SyncState::Aborted);
        }
        result
    }

    fn run_inner(&mut self, confirm: &mut dyn Confirm) -> Result<SyncOutcome, SyncError> {
        std::fs::metadata(&self.root).map_err(|e| io_err(&self.root, e))?;

        self.transition(SyncState::FetchManifest);
        let remote_path = remote_manifest_path(&self.root);
        let remote_bytes = self.fetcher.fetch_manifest()?;
        let remote = store::parse(&remote_bytes, &remote_path)?;
        let session = Session::open(&self.root, remote_bytes)?;

        self.transition(SyncState::Diff);
        let local = store::load(&local_manifest_path(&self.root))?;
        let changes = reconcile::diff(&local, &remote, self.options.full_resync);
        reject_reserved_paths(&changes, &remote_path)?;
        if changes.is_empty() {
            tracing::info!("already up to date ({} entries)", remote.len());
            self.transition(SyncState::Done);
            return Ok(SyncOutcome::UpToDate);
        }

        if !(self.options.force || self.options.full_resync) {
            self.transition(SyncState::AwaitConfirm);
            if !confirm.confirm(&changes)? {
                tracing::info!("sync declined");
                self.transition(SyncState::Done);
                return Ok(SyncOutcome::Declined(changes));
            }
        }

        self.transition(SyncState::Downloading);
        let (staged, failed) = self.download(&session, &changes)?;
        if !failed.is_empty() {
            tracing::warn!(
                "{} of {} download(s) failed; nothing applied",
                failed.len(),
                changes.download_set().len()
            );
            self.transition(SyncState::Aborted);
            return Ok(SyncOutcome::Aborted { changes, failed });
        }

        self.transition(SyncState::Committing);
        let report = session.commit(&changes, staged)?;
        self.transition(SyncState::Done);
        Ok(SyncOutcome::Synced(report))
    }

    /// Fetch and stage every entry of the download set on a bounded pool.
    ///
    /// Results are collected positionally, so the success/failure split does
    /// not depend on which fetch finishes first.
    fn download(
        &self,
        session: &Session,
        changes: &ChangeSet,
    ) -> Result<(Vec<StagedFile>, Vec<FailedDownload>), SyncError> {
        let targets = changes.download_set();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.concurrency.max(1))
            .build()
            .map_err(|e| SyncError::Pool(e.to_string()))?;

        let fetcher = self.fetcher;
        let results: Vec<Result<StagedFile, DownloadError>> = pool.install(|| {
            targets
                .par_iter()
                .map(|entry| {
                    let bytes = fetcher.fetch_file(&entry.full_path)?;
                    session.stage(entry, &bytes)
                })
                .collect()
        });

        let mut staged = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for (entry, result) in targets.iter().zip(results) {
            match result {
                Ok(file) => {
                    tracing::debug!("fetched {} ({} bytes)", entry.full_path, file.len);
                    staged.push(file);
                }
                Err(error) => {
                    tracing::warn!("failed {}: {error}", entry.full_path);
                    failed.push(FailedDownload {
                        path: entry.full_path.clone(),
                        error,
                    });
                }
            }
        }
        Ok((staged, failed))
    }

    fn transition(&mut self, next: SyncState) {
        tracing::debug!("sync state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// The consumer's state directory and root `depot.yaml` are never sync targets.
fn reject_reserved_paths(changes: &ChangeSet, origin: &Path) -> Result<(), ManifestError> {
    let reserved = |entry: &Entry| {
        entry.full_path == CONFIG_FILE || entry.full_path.split('/').next() == Some(STATE_DIR)
    };
    let download = changes.download_set();
    match download
        .into_iter()
        .chain(changes.delete_set())
        .find(|e| reserved(*e))
    {
        Some(entry) => Err(ManifestError::UnsafePath {
            path: origin.to_path_buf(),
            full_path: entry.full_path.clone(),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A downloaded file waiting in the staging area.
#[derive(Debug)]
struct StagedFile {
    full_path: String,
    staged: PathBuf,
    len: u64,
}

/// Owns everything a sync creates under `.depot/` besides the local
/// manifest: the transient remote manifest and the staging directory. Both
/// are removed when the session is dropped, whatever path led there.
struct Session {
    root: PathBuf,
    remote_bytes: Vec<u8>,
    transient: PathBuf,
    staging: PathBuf,
}

impl Session {
    fn open(root: &Path, remote_bytes: Vec<u8>) -> Result<Self, SyncError> {
        let session = Self {
            root: root.to_path_buf(),
            transient: remote_manifest_path(root),
            staging: staging_dir(root),
            remote_bytes,
        };
        // Leftovers from an interrupted run are never reused.
        remove_dir_if_present(&session.staging)?;
        store::write_atomic(&session.transient, &session.remote_bytes)?;
        Ok(session)
    }

    fn stage(&self, entry: &Entry, bytes: &[u8]) -> Result<StagedFile, DownloadError> {
        let staged = local_path(&self.staging, &entry.full_path);
        let stage_err = |source| DownloadError::Stage {
            path: staged.clone(),
            source,
        };
        if let Some(parent) = staged.parent() {
            std::fs::create_dir_all(parent).map_err(stage_err)?;
        }
        std::fs::write(&staged, bytes).map_err(stage_err)?;
        Ok(StagedFile {
            full_path: entry.full_path.clone(),
            staged,
            len: bytes.len() as u64,
        })
    }

    /// Apply deletions, move staged files into place, then replace the local
    /// manifest with the remote bytes.
    fn commit(self, changes: &ChangeSet, staged: Vec<StagedFile>) -> Result<SyncReport, SyncError> {
        self.check_commit(changes, &staged)?;
        let mut report = SyncReport::default();

        for entry in changes.delete_set() {
            let path = entry.local_path(&self.root);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::info!("deleted: {}", entry.full_path),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    tracing::debug!("already gone: {}", entry.full_path)
                }
                Err(err) => return Err(io_err(&path, err)),
            }
            report.deleted.push(entry.full_path.clone());
        }

        for file in staged {
            let dest = local_path(&self.root, &file.full_path);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            std::fs::rename(&file.staged, &dest).map_err(|e| io_err(&dest, e))?;
            tracing::info!("wrote: {}", file.full_path);
            report.bytes_downloaded += file.len;
        }
        report.created = changes.to_create.iter().map(|e| e.full_path.clone()).collect();
        report.updated = changes.to_update.iter().map(|e| e.full_path.clone()).collect();

        store::write_atomic(&local_manifest_path(&self.root), &self.remote_bytes)?;
        self.discard()?;
        Ok(report)
    }

    /// Refuse to start a commit that would trip over the existing tree:
    /// a directory where a file is to be deleted or written, or a file where
    /// a parent directory has to be created. Paths being deleted in the same
    /// commit do not count as obstacles.
    fn check_commit(&self, changes: &ChangeSet, staged: &[StagedFile]) -> Result<(), SyncError> {
        let conflict = |path: &Path, reason| SyncError::Conflict {
            path: path.to_path_buf(),
            reason,
        };
        let deleted: HashSet<PathBuf> = changes
            .delete_set()
            .iter()
            .map(|e| e.local_path(&self.root))
            .collect();

        for entry in changes.delete_set() {
            let path = entry.local_path(&self.root);
            if std::fs::symlink_metadata(&path).is_ok_and(|m| m.is_dir()) {
                return Err(conflict(&path, "a directory is in place of a file to delete"));
            }
        }
        for file in staged {
            let dest = local_path(&self.root, &file.full_path);
            if std::fs::metadata(&dest).is_ok_and(|m| m.is_dir()) {
                return Err(conflict(&dest, "a directory is in place of a file to write"));
            }
            for parent in dest.ancestors().skip(1) {
                if parent == self.root {
                    break;
                }
                if deleted.contains(parent) {
                    continue;
                }
                if std::fs::metadata(parent).is_ok_and(|m| !m.is_dir()) {
                    return Err(conflict(parent, "a file is in place of a needed directory"));
                }
            }
        }
        Ok(())
    }

    /// Remove the transient manifest and staging area now, reporting errors.
    fn discard(&self) -> Result<(), SyncError> {
        remove_file_if_present(&self.transient)?;
        remove_dir_if_present(&self.staging)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.discard() {
            tracing::warn!("failed to clean up sync session: {err}");
        }
    }
}

fn remove_file_if_present(path: &Path) -> Result<(), SyncError> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(io_err(path, err)),
        _ => Ok(()),
    }
}

fn remove_dir_if_present(path: &Path) -> Result<(), SyncError> {
    match std::fs::remove_dir_all(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(io_err(path, err)),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::fs;

    use depot_core::{fingerprint, Manifest};
    use tempfile::TempDir;

    use crate::confirm::AssumeYes;
    use crate::error::FetchError;

    /// In-memory remote with optional per-path failures.
    #[derive(Default)]
    struct FakeRemote {
        manifest: Vec<u8>,
        files: HashMap<String, Vec<u8>>,
        broken: HashSet<String>,
        manifest_down: bool,
    }

    impl FakeRemote {
        fn with(files: &[(&str, &str, u64)]) -> Self {
            let mut remote = FakeRemote::default();
            let mut manifest = Manifest::new();
            for (path, content, version) in files {
                let (dir, file) = path.rsplit_once('/').unwrap_or(("", *path));
                manifest.insert(Entry {
                    version: *version,
                    ..Entry::new(dir, file, fingerprint(content.as_bytes()))
                });
                remote.files.insert(path.to_string(), content.as_bytes().to_vec());
            }
            remote.manifest = manifest_bytes(&manifest);
            remote
        }
    }

    fn manifest_bytes(manifest: &Manifest) -> Vec<u8> {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("m.json");
        store::save(&path, manifest).unwrap();
        fs::read(path).unwrap()
    }

    impl RemoteFetcher for FakeRemote {
        fn fetch_manifest(&self) -> Result<Vec<u8>, FetchError> {
            if self.manifest_down {
                return Err(FetchError::Status {
                    url: "manifest".into(),
                    status: 503,
                });
            }
            Ok(self.manifest.clone())
        }

        fn fetch_file(&self, relative_path: &str) -> Result<Vec<u8>, FetchError> {
            if self.broken.contains(relative_path) {
                return Err(FetchError::Transport {
                    url: relative_path.into(),
                    message: "connection reset".into(),
                });
            }
            self.files.get(relative_path).cloned().ok_or(FetchError::Status {
                url: relative_path.into(),
                status: 404,
            })
        }
    }

    struct Scripted(Vec<bool>);

    impl Confirm for Scripted {
        fn confirm(&mut self, _changes: &ChangeSet) -> Result<bool, SyncError> {
            Ok(self.0.remove(0))
        }
    }

    fn sync(root: &Path, remote: &FakeRemote, options: SyncOptions) -> SyncOutcome {
        SyncExecutor::new(root, remote, options)
            .run(&mut AssumeYes)
            .expect("sync")
    }

    #[test]
    fn first_sync_downloads_everything_and_commits() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote::with(&[("a.txt", "alpha", 0), ("d/b.txt", "bravo", 2)]);
        let outcome = sync(root.path(), &remote, SyncOptions::default());

        let SyncOutcome::Synced(report) = outcome else {
            panic!("expected synced, got {outcome:?}");
        };
        assert_eq!(report.created, vec!["a.txt", "d/b.txt"]);
        assert_eq!(report.bytes_downloaded, 10);
        assert_eq!(fs::read_to_string(root.path().join("d/b.txt")).unwrap(), "bravo");
        assert_eq!(
            fs::read(local_manifest_path(root.path())).unwrap(),
            remote.manifest,
            "local manifest must be a verbatim copy"
        );
        assert!(!remote_manifest_path(root.path()).exists());
        assert!(!staging_dir(root.path()).exists());
    }

    #[test]
    fn second_sync_is_up_to_date() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote::with(&[("a.txt", "alpha", 0)]);
        sync(root.path(), &remote, SyncOptions::default());
        let outcome = sync(root.path(), &remote, SyncOptions::default());
        assert!(matches!(outcome, SyncOutcome::UpToDate), "got {outcome:?}");
    }

    #[test]
    fn one_failed_fetch_aborts_without_mutation() {
        let root = TempDir::new().unwrap();
        let v1 = FakeRemote::with(&[("a.txt", "alpha", 0), ("gone.txt", "bye", 0)]);
        sync(root.path(), &v1, SyncOptions::default());
        let manifest_before = fs::read(local_manifest_path(root.path())).unwrap();

        let mut v2 = FakeRemote::with(&[("a.txt", "alpha v2", 1), ("new.txt", "n", 0)]);
        v2.broken.insert("new.txt".to_string());
        let mut executor = SyncExecutor::new(root.path(), &v2, SyncOptions::default());
        let outcome = executor.run(&mut AssumeYes).unwrap();

        let SyncOutcome::Aborted { failed, .. } = outcome else {
            panic!("expected aborted, got {outcome:?}");
        };
        assert_eq!(executor.state(), SyncState::Aborted);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, "new.txt");
        assert_eq!(fs::read(local_manifest_path(root.path())).unwrap(), manifest_before);
        assert_eq!(fs::read_to_string(root.path().join("a.txt")).unwrap(), "alpha");
        assert!(root.path().join("gone.txt").exists(), "no deletion on abort");
        assert!(!root.path().join("new.txt").exists());
        assert!(!staging_dir(root.path()).exists());
    }

    #[test]
    fn every_failure_is_reported() {
        let root = TempDir::new().unwrap();
        let mut remote = FakeRemote::with(&[("a", "1", 0), ("b", "2", 0), ("c", "3", 0)]);
        remote.broken.insert("a".into());
        remote.broken.insert("c".into());
        let outcome = sync(root.path(), &remote, SyncOptions { concurrency: 2, ..SyncOptions::default() });
        let SyncOutcome::Aborted { failed, .. } = outcome else {
            panic!("expected aborted, got {outcome:?}");
        };
        let mut paths: Vec<_> = failed.iter().map(|f| f.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["a", "c"]);
    }

    #[test]
    fn declined_confirmation_mutates_nothing() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote::with(&[("a.txt", "alpha", 0)]);
        let mut executor = SyncExecutor::new(root.path(), &remote, SyncOptions::default());
        let outcome = executor.run(&mut Scripted(vec![false])).unwrap();
        assert!(matches!(outcome, SyncOutcome::Declined(_)), "got {outcome:?}");
        assert_eq!(executor.state(), SyncState::Done);
        assert!(!root.path().join("a.txt").exists());
        assert!(store::load(&local_manifest_path(root.path())).unwrap().is_empty());
        assert!(!remote_manifest_path(root.path()).exists());
    }

    #[test]
    fn confirmation_is_consulted_unless_forced() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote::with(&[("a.txt", "alpha", 0)]);
        // An empty script would panic if consulted.
        let forced = SyncOptions {
            force: true,
            ..SyncOptions::default()
        };
        let outcome = SyncExecutor::new(root.path(), &remote, forced)
            .run(&mut Scripted(vec![]))
            .unwrap();
        assert!(matches!(outcome, SyncOutcome::Synced(_)));
    }

    #[test]
    fn deletion_removes_local_file_and_tolerates_missing() {
        let root = TempDir::new().unwrap();
        let v1 = FakeRemote::with(&[("a.txt", "a", 0), ("b.txt", "b", 0), ("c.txt", "c", 0)]);
        sync(root.path(), &v1, SyncOptions::default());
        fs::remove_file(root.path().join("c.txt")).unwrap();

        let v2 = FakeRemote::with(&[("a.txt", "a", 0)]);
        let SyncOutcome::Synced(report) = sync(root.path(), &v2, SyncOptions::default()) else {
            panic!("expected synced");
        };
        assert_eq!(report.deleted, vec!["b.txt", "c.txt"]);
        assert!(!root.path().join("b.txt").exists());
        assert!(root.path().join("a.txt").exists());
    }

    #[test]
    fn full_resync_redownloads_and_skips_prompt() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote::with(&[("a.txt", "alpha", 0)]);
        sync(root.path(), &remote, SyncOptions::default());
        fs::write(root.path().join("a.txt"), "local edit").unwrap();

        let options = SyncOptions {
            full_resync: true,
            ..SyncOptions::default()
        };
        let outcome = SyncExecutor::new(root.path(), &remote, options)
            .run(&mut Scripted(vec![]))
            .unwrap();
        assert!(matches!(outcome, SyncOutcome::Synced(_)));
        assert_eq!(fs::read_to_string(root.path().join("a.txt")).unwrap(), "alpha");
    }

    #[test]
    fn unreachable_manifest_is_network_error_without_state() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote {
            manifest_down: true,
            ..FakeRemote::default()
        };
        let mut executor = SyncExecutor::new(root.path(), &remote, SyncOptions::default());
        let err = executor.run(&mut AssumeYes).unwrap_err();
        assert!(matches!(err, SyncError::Network(_)), "got: {err}");
        assert_eq!(executor.state(), SyncState::Aborted);
        assert!(!root.path().join(STATE_DIR).exists());
    }

    #[test]
    fn malformed_remote_manifest_is_parse_error() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote {
            manifest: b"{\"a\":".to_vec(),
            ..FakeRemote::default()
        };
        let err = SyncExecutor::new(root.path(), &remote, SyncOptions::default())
            .run(&mut AssumeYes)
            .unwrap_err();
        assert!(
            matches!(err, SyncError::Manifest(ManifestError::Parse { .. })),
            "got: {err}"
        );
    }

    #[test]
    fn remote_cannot_target_state_dir() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote::with(&[(".depot/manifest.json", "{}", 0)]);
        let err = SyncExecutor::new(root.path(), &remote, SyncOptions::default())
            .run(&mut AssumeYes)
            .unwrap_err();
        assert!(
            matches!(err, SyncError::Manifest(ManifestError::UnsafePath { .. })),
            "got: {err}"
        );
    }

    #[test]
    fn remote_cannot_overwrite_local_config() {
        let root = TempDir::new().unwrap();
        let config = "remote:\n  base_url: https://example.com/\n";
        fs::write(root.path().join("depot.yaml"), config).unwrap();
        let remote = FakeRemote::with(&[("depot.yaml", "publish: {}\n", 0), ("a.txt", "a", 0)]);

        let err = SyncExecutor::new(root.path(), &remote, SyncOptions::default())
            .run(&mut AssumeYes)
            .unwrap_err();
        assert!(
            matches!(err, SyncError::Manifest(ManifestError::UnsafePath { .. })),
            "got: {err}"
        );
        assert_eq!(fs::read_to_string(root.path().join("depot.yaml")).unwrap(), config);
        assert!(!root.path().join("a.txt").exists());
    }

    #[test]
    fn directory_in_place_of_download_blocks_commit_up_front() {
        let root = TempDir::new().unwrap();
        let v1 = FakeRemote::with(&[("gone.txt", "bye", 0)]);
        sync(root.path(), &v1, SyncOptions::default());
        let manifest_before = fs::read(local_manifest_path(root.path())).unwrap();
        fs::create_dir(root.path().join("b.txt")).unwrap();

        let v2 = FakeRemote::with(&[("a.txt", "a", 0), ("b.txt", "b", 0)]);
        let mut executor = SyncExecutor::new(root.path(), &v2, SyncOptions::default());
        let err = executor.run(&mut AssumeYes).unwrap_err();

        assert!(matches!(err, SyncError::Conflict { .. }), "got: {err}");
        assert_eq!(executor.state(), SyncState::Aborted);
        assert!(root.path().join("gone.txt").exists(), "no deletion before the check");
        assert!(!root.path().join("a.txt").exists());
        assert_eq!(fs::read(local_manifest_path(root.path())).unwrap(), manifest_before);
        assert!(!staging_dir(root.path()).exists());
    }

    #[test]
    fn file_in_place_of_parent_dir_blocks_commit_up_front() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("d"), "not a dir").unwrap();
        let remote = FakeRemote::with(&[("a.txt", "a", 0), ("d/b.txt", "b", 0)]);

        let err = SyncExecutor::new(root.path(), &remote, SyncOptions::default())
            .run(&mut AssumeYes)
            .unwrap_err();
        assert!(matches!(err, SyncError::Conflict { .. }), "got: {err}");
        assert!(!root.path().join("a.txt").exists());
    }

    #[test]
    fn file_replaced_by_directory_of_same_name_syncs() {
        let root = TempDir::new().unwrap();
        let v1 = FakeRemote::with(&[("d", "file", 0)]);
        sync(root.path(), &v1, SyncOptions::default());

        let v2 = FakeRemote::with(&[("d/b.txt", "b", 0)]);
        let SyncOutcome::Synced(report) = sync(root.path(), &v2, SyncOptions::default()) else {
            panic!("expected synced");
        };
        assert_eq!(report.deleted, vec!["d"]);
        assert_eq!(fs::read_to_string(root.path().join("d/b.txt")).unwrap(), "b");
    }

    #[test]
    fn deletion_target_that_is_a_directory_blocks_commit() {
        let root = TempDir::new().unwrap();
        let v1 = FakeRemote::with(&[("x", "x", 0)]);
        sync(root.path(), &v1, SyncOptions::default());
        fs::remove_file(root.path().join("x")).unwrap();
        fs::create_dir(root.path().join("x")).unwrap();

        let v2 = FakeRemote::with(&[("a.txt", "a", 0)]);
        let err = SyncExecutor::new(root.path(), &v2, SyncOptions::default())
            .run(&mut AssumeYes)
            .unwrap_err();
        assert!(matches!(err, SyncError::Conflict { .. }), "got: {err}");
        assert!(!root.path().join("a.txt").exists());
    }

    #[test]
    fn remote_listing_file_and_its_child_is_rejected_before_download() {
        let root = TempDir::new().unwrap();
        let remote = FakeRemote::with(&[("a", "file", 0), ("a/b", "nested", 0)]);
        let err = SyncExecutor::new(root.path(), &remote, SyncOptions::default())
            .run(&mut AssumeYes)
            .unwrap_err();
        assert!(
            matches!(err, SyncError::Manifest(ManifestError::PathConflict { .. })),
            "got: {err}"
        );
        assert!(!root.path().join(STATE_DIR).exists());
    }
}
