//! Domain types for depot manifests.
//!
//! Manifest keys and `fullPath` values are always forward-slash, relative to
//! the project root. Use [`normalize_path`] before building one by hand.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Lowercase hex content digest. Used for change detection only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One tracked file's record within a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Tracked directory the file was found in (`""` for the project root).
    pub dir: String,
    /// Bare file name.
    pub file: String,
    /// Identity key: `dir/file`, normalized.
    pub full_path: String,
    pub fingerprint: Fingerprint,
    /// Bumped by exactly one whenever the publisher sees a new fingerprint.
    pub version: u64,
}

impl Entry {
    /// A freshly tracked file at version 0.
    pub fn new(dir: &str, file: &str, fingerprint: Fingerprint) -> Self {
        let dir = normalize_path(dir);
        let full_path = join_full_path(&dir, file);
        Self {
            dir,
            file: file.to_owned(),
            full_path,
            fingerprint,
            version: 0,
        }
    }

    /// Location of this entry under `root` on the local filesystem.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        local_path(root, &self.full_path)
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Mapping from `fullPath` to [`Entry`].
///
/// Serializes as a single JSON object with keys in sorted order, so two
/// builds of the same tree produce byte-identical files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: HashMap<String, Entry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` under its own `fullPath`, returning any entry it replaced.
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.full_path.clone(), entry)
    }

    pub fn get(&self, full_path: &str) -> Option<&Entry> {
        self.entries.get(full_path)
    }

    pub fn contains(&self, full_path: &str) -> bool {
        self.entries.contains_key(full_path)
    }

    pub fn remove(&mut self, full_path: &str) -> Option<Entry> {
        self.entries.remove(full_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// All `fullPath` keys, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl FromIterator<Entry> for Manifest {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        for entry in iter {
            manifest.insert(entry);
        }
        manifest
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut sorted: Vec<(&String, &Entry)> = self.entries.iter().collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
        let mut map = serializer.serialize_map(Some(sorted.len()))?;
        for (key, entry) in sorted {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Normalize a relative path to forward slashes with no `.` or empty
/// components. The project root itself normalizes to `""`.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// `dir/file`, or just `file` when `dir` is the root.
pub fn join_full_path(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_owned()
    } else {
        format!("{dir}/{file}")
    }
}

/// `true` if `full_path` stays inside the project root when joined onto it.
pub fn is_safe_relative(full_path: &str) -> bool {
    if full_path.is_empty() || full_path.starts_with('/') || full_path.contains('\\') {
        return false;
    }
    // Reject drive prefixes such as `C:` as well.
    if full_path.contains(':') {
        return false;
    }
    full_path
        .split('/')
        .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// Join a forward-slash relative path onto `root` segment by segment.
pub fn local_path(root: &Path, full_path: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for seg in full_path.split('/').filter(|s| !s.is_empty()) {
        path.push(seg);
    }
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
