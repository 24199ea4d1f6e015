//! Manifest persistence.
//!
//! Load validates every entry before anything is returned; save writes the
//! whole mapping to a `.tmp` sibling and renames it over the target, so a
//! reader never observes a truncated manifest.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, ManifestError};
use crate::types::{is_safe_relative, Entry, Fingerprint, Manifest};

/// Content written for a manifest with no entries.
pub const EMPTY_MANIFEST: &[u8] = b"{}\n";

/// Wire shape of one entry; every field optional so absence can be reported
/// as [`ManifestError::MissingField`] rather than a generic parse error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    dir: Option<String>,
    file: Option<String>,
    full_path: Option<String>,
    fingerprint: Option<String>,
    version: Option<u64>,
}

/// Load the manifest at `path`.
///
/// A missing file is created containing `{}` and an empty manifest is
/// returned. Anything present but unparseable is an error; it is never
/// coerced to empty.
pub fn load(path: &Path) -> Result<Manifest, ManifestError> {
    match std::fs::read(path) {
        Ok(bytes) => parse(&bytes, path),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!("creating empty manifest at {}", path.display());
            write_atomic(path, EMPTY_MANIFEST)?;
            Ok(Manifest::new())
        }
        Err(err) => Err(io_err(path, err)),
    }
}

/// Parse and validate manifest bytes. `origin` is used only in error messages.
pub fn parse(bytes: &[u8], origin: &Path) -> Result<Manifest, ManifestError> {
    let raw: HashMap<String, RawEntry> =
        serde_json::from_slice(bytes).map_err(|source| ManifestError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

    // Validate in key order so the reported error is deterministic.
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort_unstable();

    let mut manifest = Manifest::new();
    for key in keys {
        let entry = validate_entry(key, &raw[key], origin)?;
        manifest.insert(entry);
    }
    reject_path_conflicts(&manifest, origin)?;
    Ok(manifest)
}

/// A path cannot be a file and a directory at once; `a` next to `a/b` is
/// rejected. Reports the lexicographically smallest nested path.
fn reject_path_conflicts(manifest: &Manifest, origin: &Path) -> Result<(), ManifestError> {
    for nested in manifest.paths() {
        let mut ancestors = nested.match_indices('/').map(|(i, _)| &nested[..i]);
        if let Some(file) = ancestors.find(|prefix| manifest.contains(prefix)) {
            return Err(ManifestError::PathConflict {
                path: origin.to_path_buf(),
                file: file.to_owned(),
                nested: nested.to_owned(),
            });
        }
    }
    Ok(())
}

fn validate_entry(key: &str, raw: &RawEntry, origin: &Path) -> Result<Entry, ManifestError> {
    let missing = |field: &'static str| ManifestError::MissingField {
        path: origin.to_path_buf(),
        key: key.to_owned(),
        field,
    };

    let dir = raw.dir.clone().ok_or_else(|| missing("dir"))?;
    let file = raw.file.clone().ok_or_else(|| missing("file"))?;
    let full_path = raw.full_path.clone().ok_or_else(|| missing("fullPath"))?;
    let fingerprint = raw.fingerprint.clone().ok_or_else(|| missing("fingerprint"))?;
    let version = raw.version.ok_or_else(|| missing("version"))?;

    if full_path != key {
        return Err(ManifestError::KeyMismatch {
            path: origin.to_path_buf(),
            key: key.to_owned(),
            full_path,
        });
    }
    if !is_safe_relative(&full_path) {
        return Err(ManifestError::UnsafePath {
            path: origin.to_path_buf(),
            full_path,
        });
    }

    Ok(Entry {
        dir,
        file,
        full_path,
        fingerprint: Fingerprint(fingerprint),
        version,
    })
}

/// Serialize `manifest` and atomically replace the file at `path`.
pub fn save(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    let mut json = serde_json::to_vec_pretty(manifest)?;
    json.push(b'\n');
    write_atomic(path, &json)
}

/// Write `bytes` to `<path>.tmp`, then rename over `path`.
///
/// Parent directories are created as needed. On failure the `.tmp` file is
/// removed and the previous content of `path` is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = std::fs::write(&tmp, bytes) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&tmp, e));
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// `<path>.tmp`, always in the same directory as `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use tempfile::TempDir;

    fn sample() -> Manifest {
        let mut a = Entry::new("assets", "a.txt", fingerprint(b"a"));
        a.version = 2;
        let b = Entry::new("", "README.md", fingerprint(b"readme"));
        vec![a, b].into_iter().collect()
    }

    #[test]
    fn missing_file_is_created_as_empty_object() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state").join("manifest.json");
        let manifest = load(&path).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(std::fs::read(&path).unwrap(), EMPTY_MANIFEST);
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        let manifest = sample();
        save(&path, &manifest).unwrap();
        assert_eq!(load(&path).unwrap(), manifest);
    }

    #[test]
    fn save_overwrites_rather_than_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        save(&path, &sample()).unwrap();
        save(&path, &Manifest::new()).unwrap();
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        save(&path, &sample()).unwrap();
        assert!(!tmp_path(&path).exists(), ".tmp must be renamed away");
    }

    #[test]
    fn zero_byte_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(&path, b"").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn missing_version_is_missing_field() {
        let json = br#"{"a.txt":{"dir":"","file":"a.txt","fullPath":"a.txt","fingerprint":"00"}}"#;
        let err = parse(json, Path::new("remote")).unwrap_err();
        match err {
            ManifestError::MissingField { key, field, .. } => {
                assert_eq!(key, "a.txt");
                assert_eq!(field, "version");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn key_must_match_full_path() {
        let json = br#"{"b.txt":{"dir":"","file":"a.txt","fullPath":"a.txt","fingerprint":"00","version":0}}"#;
        let err = parse(json, Path::new("remote")).unwrap_err();
        assert!(matches!(err, ManifestError::KeyMismatch { .. }), "got: {err}");
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let json = br#"{"../x":{"dir":"..","file":"x","fullPath":"../x","fingerprint":"00","version":0}}"#;
        let err = parse(json, Path::new("remote")).unwrap_err();
        assert!(matches!(err, ManifestError::UnsafePath { .. }), "got: {err}");
    }

    #[test]
    fn file_that_is_also_a_directory_is_rejected() {
        let json = br#"{
            "a":{"dir":"","file":"a","fullPath":"a","fingerprint":"00","version":0},
            "a/b/c":{"dir":"a/b","file":"c","fullPath":"a/b/c","fingerprint":"00","version":0},
            "ab":{"dir":"","file":"ab","fullPath":"ab","fingerprint":"00","version":0}
        }"#;
        match parse(json, Path::new("remote")).unwrap_err() {
            ManifestError::PathConflict { file, nested, .. } => {
                assert_eq!(file, "a");
                assert_eq!(nested, "a/b/c");
            }
            other => panic!("expected PathConflict, got {other:?}"),
        }
    }

    #[test]
    fn sibling_with_shared_name_prefix_is_fine() {
        let json = br#"{
            "a":{"dir":"","file":"a","fullPath":"a","fingerprint":"00","version":0},
            "ab/c":{"dir":"ab","file":"c","fullPath":"ab/c","fingerprint":"00","version":0}
        }"#;
        assert_eq!(parse(json, Path::new("remote")).unwrap().len(), 2);
    }

    #[test]
    fn write_failure_leaves_original_intact() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("manifest.json");
        save(&path, &sample()).unwrap();

        // A directory squatting on the tmp name makes the write fail.
        std::fs::create_dir(tmp_path(&path)).unwrap();
        let err = save(&path, &Manifest::new()).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
        assert_eq!(load(&path).unwrap(), sample(), "original must be intact");
    }
}
