//! Content fingerprints — XXH3-128 over the exact file bytes.
//!
//! Fast and stable across platforms, not a security boundary.

use std::path::Path;

use xxhash_rust::xxh3::xxh3_128;

use crate::error::{io_err, ManifestError};
use crate::types::Fingerprint;

/// Fingerprint a byte slice.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint(hex::encode(xxh3_128(bytes).to_be_bytes()))
}

/// Read `path` in full and fingerprint its contents.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, ManifestError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    Ok(fingerprint(&bytes))
}
