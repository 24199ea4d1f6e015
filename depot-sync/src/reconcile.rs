//! Consumer-side reconciliation of a local manifest against a remote one.
//!
//! Versions alone drive the decision; fingerprints were already compared by
//! the publisher when it assigned them.

use depot_core::{Entry, Manifest};

/// What a sync must do to make the local tree match the remote manifest.
///
/// The three lists are disjoint by path and sorted by `fullPath`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Remote entries with no local counterpart.
    pub to_create: Vec<Entry>,
    /// Remote entries whose version differs from the local one.
    pub to_update: Vec<Entry>,
    /// Local entries the remote no longer tracks.
    pub to_delete: Vec<Entry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Entries whose content must be fetched: creates followed by updates.
    pub fn download_set(&self) -> Vec<&Entry> {
        self.to_create.iter().chain(self.to_update.iter()).collect()
    }

    /// Entries whose local file must be removed.
    pub fn delete_set(&self) -> &[Entry] {
        &self.to_delete
    }
}

/// Compute the change set taking `local` to `remote`.
///
/// With `full_resync` the local manifest is ignored: everything remote is
/// created and nothing is deleted.
pub fn diff(local: &Manifest, remote: &Manifest, full_resync: bool) -> ChangeSet {
    let mut changes = ChangeSet::default();

    if full_resync {
        changes.to_create = remote.iter().cloned().collect();
        sort(&mut changes.to_create);
        return changes;
    }

    for entry in local.iter() {
        match remote.get(&entry.full_path) {
            None => changes.to_delete.push(entry.clone()),
            Some(theirs) if theirs.version != entry.version => {
                changes.to_update.push(theirs.clone())
            }
            Some(_) => {}
        }
    }
    for entry in remote.iter() {
        if !local.contains(&entry.full_path) {
            changes.to_create.push(entry.clone());
        }
    }

    sort(&mut changes.to_create);
    sort(&mut changes.to_update);
    sort(&mut changes.to_delete);
    changes
}

fn sort(entries: &mut [Entry]) {
    entries.sort_unstable_by(|a, b| a.full_path.cmp(&b.full_path));
}
