//! Content-addressed diffing of two directory snapshots.

use std::collections::HashSet;
use std::ffi::OsStr;

use snapshot::{DirectorySnapshot, FileEntry};

/// The copy and delete decisions derived from one source/replica snapshot
/// pair.
///
/// A plan is a pure function of its two input snapshots: computing it
/// performs no I/O and has no side effects. Entries appear in snapshot
/// order (name-sorted), and no entry ever appears in both lists.
#[derive(Clone, Debug, Default)]
pub struct ReconciliationPlan {
    copy: Vec<FileEntry>,
    delete: Vec<FileEntry>,
}

impl ReconciliationPlan {
    /// Diffs `source` against `replica` by content digest.
    ///
    /// Copy-list: source entries whose digest is absent from the replica's
    /// digest set. The comparison is name-agnostic, so content already
    /// mirrored under any name counts as present, and duplicate source
    /// entries with one shared digest are each evaluated against the same
    /// set.
    ///
    /// Delete-list: replica entries whose digest is absent from the
    /// source's digest set, except names already scheduled for copy. The
    /// executor overwrites same-named files, so a same-name content change
    /// nets to exactly one copy action; deleting after the overwrite would
    /// destroy the freshly copied file.
    #[must_use]
    pub fn between(source: &DirectorySnapshot, replica: &DirectorySnapshot) -> Self {
        let replica_digests = replica.digest_set();
        let source_digests = source.digest_set();

        let copy: Vec<FileEntry> = source
            .entries()
            .iter()
            .filter(|entry| !replica_digests.contains(&entry.digest()))
            .cloned()
            .collect();

        let copy_names: HashSet<&OsStr> = copy.iter().map(FileEntry::name).collect();

        let delete: Vec<FileEntry> = replica
            .entries()
            .iter()
            .filter(|entry| {
                !source_digests.contains(&entry.digest()) && !copy_names.contains(entry.name())
            })
            .cloned()
            .collect();

        Self { copy, delete }
    }

    /// Entries to copy from the source into the replica, in snapshot order.
    #[must_use]
    pub fn copies(&self) -> &[FileEntry] {
        &self.copy
    }

    /// Entries to remove from the replica, in snapshot order.
    #[must_use]
    pub fn deletes(&self) -> &[FileEntry] {
        &self.delete
    }

    /// Reports whether the plan contains no work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copy.is_empty() && self.delete.is_empty()
    }
}
