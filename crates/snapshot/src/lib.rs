#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `snapshot` captures the point-in-time state of a single directory level:
//! the immediate entries of a root and the content digest of each. The
//! mirroring engine diffs two snapshots (source and replica) to decide what
//! to copy and what to remove, so a snapshot is taken fresh on every pass,
//! never mutated afterwards, and discarded when the pass ends.
//!
//! # Design
//!
//! - [`DirectorySnapshot::capture`] lists one directory level only. Entries
//!   are sorted lexicographically by name before hashing so the snapshot
//!   (and everything derived from it) has a deterministic order across
//!   platforms.
//! - [`FileEntry`] pairs an entry name (a single path segment, never a
//!   nested path) with its [`ContentDigest`].
//! - [`SnapshotError`] reports a root listing that fails outright. Failures
//!   scoped to one entry do not fail the capture: an entry whose digest
//!   cannot be computed is logged and skipped so the rest of the pass still
//!   proceeds, and subdirectory entries are skipped because a flat,
//!   content-addressed mirror has no digest to assign them.
//!
//! # Invariants
//!
//! - Entry names within one snapshot are unique (directory listing
//!   semantics).
//! - Capture is read-only: it never creates, modifies, or removes anything.

use std::collections::HashSet;
use std::error::Error;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use checksums::{ContentDigest, digest_file};

/// One directory member: its name and the digest of its content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    name: OsString,
    digest: ContentDigest,
}

impl FileEntry {
    /// Creates an entry from a name and a precomputed digest.
    #[must_use]
    pub fn new(name: OsString, digest: ContentDigest) -> Self {
        Self { name, digest }
    }

    /// Returns the entry name, a single path segment relative to the root.
    #[must_use]
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Returns the digest of the entry's content.
    #[must_use]
    pub const fn digest(&self) -> ContentDigest {
        self.digest
    }
}

/// Immutable record of one directory's immediate entries and their digests.
#[derive(Clone, Debug)]
pub struct DirectorySnapshot {
    root: PathBuf,
    entries: Vec<FileEntry>,
}

impl DirectorySnapshot {
    /// Captures the current state of the directory at `root`.
    ///
    /// Lists the immediate entries only, sorts them by name, and digests
    /// each via [`checksums::digest_file`]. Entries whose digest cannot be
    /// computed (including subdirectories, which have no content digest in
    /// the flat model) are skipped with a warning rather than failing the
    /// capture.
    pub fn capture(root: &Path) -> Result<Self, SnapshotError> {
        let read_dir =
            fs::read_dir(root).map_err(|source| SnapshotError::read_dir(root, source))?;

        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| SnapshotError::read_dir_entry(root, source))?;
            names.push(entry.file_name());
        }
        names.sort();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let path = root.join(&name);
            if path.is_dir() {
                tracing::warn!(
                    entry = %path.display(),
                    "skipping subdirectory: flat mirroring has no digest for directories"
                );
                continue;
            }
            match digest_file(&path) {
                Ok(digest) => entries.push(FileEntry::new(name, digest)),
                Err(error) => {
                    tracing::warn!(entry = %path.display(), %error, "skipping unreadable entry");
                }
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// Creates an empty snapshot for a root that does not exist yet.
    ///
    /// Used for the replica side before its first pass; the executor is
    /// responsible for creating the directory itself.
    #[must_use]
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            entries: Vec::new(),
        }
    }

    /// Returns the root path the snapshot was taken from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the captured entries in name order.
    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Collects the set of digests present in the snapshot.
    #[must_use]
    pub fn digest_set(&self) -> HashSet<ContentDigest> {
        self.entries.iter().map(FileEntry::digest).collect()
    }

    /// Number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the snapshot captured no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Error returned when a directory cannot be captured.
#[derive(Debug)]
pub struct SnapshotError {
    kind: SnapshotErrorKind,
}

impl SnapshotError {
    fn read_dir(path: &Path, source: io::Error) -> Self {
        Self {
            kind: SnapshotErrorKind::ReadDir {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    fn read_dir_entry(path: &Path, source: io::Error) -> Self {
        Self {
            kind: SnapshotErrorKind::ReadDirEntry {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Returns the specific failure that aborted the capture.
    #[must_use]
    pub fn kind(&self) -> &SnapshotErrorKind {
        &self.kind
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SnapshotErrorKind::ReadDir { path, source } => {
                write!(
                    f,
                    "failed to list directory '{}': {}",
                    path.display(),
                    source
                )
            }
            SnapshotErrorKind::ReadDirEntry { path, source } => {
                write!(
                    f,
                    "failed to read entry in '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            SnapshotErrorKind::ReadDir { source, .. }
            | SnapshotErrorKind::ReadDirEntry { source, .. } => Some(source),
        }
    }
}

/// Classification of capture failures.
#[derive(Debug)]
pub enum SnapshotErrorKind {
    /// The root directory could not be listed.
    ReadDir {
        /// Directory whose contents could not be read.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// A directory entry could not be obtained during iteration.
    ReadDirEntry {
        /// Directory containing the problematic entry.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksums::Md5;
    use std::fs;

    #[test]
    fn capture_fails_when_root_is_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("absent");

        let error = DirectorySnapshot::capture(&missing).expect_err("missing root should fail");
        assert!(matches!(error.kind(), SnapshotErrorKind::ReadDir { .. }));
    }

    #[test]
    fn capture_lists_entries_in_name_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("c.txt"), b"c").expect("write c");
        fs::write(temp.path().join("a.txt"), b"a").expect("write a");
        fs::write(temp.path().join("b.txt"), b"b").expect("write b");

        let snapshot = DirectorySnapshot::capture(temp.path()).expect("capture");
        let names: Vec<_> = snapshot
            .entries()
            .iter()
            .map(|entry| entry.name().to_os_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn capture_records_content_digests() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("payload.txt"), b"payload bytes").expect("write");

        let snapshot = DirectorySnapshot::capture(temp.path()).expect("capture");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries()[0].digest(), Md5::digest(b"payload bytes"));
        assert_eq!(snapshot.root(), temp.path());
    }

    #[test]
    fn capture_skips_subdirectories() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("nested")).expect("mkdir");
        fs::write(temp.path().join("file.txt"), b"data").expect("write");

        let snapshot = DirectorySnapshot::capture(temp.path()).expect("capture");
        let names: Vec<_> = snapshot
            .entries()
            .iter()
            .map(|entry| entry.name().to_os_string())
            .collect();
        assert_eq!(names, vec!["file.txt"]);
    }

    #[test]
    fn empty_snapshot_has_no_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let snapshot = DirectorySnapshot::empty(temp.path());
        assert!(snapshot.is_empty());
        assert!(snapshot.digest_set().is_empty());
        assert_eq!(snapshot.root(), temp.path());
    }

    #[test]
    fn digest_set_deduplicates_identical_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("one.txt"), b"same").expect("write one");
        fs::write(temp.path().join("two.txt"), b"same").expect("write two");

        let snapshot = DirectorySnapshot::capture(temp.path()).expect("capture");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.digest_set().len(), 1);
    }
}
