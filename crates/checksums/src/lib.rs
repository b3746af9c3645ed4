#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` computes the content digests that drive the mirroring
//! algorithm. A file's digest is the MD5 of its full byte content, computed
//! by streaming the file through a [`Md5`] accumulator in fixed-size chunks
//! so memory use stays independent of file size. Two files with identical
//! bytes always produce identical digests; the digest is the sole equality
//! criterion used when diffing directories (no timestamp or size
//! heuristics).
//!
//! # Design
//!
//! - [`Md5`] wraps the streaming hasher from the `md-5` crate behind the
//!   small `new`/`update`/`finalize` surface the rest of the workspace
//!   needs.
//! - [`digest_file`] owns the chunked read loop and returns a
//!   [`ContentDigest`].
//! - [`ChecksumError`] distinguishes a file that cannot be opened from a
//!   read that fails mid-stream, carrying the offending path in both cases.
//!
//! # Invariants
//!
//! - [`digest_file`] never loads more than [`CHUNK_SIZE`] bytes of file
//!   content at a time.
//! - Digest computation has no side effects; the input file is opened
//!   read-only.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use digest::Digest;
use thiserror::Error;

/// Number of bytes read from the input file per hashing step.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Length in bytes of a [`ContentDigest`].
pub const DIGEST_LEN: usize = 16;

/// Fixed-size fingerprint of a file's full byte content.
///
/// Equal bytes imply an equal digest; collisions are treated as negligible.
/// The [`fmt::Display`] implementation renders the conventional lowercase
/// hex form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for ContentDigest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Streaming MD5 hasher.
#[derive(Clone, Default)]
pub struct Md5 {
    inner: md5::Md5,
}

impl Md5 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: md5::Md5::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the accumulator and returns the 128-bit digest.
    #[must_use]
    pub fn finalize(self) -> ContentDigest {
        let bytes: [u8; DIGEST_LEN] = self.inner.finalize().into();
        ContentDigest(bytes)
    }

    /// Convenience helper that digests an in-memory buffer in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> ContentDigest {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

impl fmt::Debug for Md5 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Md5").finish_non_exhaustive()
    }
}

/// Error returned when a file cannot be digested.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The file could not be opened for reading.
    #[error("failed to open '{path}' for hashing: {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// A read failed after the file was opened.
    #[error("failed to read '{path}' while hashing: {source}")]
    Read {
        /// Path whose content could not be read.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

/// Computes the content digest of the file at `path`.
///
/// The file is read in [`CHUNK_SIZE`] blocks and folded into a streaming
/// [`Md5`] accumulator, so arbitrarily large files hash in constant memory.
pub fn digest_file(path: &Path) -> Result<ContentDigest, ChecksumError> {
    let mut file = File::open(path).map_err(|source| ChecksumError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Md5::new();
    let mut chunk = [0_u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut chunk).map_err(|source| ChecksumError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }

    Ok(hasher.finalize())
}
