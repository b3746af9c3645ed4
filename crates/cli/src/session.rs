//! Process-wide session state: validated configuration plus the open audit
//! log.

use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eventlog::{EventLog, EventLogError};

/// Raw configuration gathered from the command line.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Directory to mirror from.
    pub source_path: PathBuf,
    /// Directory to mirror into.
    pub replica_path: PathBuf,
    /// Pause between passes.
    pub interval: Duration,
    /// Audit log path template.
    pub log_file: PathBuf,
}

/// Validated, process-lifetime state for one mirroring session.
///
/// Initialised once at startup and torn down only when the process stops;
/// the audit log handle it owns is flushed on drop. Source and replica
/// paths are absolutized so audit records stay unambiguous regardless of
/// the working directory.
pub struct SyncSession {
    source_path: PathBuf,
    replica_path: PathBuf,
    interval: Duration,
    log: EventLog,
}

impl SyncSession {
    /// Validates `config` and opens the session's audit log.
    ///
    /// The source directory must already exist; the replica directory is
    /// created later by the executor if needed.
    pub fn start(config: SessionConfig) -> Result<Self, SessionError> {
        let source_path = absolutize(&config.source_path)?;
        if !source_path.is_dir() {
            return Err(SessionError::SourceMissing { path: source_path });
        }
        let replica_path = absolutize(&config.replica_path)?;

        let log = EventLog::open(&config.log_file)?;

        Ok(Self {
            source_path,
            replica_path,
            interval: config.interval,
            log,
        })
    }

    /// Returns the absolute source directory.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the absolute replica directory.
    #[must_use]
    pub fn replica_path(&self) -> &Path {
        &self.replica_path
    }

    /// Returns the configured pause between passes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Mutable access to the session's audit log.
    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }
}

impl fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSession")
            .field("source_path", &self.source_path)
            .field("replica_path", &self.replica_path)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Fatal configuration failures detected before the loop starts.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The source directory does not exist (or is not a directory).
    #[error("source path '{path}' does not exist or is not a directory")]
    SourceMissing {
        /// The offending source path.
        path: PathBuf,
    },
    /// The working directory could not be determined while absolutizing a
    /// relative path.
    #[error("failed to resolve current working directory: {0}")]
    CurrentDir(#[from] io::Error),
    /// The audit log could not be opened.
    #[error(transparent)]
    Log(#[from] EventLogError),
}

fn absolutize(path: &Path) -> Result<PathBuf, SessionError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
