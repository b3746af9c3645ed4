#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `eventlog` is the audit channel for every mutating operation the mirror
//! performs: directory creation, file copies, and file removals. Each
//! record is formatted as a timestamped human-readable line, appended to a
//! persistent log file, and mirrored to a live console stream. Operational
//! diagnostics (skipped entries, per-file failures) travel over `tracing`
//! instead; the line format here is a compatibility contract and must not
//! pick up structured-logging decoration.
//!
//! # Design
//!
//! - [`EventLog::open`] resolves the configured log path once per session.
//!   An existing file is opened in append mode and used as-is. A missing
//!   path acts only as a name template: the actual file is
//!   `logs/<stem>_<timestamp>.txt`, and its creation is recorded as the
//!   session's first entry.
//! - The file handle is owned exclusively by the [`EventLog`] for the
//!   process lifetime. It is opened exactly once and only ever appended to;
//!   reopening (and in particular truncating) between records would
//!   silently discard history.
//! - Record lines follow the fixed format `\n <YYYY-MM-DD HH:MM:SS>:
//!   <message>`. Timestamps use local wall-clock time, falling back to UTC
//!   when the local offset cannot be determined.
//!
//! # Errors
//!
//! All constructors and record methods return [`EventLogError`]. A failed
//! log write must never be silently swallowed: callers are expected to
//! surface it on the console, which remains the fallback channel.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Directory that receives derived log files when the configured path does
/// not exist.
pub const LOGS_DIR: &str = "logs";

/// Timestamp layout shared by record lines and derived log file names.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Kind of mutating operation captured by a [`LogRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// The replica root directory was created.
    DirectoryCreated,
    /// A file was copied from the source into the replica.
    FileCopied,
    /// A file was removed from the replica.
    FileRemoved,
    /// A new log file was created for this session.
    LogCreated,
}

/// One formatted, appended audit record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    kind: EventKind,
    line: String,
}

impl LogRecord {
    /// Returns the kind of operation the record describes.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the exact line appended to the log file.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }
}

/// Errors surfaced by the audit log.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// The directory for a derived log file could not be created.
    #[error("failed to create log directory '{path}': {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// The log file could not be created or opened.
    #[error("failed to open log file '{path}': {source}")]
    Open {
        /// Log file path that failed to open.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Appending a record to the log file failed.
    #[error("failed to append to log file '{path}': {source}")]
    Write {
        /// Log file the record could not be appended to.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// The timestamp could not be formatted.
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Session-long audit log: one open file handle plus a live console mirror.
pub struct EventLog {
    path: PathBuf,
    file: File,
    console: Box<dyn Write + Send>,
}

impl EventLog {
    /// Opens the audit log for a session, mirroring records to stdout.
    ///
    /// If `template` names an existing file it is opened for appending.
    /// Otherwise the actual file is derived under [`LOGS_DIR`] from the
    /// template's stem and the current timestamp, and its creation is
    /// recorded as the first entry.
    pub fn open(template: &Path) -> Result<Self, EventLogError> {
        Self::open_in(template, Path::new(LOGS_DIR), Box::new(io::stdout()))
    }

    /// Opens the audit log with an explicit derived-log directory and
    /// console sink.
    ///
    /// `logs_dir` only matters when `template` does not exist yet; the
    /// standard entry point uses [`LOGS_DIR`] relative to the working
    /// directory.
    pub fn open_in(
        template: &Path,
        logs_dir: &Path,
        console: Box<dyn Write + Send>,
    ) -> Result<Self, EventLogError> {
        if template.exists() {
            let file = OpenOptions::new()
                .append(true)
                .open(template)
                .map_err(|source| EventLogError::Open {
                    path: template.to_path_buf(),
                    source,
                })?;
            return Ok(Self {
                path: template.to_path_buf(),
                file,
                console,
            });
        }

        let timestamp = now_timestamp()?;
        let path = derived_log_path(template, logs_dir, &timestamp);
        fs::create_dir_all(logs_dir).map_err(|source| EventLogError::CreateDir {
            path: logs_dir.to_path_buf(),
            source,
        })?;
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .map_err(|source| EventLogError::Open {
                path: path.clone(),
                source,
            })?;

        let mut log = Self {
            path,
            file,
            console,
        };
        let message = format!("New log file created: {}", log.path.display());
        log.append(EventKind::LogCreated, &timestamp, &message)?;
        Ok(log)
    }

    /// Returns the path of the file records are appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records the creation of the replica root directory.
    pub fn directory_created(&mut self, replica: &Path) -> Result<LogRecord, EventLogError> {
        let message = format!("Directory created: {}", replica.display());
        self.record(EventKind::DirectoryCreated, &message)
    }

    /// Records a completed file copy.
    pub fn file_copied(&mut self, source: &Path, replica: &Path) -> Result<LogRecord, EventLogError> {
        let message = format!("File copied: {} -> {}", source.display(), replica.display());
        self.record(EventKind::FileCopied, &message)
    }

    /// Records a completed file removal.
    pub fn file_removed(&mut self, replica: &Path) -> Result<LogRecord, EventLogError> {
        let message = format!("File removed: {}", replica.display());
        self.record(EventKind::FileRemoved, &message)
    }

    fn record(&mut self, kind: EventKind, message: &str) -> Result<LogRecord, EventLogError> {
        let timestamp = now_timestamp()?;
        self.append(kind, &timestamp, message)
    }

    fn append(
        &mut self,
        kind: EventKind,
        timestamp: &str,
        message: &str,
    ) -> Result<LogRecord, EventLogError> {
        let line = format!("\n {timestamp}: {message}");

        self.file
            .write_all(line.as_bytes())
            .map_err(|source| EventLogError::Write {
                path: self.path.clone(),
                source,
            })?;

        // Console mirroring is best-effort; a full console must not lose
        // the persisted record.
        let _ = writeln!(self.console, "{line}");
        let _ = self.console.flush();

        Ok(LogRecord { kind, line })
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        let _ = self.file.flush();
        let _ = self.console.flush();
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Builds the derived log path for a template that does not exist yet.
///
/// The template contributes only its stem: `run.txt` becomes
/// `<logs_dir>/run_<timestamp>.txt`.
#[must_use]
pub fn derived_log_path(template: &Path, logs_dir: &Path, timestamp: &str) -> PathBuf {
    let stem = template
        .file_stem()
        .map_or_else(|| "log".to_string(), |stem| stem.to_string_lossy().into_owned());
    logs_dir.join(format!("{stem}_{timestamp}.txt"))
}

fn now_timestamp() -> Result<String, EventLogError> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(now.format(&TIMESTAMP_FORMAT)?)
}
