//! Applies a reconciliation plan to the replica directory.

use std::fs;
use std::io;
use std::path::Path;

use eventlog::EventLog;
use filetime::FileTime;

use crate::error::{EngineError, EngineResult};
use crate::interrupt;
use crate::plan::ReconciliationPlan;

/// Outcome of one executed pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Whether the replica root had to be created this pass.
    pub created_replica_root: bool,
    /// Number of files successfully copied into the replica.
    pub copied: usize,
    /// Number of files successfully removed from the replica.
    pub removed: usize,
    /// Number of plan entries that failed and were skipped.
    pub failed: usize,
    /// Whether the pass stopped early because a shutdown was requested.
    pub interrupted: bool,
}

/// Executes `plan` against the filesystem.
///
/// Creates `replica_root` (recursively) if it does not exist, then performs
/// the plan's copies and deletes. Copies transfer the file bytes and
/// propagate access/modification times; existing same-named replica files
/// are overwritten. Every successful action emits exactly one audit record;
/// a failed entry emits none, is reported on the diagnostic channel, and
/// does not stop the remaining entries. The shutdown flag is polled between
/// file operations, so an interrupt finishes the in-flight operation and
/// halts before the next.
///
/// The only fatal error is a replica root that cannot be created; without
/// it no plan entry can execute.
pub fn apply(
    plan: &ReconciliationPlan,
    source_root: &Path,
    replica_root: &Path,
    log: &mut EventLog,
) -> EngineResult<ApplyReport> {
    let mut report = ApplyReport::default();

    if !replica_root.exists() {
        fs::create_dir_all(replica_root).map_err(|source| EngineError::CreateReplicaRoot {
            path: replica_root.to_path_buf(),
            source,
        })?;
        report.created_replica_root = true;
        record_or_warn(log.directory_created(replica_root));
    }

    for entry in plan.copies() {
        if interrupt::is_shutdown_requested() {
            report.interrupted = true;
            return Ok(report);
        }

        let source_path = source_root.join(entry.name());
        let replica_path = replica_root.join(entry.name());
        match copy_with_times(&source_path, &replica_path) {
            Ok(()) => {
                report.copied += 1;
                record_or_warn(log.file_copied(&source_path, &replica_path));
            }
            Err(error) => {
                report.failed += 1;
                tracing::warn!(
                    source = %source_path.display(),
                    replica = %replica_path.display(),
                    %error,
                    "copy failed, skipping entry"
                );
            }
        }
    }

    for entry in plan.deletes() {
        if interrupt::is_shutdown_requested() {
            report.interrupted = true;
            return Ok(report);
        }

        let replica_path = replica_root.join(entry.name());
        match fs::remove_file(&replica_path) {
            Ok(()) => {
                report.removed += 1;
                record_or_warn(log.file_removed(&replica_path));
            }
            Err(error) => {
                report.failed += 1;
                tracing::warn!(
                    replica = %replica_path.display(),
                    %error,
                    "removal failed, skipping entry"
                );
            }
        }
    }

    Ok(report)
}

/// Copies file bytes and propagates access/modification times.
///
/// A failed timestamp propagation is downgraded to a warning: the content
/// has converged, which is what the next pass's digests observe.
fn copy_with_times(source: &Path, replica: &Path) -> io::Result<()> {
    fs::copy(source, replica)?;

    match fs::metadata(source) {
        Ok(metadata) => {
            let accessed = FileTime::from_last_access_time(&metadata);
            let modified = FileTime::from_last_modification_time(&metadata);
            if let Err(error) = filetime::set_file_times(replica, accessed, modified) {
                tracing::warn!(
                    replica = %replica.display(),
                    %error,
                    "copied content but could not propagate timestamps"
                );
            }
        }
        Err(error) => {
            tracing::warn!(
                source = %source.display(),
                %error,
                "copied content but could not read source timestamps"
            );
        }
    }

    Ok(())
}

/// A lost audit record must not abort the action that already succeeded;
/// the diagnostic channel is the console fallback.
fn record_or_warn<T>(result: Result<T, eventlog::EventLogError>) {
    if let Err(error) = result {
        tracing::warn!(%error, "failed to write audit record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use snapshot::DirectorySnapshot;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedConsole(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedConsole {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("console lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        source: std::path::PathBuf,
        replica: std::path::PathBuf,
        log_path: std::path::PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::tempdir().expect("tempdir");
            let source = temp.path().join("source");
            let replica = temp.path().join("replica");
            let log_path = temp.path().join("audit.txt");
            fs::create_dir(&source).expect("mkdir source");
            fs::write(&log_path, "").expect("seed log");
            Self {
                _temp: temp,
                source,
                replica,
                log_path,
            }
        }

        fn log(&self) -> EventLog {
            EventLog::open_in(
                &self.log_path,
                Path::new("unused-logs"),
                Box::new(SharedConsole::default()),
            )
            .expect("open log")
        }

        fn log_contents(&self) -> String {
            fs::read_to_string(&self.log_path).expect("read log")
        }

        fn plan(&self) -> ReconciliationPlan {
            let source = DirectorySnapshot::capture(&self.source).expect("capture source");
            let replica = if self.replica.exists() {
                DirectorySnapshot::capture(&self.replica).expect("capture replica")
            } else {
                DirectorySnapshot::empty(&self.replica)
            };
            ReconciliationPlan::between(&source, &replica)
        }
    }

    #[test]
    #[serial]
    fn copies_new_file_and_logs_one_record() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");
        fs::write(fixture.source.join("a.txt"), b"alpha").expect("write");

        let mut log = fixture.log();
        let report =
            apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        assert_eq!(report.copied, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(report.failed, 0);
        assert!(!report.created_replica_root);
        assert_eq!(
            fs::read(fixture.replica.join("a.txt")).expect("read replica"),
            b"alpha"
        );

        let contents = fixture.log_contents();
        assert_eq!(contents.matches("File copied:").count(), 1);
    }

    #[test]
    #[serial]
    fn creates_missing_replica_root_before_copying() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::write(fixture.source.join("a.txt"), b"alpha").expect("write");

        let mut log = fixture.log();
        let report =
            apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        assert!(report.created_replica_root);
        assert_eq!(report.copied, 1);
        assert!(fixture.replica.join("a.txt").exists());

        let contents = fixture.log_contents();
        let created_at = contents.find("Directory created:").expect("created record");
        let copied_at = contents.find("File copied:").expect("copied record");
        assert!(
            created_at < copied_at,
            "directory creation must be logged before any copy"
        );
    }

    #[test]
    #[serial]
    fn removes_stale_file_and_logs_one_record() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");
        fs::write(fixture.replica.join("old.txt"), b"stale").expect("write");

        let mut log = fixture.log();
        let report =
            apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        assert_eq!(report.removed, 1);
        assert!(!fixture.replica.join("old.txt").exists());
        assert_eq!(fixture.log_contents().matches("File removed:").count(), 1);
    }

    #[test]
    #[serial]
    fn overwrites_same_named_file_with_source_content() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");
        fs::write(fixture.source.join("a.txt"), b"new content").expect("write source");
        fs::write(fixture.replica.join("a.txt"), b"old content").expect("write replica");

        let mut log = fixture.log();
        let report =
            apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        assert_eq!(report.copied, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(
            fs::read(fixture.replica.join("a.txt")).expect("read replica"),
            b"new content"
        );
    }

    #[test]
    #[serial]
    fn copy_preserves_modification_time() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");
        let source_file = fixture.source.join("a.txt");
        fs::write(&source_file, b"alpha").expect("write");
        let mtime = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&source_file, mtime).expect("set mtime");

        let mut log = fixture.log();
        apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        let replica_meta = fs::metadata(fixture.replica.join("a.txt")).expect("metadata");
        assert_eq!(FileTime::from_last_modification_time(&replica_meta), mtime);
    }

    #[test]
    #[serial]
    fn failed_entry_is_skipped_and_remaining_entries_still_execute() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");
        fs::write(fixture.source.join("a.txt"), b"alpha").expect("write a");
        fs::write(fixture.source.join("b.txt"), b"beta").expect("write b");

        let plan = fixture.plan();
        // Make the first copy fail after planning.
        fs::remove_file(fixture.source.join("a.txt")).expect("remove a");

        let mut log = fixture.log();
        let report = apply(&plan, &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        assert_eq!(report.failed, 1);
        assert_eq!(report.copied, 1);
        assert!(fixture.replica.join("b.txt").exists());
        // A failed entry produces zero audit records.
        assert_eq!(fixture.log_contents().matches("File copied:").count(), 1);
    }

    // /dev/full accepts the open but fails every write, so each audit
    // record is lost while the file operations themselves succeed.
    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn lost_audit_record_does_not_abort_the_apply() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");
        fs::write(fixture.source.join("a.txt"), b"alpha").expect("write a");
        fs::write(fixture.source.join("b.txt"), b"beta").expect("write b");

        let mut log = EventLog::open_in(
            Path::new("/dev/full"),
            Path::new("unused-logs"),
            Box::new(SharedConsole::default()),
        )
        .expect("open log");
        let report =
            apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        assert_eq!(report.copied, 2);
        assert_eq!(report.failed, 0);
        assert!(fixture.replica.join("a.txt").exists());
        assert!(fixture.replica.join("b.txt").exists());
    }

    #[test]
    #[serial]
    fn requested_shutdown_stops_before_the_next_operation() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");
        fs::write(fixture.source.join("a.txt"), b"alpha").expect("write");

        interrupt::request_shutdown();
        let mut log = fixture.log();
        let report =
            apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);
        interrupt::reset_for_testing();

        assert!(report.interrupted);
        assert_eq!(report.copied, 0);
        assert!(!fixture.replica.join("a.txt").exists());
    }

    #[test]
    #[serial]
    fn empty_plan_applies_cleanly() {
        interrupt::reset_for_testing();
        let fixture = Fixture::new();
        fs::create_dir(&fixture.replica).expect("mkdir replica");

        let mut log = fixture.log();
        let report =
            apply(&fixture.plan(), &fixture.source, &fixture.replica, &mut log).expect("apply");
        drop(log);

        assert_eq!(report, ApplyReport::default());
        assert_eq!(fixture.log_contents(), "");
    }
}
