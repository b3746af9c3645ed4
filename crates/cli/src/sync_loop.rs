//! The polling loop that drives snapshot, reconciliation, and execution.

use std::thread;
use std::time::Duration;

use engine::{ApplyReport, EngineError, ReconciliationPlan, apply, interrupt};
use snapshot::{DirectorySnapshot, SnapshotError};

use crate::session::SyncSession;

/// Granularity at which a sleeping loop re-checks the shutdown flag.
const POLL_SLICE: Duration = Duration::from_millis(200);

/// Phases of the sync loop.
///
/// One full cycle walks `Idle → Snapshotting → Reconciling → Applying →
/// Sleeping → Idle`; `Interrupted` is terminal and reachable from every
/// state via the process-wide shutdown flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting to begin the next pass.
    Idle,
    /// Capturing the source and replica snapshots.
    Snapshotting,
    /// Computing the reconciliation plan.
    Reconciling,
    /// Executing the plan's copies and deletes.
    Applying,
    /// Pausing for the configured interval.
    Sleeping,
    /// Stop signal observed; the loop has exited.
    Interrupted,
}

/// Reasons a single pass was abandoned without applying a plan.
///
/// None of these are fatal to the loop: the iteration is skipped and the
/// next tick re-snapshots from scratch.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// The source directory could not be captured.
    #[error("source snapshot failed: {0}")]
    SourceSnapshot(#[source] SnapshotError),
    /// The replica directory exists but could not be captured.
    #[error("replica snapshot failed: {0}")]
    ReplicaSnapshot(#[source] SnapshotError),
    /// The executor could not start (replica root creation failed).
    #[error(transparent)]
    Apply(#[from] EngineError),
}

/// Drives passes on a fixed interval until a shutdown is requested.
///
/// The loop sleeps for the configured interval after each pass completes;
/// long passes therefore push subsequent ticks later rather than keeping a
/// fixed period. There is no persisted checkpoint: every pass re-diffs a
/// fresh snapshot pair, so restarting the process is always safe.
#[derive(Debug)]
pub struct SyncLoop {
    session: SyncSession,
    state: LoopState,
}

impl SyncLoop {
    /// Wraps a started session in an idle loop.
    #[must_use]
    pub fn new(session: SyncSession) -> Self {
        Self {
            session,
            state: LoopState::Idle,
        }
    }

    /// Returns the loop's current phase.
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Runs passes until the shutdown flag is observed, then exits with the
    /// loop in the [`LoopState::Interrupted`] state.
    pub fn run(&mut self) {
        loop {
            if interrupt::is_shutdown_requested() {
                break;
            }

            match self.run_once() {
                Ok(report) => {
                    if report.interrupted {
                        break;
                    }
                    if report != ApplyReport::default() {
                        tracing::info!(
                            copied = report.copied,
                            removed = report.removed,
                            failed = report.failed,
                            "pass applied"
                        );
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "pass skipped");
                }
            }

            self.state = LoopState::Sleeping;
            self.sleep_between_passes();
        }

        self.state = LoopState::Interrupted;
        tracing::info!("stop signal observed, sync ended");
    }

    /// Executes one complete pass: snapshot both roots, plan, apply.
    ///
    /// A missing replica directory is not an error; it is represented as an
    /// empty snapshot and created by the executor. Exposed separately from
    /// [`SyncLoop::run`] so a single pass can be exercised without the
    /// timer.
    pub fn run_once(&mut self) -> Result<ApplyReport, PassError> {
        self.state = LoopState::Snapshotting;
        let source =
            DirectorySnapshot::capture(self.session.source_path()).map_err(PassError::SourceSnapshot)?;
        let replica = if self.session.replica_path().exists() {
            DirectorySnapshot::capture(self.session.replica_path())
                .map_err(PassError::ReplicaSnapshot)?
        } else {
            DirectorySnapshot::empty(self.session.replica_path())
        };
        tracing::debug!(
            source_entries = source.len(),
            replica_entries = replica.len(),
            source_names = ?listing(&source),
            "snapshots captured"
        );

        self.state = LoopState::Reconciling;
        let plan = ReconciliationPlan::between(&source, &replica);

        self.state = LoopState::Applying;
        let source_root = self.session.source_path().to_path_buf();
        let replica_root = self.session.replica_path().to_path_buf();
        let report = apply(&plan, &source_root, &replica_root, self.session.log_mut())?;

        self.state = LoopState::Idle;
        Ok(report)
    }

    /// Sleeps for the configured interval in short slices so a stop signal
    /// is observed promptly instead of waiting out the full interval.
    fn sleep_between_passes(&self) {
        let mut remaining = self.session.interval();
        while !remaining.is_zero() {
            if interrupt::is_shutdown_requested() {
                return;
            }
            let slice = remaining.min(POLL_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
    }
}

/// Renders the entry names of a snapshot for the per-pass debug listing.
fn listing(snapshot: &DirectorySnapshot) -> Vec<String> {
    snapshot
        .entries()
        .iter()
        .map(|entry| entry.name().to_string_lossy().into_owned())
        .collect()
}
