#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the thin front-end of the mirror: it recognises the four
//! mandatory switches (`--source_path`, `--replica_path`, `--interval`,
//! `--log_file`), validates the configuration, and hands control to the
//! [`SyncLoop`], which repeats snapshot → reconcile → apply passes until
//! the process receives a stop signal.
//!
//! # Design
//!
//! The crate exposes [`run`] as the primary entry point. The function
//! accepts an iterator of arguments, mirroring how the binary forwards
//! `std::env::args_os`, and returns the process exit code. A
//! [`clap`](https://docs.rs/clap/) command definition performs the parse;
//! argument failures print clap's diagnostic and exit with its usage code.
//! Validation failures detected after parsing (a nonexistent source
//! directory, an unopenable audit log) exit with code 1.
//!
//! # Invariants
//!
//! - [`run`] never panics; every failure surfaces as a diagnostic plus a
//!   non-zero exit code.
//! - Fatal conditions are exhausted before the loop starts. Once the loop
//!   runs, only an external stop signal ends the process, and that path
//!   exits 0.
//! - Operational diagnostics travel over `tracing` to stderr; the audit
//!   log and its stdout mirror are owned by the session's
//!   [`eventlog::EventLog`] and keep their fixed line format.

mod session;
mod sync_loop;

pub use session::{SessionConfig, SessionError, SyncSession};
pub use sync_loop::{LoopState, PassError, SyncLoop};

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgMatches, Command};
use engine::interrupt;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration failures detected after argument parsing.
const CONFIG_ERROR_CODE: i32 = 1;

/// Builds the argument definition for the `dirmirror` binary.
#[must_use]
pub fn command() -> Command {
    Command::new("dirmirror")
        .about("Periodically mirrors a source directory into a replica, deciding by content hash")
        .arg(
            Arg::new("source_path")
                .long("source_path")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true)
                .help("Path to the source directory"),
        )
        .arg(
            Arg::new("replica_path")
                .long("replica_path")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true)
                .help("Path to the replica directory (created if absent)"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .required(true)
                .help("Seconds to pause between synchronization passes"),
        )
        .arg(
            Arg::new("log_file")
                .long("log_file")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true)
                .help("Audit log path; a missing path is used as a name template under logs/"),
        )
}

/// Extracts the parsed configuration from clap's matches.
fn config_from(matches: &ArgMatches) -> SessionConfig {
    // All four arguments are declared required, so the defaults below are
    // unreachable.
    SessionConfig {
        source_path: matches.get_one::<PathBuf>("source_path").cloned().unwrap_or_default(),
        replica_path: matches.get_one::<PathBuf>("replica_path").cloned().unwrap_or_default(),
        interval: Duration::from_secs(matches.get_one::<u64>("interval").copied().unwrap_or_default()),
        log_file: matches.get_one::<PathBuf>("log_file").cloned().unwrap_or_default(),
    }
}

/// Parses arguments, starts a session, and runs the sync loop to
/// completion.
///
/// Returns the process exit code: clap's usage code for argument errors,
/// 1 for configuration failures, 0 when the loop ends on a stop signal.
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };

    init_tracing();

    let session = match SyncSession::start(config_from(&matches)) {
        Ok(session) => session,
        Err(error) => {
            eprintln!("dirmirror: {error}");
            return CONFIG_ERROR_CODE;
        }
    };

    if let Err(error) = interrupt::install_signal_handlers() {
        tracing::warn!(%error, "failed to install signal handlers; stop signals may not be graceful");
    }

    tracing::info!(
        source = %session.source_path().display(),
        replica = %session.replica_path().display(),
        interval_secs = session.interval().as_secs(),
        "starting sync loop"
    );

    let mut sync_loop = SyncLoop::new(session);
    sync_loop.run();
    0
}

/// Initialises the stderr diagnostic subscriber.
///
/// `RUST_LOG` controls the filter; the default keeps pass summaries and
/// warnings visible. Repeated initialisation (tests) is tolerated.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
