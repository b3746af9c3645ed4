//! Process-wide shutdown flag and signal handler installation.
//!
//! Signal handlers must be async-signal-safe, so they only set an atomic
//! flag and do no allocation or locking. The sync loop polls the flag at
//! state boundaries and the executor polls it between individual file
//! operations; the in-flight operation is always completed, never
//! abandoned.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set on the first stop signal (or programmatic request).
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Requests a graceful shutdown.
///
/// Called from signal handlers and from code that wants to stop the loop
/// programmatically. Once set, the flag stays set for the process lifetime.
#[inline]
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Checks whether a shutdown has been requested.
#[inline]
#[must_use]
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Resets the flag. Only meaningful in tests; production code never clears
/// a requested shutdown.
#[doc(hidden)]
pub fn reset_for_testing() {
    SHUTDOWN_REQUESTED.store(false, Ordering::SeqCst);
}

#[cfg(unix)]
mod imp {
    #![allow(unsafe_code)]

    use std::io;

    extern "C" fn handle_stop_signal(_signum: libc::c_int) {
        super::request_shutdown();
    }

    /// Installs SIGINT and SIGTERM handlers that request a graceful
    /// shutdown.
    pub fn install_signal_handlers() -> io::Result<()> {
        for signum in [libc::SIGINT, libc::SIGTERM] {
            // SAFETY: the handler only performs an atomic store, which is
            // async-signal-safe. The sigaction structs are fully
            // initialised before being passed to libc.
            unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction = handle_stop_signal as libc::sighandler_t;
                action.sa_flags = libc::SA_RESTART;
                libc::sigemptyset(&raw mut action.sa_mask);

                if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;

    /// No-op on platforms without Unix signals; shutdown can still be
    /// requested programmatically.
    pub fn install_signal_handlers() -> io::Result<()> {
        Ok(())
    }
}

pub use imp::install_signal_handlers;
