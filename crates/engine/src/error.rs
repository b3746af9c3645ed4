//! Common error types for the engine crate.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a whole pass rather than a single plan entry.
#[derive(Debug)]
pub enum EngineError {
    /// The replica root directory could not be created.
    CreateReplicaRoot {
        /// Replica root that could not be created.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateReplicaRoot { path, source } => {
                write!(
                    f,
                    "failed to create replica root '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateReplicaRoot { source, .. } => Some(source),
        }
    }
}
