#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `engine` holds the substance of the mirror: deciding what to copy and
//! what to remove, and carrying those decisions out. The decision step is a
//! pure set-difference over content digests ([`ReconciliationPlan`]); the
//! execution step ([`apply`]) performs the copies and deletes, creates the
//! replica root when it is missing, and emits one audit record per
//! successful mutation.
//!
//! # Design
//!
//! - Planning and execution are strictly separated. A plan is a pure
//!   function of two completed snapshots and performs no I/O; execution
//!   consumes the plan and touches the filesystem.
//! - Presence is judged by digest alone, never by name. A
//!   renamed-but-identical file counts as already mirrored and produces no
//!   work; a "moved" file is always expressed as copy-new-name plus
//!   delete-old-name, never detected as a rename.
//! - Execution isolates failures at the granularity of one plan entry: a
//!   file that cannot be copied or removed is reported and skipped while
//!   the rest of the plan still runs.
//! - The [`interrupt`] module provides the process-wide shutdown flag the
//!   executor polls between file operations, so a stop signal completes the
//!   in-flight operation and halts before the next one.

mod error;
mod executor;
pub mod interrupt;
mod plan;

pub use error::{EngineError, EngineResult};
pub use executor::{ApplyReport, apply};
pub use plan::ReconciliationPlan;
