//! Core library for `scratchfs`.
//!
//! Safe, retrying primitives for shared filesystems where other processes
//! hold locks, transient I/O failures happen, and temporary names must stay
//! collision-free without a central coordinator:
//!
//! - [`scratch`] — uniquely named temp files/folders via a serialized,
//!   bounded retry loop with a corrective sweep.
//! - [`sweep`] — best-effort eviction of stale entries by last-access age.
//! - [`delete`] — idempotent deletion with escalating fallbacks and bounded
//!   lock-release waits.
//! - [`merge`] — byte-exact concatenation of two text files with header-line
//!   handling and encoding validation.
//! - [`validate`] — pure path-validity predicates.
//! - [`archive`] — thin adapter over the external compression stack.
//!
//! All calls are synchronous and blocking on the invoking thread. Errors are
//! the typed [`ScratchError`] taxonomy; every variant names the offending
//! path.

pub mod archive;
pub mod delete;
pub mod encoding;
pub mod errors;
pub mod merge;
pub mod scratch;
pub mod sweep;
pub mod validate;

mod platform;
mod util;

pub use delete::{
    DeleteOutcome, ForceRemover, ShellForceRemover, delete_file, delete_file_with, delete_folder,
    delete_folder_with, is_file_in_use, wait_for_unlock, wait_until_writable,
};
pub use encoding::TextEncoding;
pub use errors::{Result, ScratchError};
pub use merge::{HeaderTreatment, MergeMethod, merge};
pub use scratch::{
    AllocatorOptions, ResourceKind, TEMP_FILE_EXTENSION, allocate_temp_file, allocate_temp_folder,
    allocate_with,
};
pub use sweep::{SkippedEntry, SweepReport, sweep_files, sweep_folders};
pub use validate::{is_os_restricted_path, is_valid_directory_path, is_valid_file_path};
