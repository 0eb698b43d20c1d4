//! Resilient deletion.
//!
//! Deletes escalate through an ordered list of strategies: a normal delete,
//! then clearing protection bits (read-only attributes / missing write
//! permission) and retrying, then the OS's native recursive force-delete as a
//! subprocess. The first strategy that works wins; the final verdict is
//! always the post-check "does the path still exist".
//!
//! Deletion is idempotent: a target that is already absent is success.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::errors::{Result, ScratchError};
use crate::platform;
use crate::util::{classify_io, ensure_not_cwd, is_busy};

/// How a successful delete concluded. The failure case is the `Err` arm of
/// the enclosing `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The resource existed and was removed.
    Deleted,
    /// The resource was already absent; nothing to do.
    AlreadyAbsent,
}

/// Last-resort removal, isolated behind a trait so tests can stub it without
/// spawning real processes.
pub trait ForceRemover {
    fn force_remove(&self, path: &Path) -> io::Result<()>;
}

/// Production remover: spawns the OS recursive force-delete command with no
/// visible window and waits for it to exit.
pub struct ShellForceRemover;

impl ForceRemover for ShellForceRemover {
    fn force_remove(&self, path: &Path) -> io::Result<()> {
        let mut cmd = platform::force_remove_command(path);
        let status = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        trace!(path = %path.display(), code = ?status.code(), "force-delete subprocess finished");
        Ok(())
    }
}

/// Delete a single file, escalating on permission/lock errors.
pub fn delete_file(path: &Path) -> Result<DeleteOutcome> {
    delete_file_with(path, &ShellForceRemover)
}

/// [`delete_file`] with an injectable force-remove strategy.
pub fn delete_file_with(path: &Path, remover: &dyn ForceRemover) -> Result<DeleteOutcome> {
    ensure_not_cwd(path)?;

    match fs::remove_file(path) {
        Ok(()) => return Ok(DeleteOutcome::Deleted),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DeleteOutcome::AlreadyAbsent),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied || is_busy(&e) => {
            debug!(path = %path.display(), error = %e, "plain delete refused; clearing protection");
        }
        Err(e) => return Err(classify_io(path, e)),
    }

    // Strategy 2: drop protection bits and retry.
    let _ = platform::clear_protection(path);
    match fs::remove_file(path) {
        Ok(()) => return Ok(DeleteOutcome::Deleted),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DeleteOutcome::AlreadyAbsent),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "delete still refused; invoking force remover");
        }
    }

    // Strategy 3: OS-level force delete. Its own errors are not decisive;
    // only the post-check below is.
    if let Err(e) = remover.force_remove(path) {
        warn!(path = %path.display(), error = %e, "force remover failed to run");
    }

    finish(path)
}

/// Delete a directory tree. With `recreate`, an empty directory is left at
/// `path` afterwards (also when the tree was already absent).
pub fn delete_folder(path: &Path, recreate: bool) -> Result<DeleteOutcome> {
    delete_folder_with(path, recreate, &ShellForceRemover)
}

/// [`delete_folder`] with an injectable force-remove strategy.
pub fn delete_folder_with(
    path: &Path,
    recreate: bool,
    remover: &dyn ForceRemover,
) -> Result<DeleteOutcome> {
    ensure_not_cwd(path)?;

    let outcome = remove_tree(path, remover)?;
    if recreate {
        fs::create_dir_all(path).map_err(|e| classify_io(path, e))?;
        debug!(path = %path.display(), "recreated empty folder after delete");
    }
    Ok(outcome)
}

fn remove_tree(path: &Path, remover: &dyn ForceRemover) -> Result<DeleteOutcome> {
    match fs::remove_dir_all(path) {
        Ok(()) => return Ok(DeleteOutcome::Deleted),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DeleteOutcome::AlreadyAbsent),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied || is_busy(&e) => {
            debug!(path = %path.display(), error = %e, "tree delete refused; clearing protection recursively");
        }
        Err(e) => return Err(classify_io(path, e)),
    }

    // Strategy 2: walk the tree top-down clearing protection bits, then retry.
    // Per-entry failures here are fine; the retry decides.
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        let _ = platform::clear_protection(entry.path());
    }
    match fs::remove_dir_all(path) {
        Ok(()) => return Ok(DeleteOutcome::Deleted),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DeleteOutcome::AlreadyAbsent),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "tree delete still refused; invoking force remover");
        }
    }

    if let Err(e) = remover.force_remove(path) {
        warn!(path = %path.display(), error = %e, "force remover failed to run");
    }

    finish(path)
}

/// Post-escalation verdict: success iff the path is gone.
fn finish(path: &Path) -> Result<DeleteOutcome> {
    if fs::symlink_metadata(path).is_err() {
        Ok(DeleteOutcome::Deleted)
    } else {
        Err(ScratchError::DeleteFailed(path.to_path_buf()))
    }
}

/// Probe whether another handle currently holds `path`. The probe opens the
/// file and attempts an exclusive advisory lock; a missing file is not in use.
pub fn is_file_in_use(path: &Path) -> bool {
    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(f) => {
            if f.try_lock_exclusive().is_ok() {
                let _ = FileExt::unlock(&f);
                false
            } else {
                true
            }
        }
        Err(e) => e.kind() == io::ErrorKind::PermissionDenied || is_busy(&e),
    }
}

/// Poll once per second until `path` is no longer held or `timeout_secs`
/// elapses. Timeout is a normal outcome, reported as `false`, never an error.
pub fn wait_for_unlock(path: &Path, timeout_secs: u64) -> bool {
    wait_until(path, timeout_secs, |p| !is_file_in_use(p))
}

/// Poll once per second until `path` can be opened for writing or
/// `timeout_secs` elapses.
pub fn wait_until_writable(path: &Path, timeout_secs: u64) -> bool {
    wait_until(path, timeout_secs, |p| {
        OpenOptions::new().append(true).open(p).is_ok()
    })
}

fn wait_until(path: &Path, timeout_secs: u64, ready: impl Fn(&Path) -> bool) -> bool {
    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    loop {
        if ready(path) {
            return true;
        }
        if start.elapsed() >= timeout {
            debug!(path = %path.display(), timeout_secs, "wait elapsed; still held");
            return false;
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}
