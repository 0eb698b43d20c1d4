//! Temporary resource allocation.
//!
//! `allocate_with` creates a uniquely named empty file or folder under a root
//! directory. The whole check-then-create loop runs under one process-wide
//! mutex, so two threads never race on the same candidate; cross-process
//! races on the same root are absorbed by treating a lost `create_new` as
//! just another collision. Randomized names plus bounded retries are the only
//! cross-process collision resistance, which is why the loop never assumes an
//! empty namespace.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::errors::{Result, ScratchError};
use crate::sweep;
use crate::util::{classify_io, ensure_not_cwd};

/// Extension given to allocated temp files.
pub const TEMP_FILE_EXTENSION: &str = "tmp";

/// What kind of resource to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Folder,
}

/// Retry-loop tunables. The defaults mirror long-standing behavior (50
/// attempts, one corrective sweep halfway with a 3-minute window); none of
/// them is load-bearing and callers may tune freely.
#[derive(Debug, Clone)]
pub struct AllocatorOptions {
    /// Hard bound on name-collision retries.
    pub max_attempts: u32,
    /// Attempt count at which a single corrective sweep runs.
    pub sweep_trigger_attempt: u32,
    /// Retention window handed to that sweep, in minutes.
    pub sweep_retention_minutes: u64,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            sweep_trigger_attempt: 25,
            sweep_retention_minutes: 3,
        }
    }
}

// One allocation sequence at a time per process; held for the full loop,
// including any triggered sweep.
static ALLOC_LOCK: Mutex<()> = Mutex::new(());

/// Allocate an empty, uniquely named temp file under `root`.
pub fn allocate_temp_file(root: &Path) -> Result<PathBuf> {
    allocate_with(root, ResourceKind::File, &AllocatorOptions::default())
}

/// Allocate an empty, uniquely named temp folder under `root`.
pub fn allocate_temp_folder(root: &Path) -> Result<PathBuf> {
    allocate_with(root, ResourceKind::Folder, &AllocatorOptions::default())
}

/// Allocate a temp resource with explicit tunables.
///
/// The returned path denotes a newly created, empty resource owned by the
/// caller until released. Fails fast, before any I/O, when `root` is invalid
/// or is (or contains) the current working directory.
pub fn allocate_with(root: &Path, kind: ResourceKind, opts: &AllocatorOptions) -> Result<PathBuf> {
    let _guard = ALLOC_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if root.as_os_str().is_empty() {
        return Err(ScratchError::invalid("", "root folder must be non-empty"));
    }
    let root = std::path::absolute(root).map_err(|e| classify_io(root, e))?;
    if !root.is_dir() {
        return Err(ScratchError::NotFound(root));
    }
    ensure_not_cwd(&root)?;

    let mut rng = rand::thread_rng();
    let mut attempt: u32 = 0;
    let mut swept = false;

    while attempt < opts.max_attempts {
        let n: i32 = rng.gen_range(0..=i32::MAX);
        let candidate = match kind {
            ResourceKind::File => root.join(format!("{n}.{TEMP_FILE_EXTENSION}")),
            ResourceKind::Folder => root.join(n.to_string()),
        };

        if candidate.exists() {
            attempt += 1;
            debug!(candidate = %candidate.display(), attempt, "temp name collision");
            maybe_sweep(&root, kind, opts, attempt, &mut swept);
            continue;
        }

        match claim(&candidate, kind) {
            Ok(()) => {
                info!(path = %candidate.display(), attempt, "allocated temp resource");
                return Ok(candidate);
            }
            // Lost a cross-process race between the exists() check and the
            // create; this is just another collision.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
                debug!(candidate = %candidate.display(), attempt, "lost creation race");
                maybe_sweep(&root, kind, opts, attempt, &mut swept);
            }
            Err(e) => return Err(classify_io(&candidate, e)),
        }
    }

    Err(ScratchError::ResourceExhausted {
        root,
        attempts: opts.max_attempts,
    })
}

fn claim(candidate: &Path, kind: ResourceKind) -> io::Result<()> {
    match kind {
        ResourceKind::File => OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(candidate)
            .map(|_| ()),
        ResourceKind::Folder => fs::create_dir(candidate),
    }
}

/// Corrective sweep, run once per allocation when collisions pile up.
fn maybe_sweep(
    root: &Path,
    kind: ResourceKind,
    opts: &AllocatorOptions,
    attempt: u32,
    swept: &mut bool,
) {
    if *swept || attempt != opts.sweep_trigger_attempt {
        return;
    }
    *swept = true;
    warn!(
        root = %root.display(),
        attempt,
        keep_min = opts.sweep_retention_minutes,
        "collision retries piling up; sweeping stale entries"
    );
    let outcome = match kind {
        ResourceKind::File => sweep::sweep_files(root, opts.sweep_retention_minutes),
        ResourceKind::Folder => sweep::sweep_folders(root, opts.sweep_retention_minutes),
    };
    // The sweep is a mitigation, not a requirement; the loop continues
    // regardless of how it went.
    if let Err(e) = outcome {
        warn!(root = %root.display(), error = %e, "corrective sweep failed");
    }
}
