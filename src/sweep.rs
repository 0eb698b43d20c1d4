//! Retention sweeping.
//!
//! A sweep looks at a directory's immediate children and removes those whose
//! last-access time is older than the retention window. The sweep is strictly
//! best-effort: any problem probing or removing a single entry skips that
//! entry and the sweep carries on. Only an unreadable root fails the call.
//!
//! Sweeps take no lock. Minute-granularity thresholds keep them from racing
//! allocations, which hold a fresh entry for mere milliseconds before
//! claiming it.

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::{debug, info, trace};

use crate::delete;
use crate::errors::Result;
use crate::util::classify_io;

/// Outcome of one sweep pass. `skipped` records entries the sweep could not
/// probe or remove, with the reason; per the best-effort contract these are
/// reported, never raised.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub kept: usize,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Remove immediate subfolders of `root` whose last-access age exceeds
/// `minutes_to_keep`. Stale folders are deleted whole, not file by file.
pub fn sweep_folders(root: &Path, minutes_to_keep: u64) -> Result<SweepReport> {
    sweep(root, minutes_to_keep, EntryKind::Folder)
}

/// Remove flat files directly under `root` whose last-access age exceeds
/// `minutes_to_keep`.
pub fn sweep_files(root: &Path, minutes_to_keep: u64) -> Result<SweepReport> {
    sweep(root, minutes_to_keep, EntryKind::File)
}

#[derive(Clone, Copy)]
enum EntryKind {
    File,
    Folder,
}

fn sweep(root: &Path, minutes_to_keep: u64, kind: EntryKind) -> Result<SweepReport> {
    let entries = fs::read_dir(root).map_err(|e| classify_io(root, e))?;
    let now = FileTime::now();
    let mut report = SweepReport::default();

    for entry in entries {
        // A vanished or unreadable entry is a skip, not a failure.
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                report.skipped.push(SkippedEntry {
                    path: root.to_path_buf(),
                    reason: format!("unreadable directory entry: {e}"),
                });
                continue;
            }
        };
        let path = entry.path();

        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "skipping unprobeable entry");
                report.skipped.push(SkippedEntry {
                    path,
                    reason: format!("metadata unavailable: {e}"),
                });
                continue;
            }
        };
        let wanted = match kind {
            EntryKind::File => meta.is_file(),
            EntryKind::Folder => meta.is_dir(),
        };
        if !wanted {
            continue;
        }

        let accessed = FileTime::from_last_access_time(&meta);
        // Truncated whole minutes; a future atime counts as age zero.
        let elapsed_minutes = (now.unix_seconds() - accessed.unix_seconds()).max(0) as u64 / 60;
        if elapsed_minutes <= minutes_to_keep {
            report.kept += 1;
            continue;
        }

        debug!(path = %path.display(), age_min = elapsed_minutes, keep_min = minutes_to_keep, "removing stale entry");
        let removal = match kind {
            EntryKind::File => fs::remove_file(&path).map_err(|e| e.to_string()),
            EntryKind::Folder => delete::delete_folder(&path, false)
                .map(|_| ())
                .map_err(|e| e.to_string()),
        };
        match removal {
            Ok(()) => report.removed.push(path),
            Err(reason) => {
                // One attempt per entry per sweep; a refusal is recorded
                // and the sweep moves on.
                report.skipped.push(SkippedEntry { path, reason });
            }
        }
    }

    info!(
        root = %root.display(),
        removed = report.removed.len(),
        kept = report.kept,
        skipped = report.skipped.len(),
        "sweep finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::set_file_times;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn age_entry(path: &Path, minutes: u64) {
        let then = SystemTime::now() - Duration::from_secs(minutes * 60);
        let ft = FileTime::from_system_time(then);
        set_file_times(path, ft, ft).unwrap();
    }

    #[test]
    fn stale_file_removed_fresh_kept() {
        let td = tempdir().unwrap();
        let stale = td.path().join("old.tmp");
        let fresh = td.path().join("new.tmp");
        fs::write(&stale, b"").unwrap();
        fs::write(&fresh, b"").unwrap();
        age_entry(&stale, 11);

        let report = sweep_files(td.path(), 10).unwrap();
        assert_eq!(report.removed, vec![stale.clone()]);
        assert_eq!(report.kept, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn boundary_age_is_kept() {
        let td = tempdir().unwrap();
        let edge = td.path().join("edge.tmp");
        fs::write(&edge, b"").unwrap();
        // Exactly the retention window, plus slack below the next minute:
        // truncation yields exactly `minutes_to_keep`, which strict > keeps.
        age_entry(&edge, 10);

        let report = sweep_files(td.path(), 10).unwrap();
        assert!(report.removed.is_empty());
        assert!(edge.exists());
    }

    #[test]
    fn stale_folder_removed_whole() {
        let td = tempdir().unwrap();
        let dir = td.path().join("1234567");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/f.txt"), b"x").unwrap();
        age_entry(&dir, 30);

        let report = sweep_folders(td.path(), 3).unwrap();
        assert_eq!(report.removed, vec![dir.clone()]);
        assert!(!dir.exists());
    }

    #[test]
    fn folder_sweep_ignores_files_and_vice_versa() {
        let td = tempdir().unwrap();
        let f = td.path().join("old-file.tmp");
        let d = td.path().join("old-dir");
        fs::write(&f, b"").unwrap();
        fs::create_dir(&d).unwrap();
        age_entry(&f, 60);
        age_entry(&d, 60);

        sweep_folders(td.path(), 3).unwrap();
        assert!(f.exists(), "folder sweep must not touch files");
        assert!(!d.exists());

        sweep_files(td.path(), 3).unwrap();
        assert!(!f.exists());
    }

    #[test]
    fn empty_root_sweeps_cleanly() {
        let td = tempdir().unwrap();
        let report = sweep_files(td.path(), 5).unwrap();
        assert!(report.removed.is_empty());
        assert!(report.skipped.is_empty());
        assert_eq!(report.kept, 0);
    }

    #[test]
    fn missing_root_is_an_error() {
        let td = tempdir().unwrap();
        let gone = td.path().join("nope");
        assert!(sweep_files(&gone, 5).is_err());
    }
}
