use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ScratchError};

/// Canonicalize with a fallback to the original path when the target does not
/// exist yet. `dunce` avoids UNC-prefixed results on Windows.
pub(crate) fn canonical_or_self(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Refuse to operate on a path that is, or contains, the current working
/// directory. Guards the allocator and deleter against wiping the process's
/// own execution context.
pub(crate) fn ensure_not_cwd(path: &Path) -> Result<()> {
    let cwd = std::env::current_dir().map_err(|e| ScratchError::Io {
        path: PathBuf::from("."),
        source: e,
    })?;
    let cwd = canonical_or_self(&cwd);
    let target = canonical_or_self(path);
    if cwd.starts_with(&target) {
        return Err(ScratchError::CwdConflict(path.to_path_buf()));
    }
    Ok(())
}

/// Map an io::Error onto the crate taxonomy, keeping the offending path.
pub(crate) fn classify_io(path: &Path, e: io::Error) -> ScratchError {
    match e.kind() {
        io::ErrorKind::NotFound => ScratchError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ScratchError::PermissionDenied {
            path: path.to_path_buf(),
            source: e,
        },
        _ if is_busy(&e) => ScratchError::ResourceBusy(path.to_path_buf()),
        _ => ScratchError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

/// Busy/locked detection by raw OS code; io::ErrorKind has no stable variant
/// for sharing violations.
pub(crate) fn is_busy(e: &io::Error) -> bool {
    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            return code == libc::EBUSY || code == libc::ETXTBSY;
        }
        #[cfg(windows)]
        {
            // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
            return code == 32 || code == 33;
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = code;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn cwd_itself_conflicts() {
        let cwd = std::env::current_dir().unwrap();
        assert!(matches!(
            ensure_not_cwd(&cwd),
            Err(ScratchError::CwdConflict(_))
        ));
    }

    #[test]
    #[serial]
    fn ancestor_of_cwd_conflicts() {
        let cwd = std::env::current_dir().unwrap();
        if let Some(parent) = cwd.parent() {
            assert!(ensure_not_cwd(parent).is_err());
        }
    }

    #[test]
    #[serial]
    fn unrelated_dir_is_fine() {
        let td = tempdir().unwrap();
        ensure_not_cwd(td.path()).unwrap();
    }

    #[test]
    fn classify_not_found() {
        let e = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            classify_io(Path::new("/x"), e),
            ScratchError::NotFound(_)
        ));
    }
}
