//! Path validity predicates.
//!
//! These are pure string-level checks: they never touch the filesystem and
//! never error. A "valid" path here means "safe to hand to the allocator or
//! merger", not "exists".

use std::path::Path;

/// Device-style names the OS reserves regardless of extension.
/// Matching is per path segment, on the substring before the first '.'.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// True iff `path` names a file: resolvable to an absolute form, not an
/// OS-reserved device name, and carrying a non-empty final segment.
pub fn is_valid_file_path(path: &str) -> bool {
    if !is_resolvable(path) || is_os_restricted_path(path) {
        return false;
    }
    // A file path must not end at a directory boundary.
    if path.ends_with(['/', '\\']) {
        return false;
    }
    Path::new(path).file_name().is_some()
}

/// True iff `path` names a directory: same resolution and reservation checks
/// as [`is_valid_file_path`], but the final segment must be empty (the path
/// ends with a separator).
pub fn is_valid_directory_path(path: &str) -> bool {
    if !is_resolvable(path) || is_os_restricted_path(path) {
        return false;
    }
    path.ends_with(['/', '\\'])
}

/// True iff any segment of `path` reduces to an OS-reserved device name.
/// An extension does not excuse a reserved base name ("CON.txt" is reserved).
pub fn is_os_restricted_path(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let base = segment.split('.').next().unwrap_or("");
        RESERVED_NAMES.iter().any(|r| base.eq_ignore_ascii_case(r))
    })
}

/// Whether the string resolves to an absolute path at all.
fn is_resolvable(path: &str) -> bool {
    if path.trim().is_empty() || path.contains('\0') {
        return false;
    }
    std::path::absolute(path).is_ok()
}
