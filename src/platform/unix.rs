//! Unix implementations of platform helpers.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

/// Build the native recursive force-delete command for `path`.
/// `rm -rf --` never prompts and ignores already-missing entries; the caller
/// awaits it synchronously and re-checks existence afterwards.
pub fn force_remove_command(path: &Path) -> Command {
    let mut cmd = Command::new("rm");
    cmd.arg("-rf").arg("--").arg(path);
    cmd
}

/// Make `path` mutable again: add the owner-write bit so a subsequent
/// delete can succeed. Directories also need owner-execute to descend.
pub fn clear_protection(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    let mut mode = meta.permissions().mode();
    mode |= 0o200;
    if meta.is_dir() {
        mode |= 0o300;
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}
