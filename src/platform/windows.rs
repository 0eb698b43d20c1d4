//! Windows implementations of platform helpers (best-effort, minimal ACL awareness).

use std::io;
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::process::CommandExt;
use std::path::Path;
use std::process::Command;

use windows_sys::Win32::Storage::FileSystem::{FILE_ATTRIBUTE_NORMAL, SetFileAttributesW};

/// CREATE_NO_WINDOW: the spawned shell must not flash a console window.
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Build the native force-delete command for `path`: `rd /S /Q` for trees,
/// `del /F /Q` for single files. Neither prompts; files still open elsewhere
/// may survive (their directory entries are orphaned until the handle closes).
pub fn force_remove_command(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    if path.is_dir() {
        cmd.arg("/C").arg("rd").arg("/S").arg("/Q").arg(path);
    } else {
        cmd.arg("/C").arg("del").arg("/F").arg("/Q").arg(path);
    }
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

/// Reset `path` to FILE_ATTRIBUTE_NORMAL, dropping read-only/hidden bits so a
/// subsequent delete can succeed.
pub fn clear_protection(path: &Path) -> io::Result<()> {
    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(once(0)).collect();
    let ok = unsafe { SetFileAttributesW(wide.as_ptr(), FILE_ATTRIBUTE_NORMAL) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
