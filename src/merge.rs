//! Two-file text merging.
//!
//! The destination accumulates the top file's content followed by the bottom
//! file's, optionally minus the bottom's header line, joined by exactly one
//! line terminator when the top doesn't already end with one. All offset math
//! happens in the bottom file's encoding; the bottom file itself is never
//! mutated and its BOM is never copied into the destination.
//!
//! Whether the top file ends in a terminator is decided by a buffered reverse
//! scan from its tail, so large files are never read whole.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::encoding::TextEncoding;
use crate::errors::{Result, ScratchError};
use crate::util::classify_io;
use crate::validate;

/// What to do with the bottom file's first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTreatment {
    /// Drop the bottom file's header line, terminator included.
    DeleteBottomHeader,
    /// Copy the bottom file verbatim.
    KeepBottomHeader,
}

/// Where the merged output lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    /// Append in place onto the top file.
    IntoTopFile,
    /// Copy the top file to a new path first, then append there.
    IntoNewFile,
}

const SCAN_CHUNK: usize = 8192;

/// Merge `bottom` onto `top`. With [`MergeMethod::IntoNewFile`], `new_path`
/// names the destination and must be a valid file path; otherwise it is
/// ignored. Returns the destination path.
///
/// Both inputs must share a text encoding; mismatches fail with
/// [`ScratchError::Unsupported`] before anything is written.
pub fn merge(
    top: &Path,
    bottom: &Path,
    header: HeaderTreatment,
    method: MergeMethod,
    new_path: Option<&Path>,
) -> Result<PathBuf> {
    if top.as_os_str().is_empty() {
        return Err(ScratchError::invalid("", "top path must be non-empty"));
    }
    if bottom.as_os_str().is_empty() {
        return Err(ScratchError::invalid("", "bottom path must be non-empty"));
    }
    let new_path = match method {
        MergeMethod::IntoTopFile => None,
        MergeMethod::IntoNewFile => {
            let np = new_path.ok_or_else(|| {
                ScratchError::invalid("", "new path is required when merging into a new file")
            })?;
            if !validate::is_valid_file_path(&np.to_string_lossy()) {
                return Err(ScratchError::invalid(
                    np.to_string_lossy(),
                    "new path is not a valid file path",
                ));
            }
            Some(np)
        }
    };

    let top_enc = TextEncoding::detect(top).map_err(|e| classify_io(top, e))?;
    let bottom_enc = TextEncoding::detect(bottom).map_err(|e| classify_io(bottom, e))?;
    if !top_enc.compatible_with(&bottom_enc) {
        return Err(ScratchError::Unsupported(format!(
            "cannot merge '{}' ({top_enc:?}) with '{}' ({bottom_enc:?}): encodings differ",
            top.display(),
            bottom.display(),
        )));
    }

    let top_ends_blank = last_line_is_blank(top, top_enc).map_err(|e| classify_io(top, e))?;

    let dest: PathBuf = match new_path {
        Some(np) => {
            fs::copy(top, np).map_err(|e| classify_io(np, e))?;
            np.to_path_buf()
        }
        None => top.to_path_buf(),
    };

    let mut src = File::open(bottom).map_err(|e| classify_io(bottom, e))?;
    let len = src.metadata().map_err(|e| classify_io(bottom, e))?.len();
    let start = match header {
        HeaderTreatment::KeepBottomHeader => bottom_enc.bom_len().min(len),
        HeaderTreatment::DeleteBottomHeader => {
            offset_after_first_line(&mut src, bottom_enc, len).map_err(|e| classify_io(bottom, e))?
        }
    };
    debug!(
        bottom = %bottom.display(),
        start,
        len,
        top_ends_blank,
        "merge offsets computed"
    );

    if len > start {
        let mut out = OpenOptions::new()
            .append(true)
            .open(&dest)
            .map_err(|e| classify_io(&dest, e))?;
        if !top_ends_blank {
            out.write_all(top_enc.newline())
                .map_err(|e| classify_io(&dest, e))?;
        }
        src.seek(SeekFrom::Start(start))
            .map_err(|e| classify_io(bottom, e))?;
        io::copy(&mut src, &mut out).map_err(|e| classify_io(&dest, e))?;
        out.flush().map_err(|e| classify_io(&dest, e))?;
    }

    info!(top = %top.display(), bottom = %bottom.display(), dest = %dest.display(), "merged");
    Ok(dest)
}

/// Whether the file's last line is blank, i.e. the file is empty (beyond its
/// BOM) or ends with a line terminator. Scans backward in fixed chunks.
fn last_line_is_blank(path: &Path, enc: TextEncoding) -> io::Result<bool> {
    let mut f = File::open(path)?;
    let len = f.metadata()?.len();
    let text_start = enc.bom_len().min(len);
    if len == text_start {
        return Ok(true);
    }

    let unit = enc.code_unit() as u64;
    let nl = enc.newline();
    let mut buf = vec![0u8; SCAN_CHUNK];
    let mut high = len;
    while high > text_start {
        let span = (high - text_start).min(SCAN_CHUNK as u64);
        // Keep code-unit alignment relative to the text start.
        let span = span - (span % unit);
        if span == 0 {
            return Ok(false);
        }
        let low = high - span;
        f.seek(SeekFrom::Start(low))?;
        f.read_exact(&mut buf[..span as usize])?;
        let mut i = span as i64 - unit as i64;
        while i >= 0 {
            let at = i as usize;
            if &buf[at..at + nl.len()] == nl {
                // First terminator from the end; blank iff it closes the file.
                return Ok(low + at as u64 + unit == len);
            }
            i -= unit as i64;
        }
        high = low;
    }
    Ok(false)
}

/// Byte offset just past the first line (terminator included) of `f`, in the
/// file's encoding. A file with no terminator is all header: returns `len`.
fn offset_after_first_line(f: &mut File, enc: TextEncoding, len: u64) -> io::Result<u64> {
    let unit = enc.code_unit() as u64;
    let nl = enc.newline();
    let mut pos = enc.bom_len().min(len);
    f.seek(SeekFrom::Start(pos))?;
    let mut buf = vec![0u8; SCAN_CHUNK];
    while pos < len {
        let want = (len - pos).min(SCAN_CHUNK as u64);
        let want = (want - (want % unit)) as usize;
        if want == 0 {
            break;
        }
        f.read_exact(&mut buf[..want])?;
        let mut i = 0;
        while i < want {
            if &buf[i..i + nl.len()] == nl {
                return Ok(pos + i as u64 + unit);
            }
            i += unit as usize;
        }
        pos += want as u64;
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, bytes).unwrap();
        p
    }

    #[test]
    fn header_removed_and_separator_inserted() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A\nB");
        let bottom = write(td.path(), "bottom.txt", b"H\nC\nD");

        merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), b"A\nB\nC\nD");
        assert_eq!(fs::read(&bottom).unwrap(), b"H\nC\nD", "bottom must not change");
    }

    #[test]
    fn header_kept() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A\nB");
        let bottom = write(td.path(), "bottom.txt", b"H\nC\nD");

        merge(
            &top,
            &bottom,
            HeaderTreatment::KeepBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), b"A\nB\nH\nC\nD");
    }

    #[test]
    fn no_double_terminator_when_top_ends_clean() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A\nB\n");
        let bottom = write(td.path(), "bottom.txt", b"H\nC");

        merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), b"A\nB\nC");
    }

    #[test]
    fn into_new_file_leaves_top_alone() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A\nB");
        let bottom = write(td.path(), "bottom.txt", b"H\nC");
        let out = td.path().join("merged.txt");

        let dest = merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoNewFile,
            Some(&out),
        )
        .unwrap();

        assert_eq!(dest, out);
        assert_eq!(fs::read(&out).unwrap(), b"A\nB\nC");
        assert_eq!(fs::read(&top).unwrap(), b"A\nB");
    }

    #[test]
    fn bottom_with_only_header_appends_nothing() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A\nB");
        let bottom = write(td.path(), "bottom.txt", b"just-a-header");

        merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), b"A\nB");
    }

    #[test]
    fn empty_top_gets_no_leading_terminator() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"");
        let bottom = write(td.path(), "bottom.txt", b"H\nC\n");

        merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), b"C\n");
    }

    #[test]
    fn crlf_top_counts_as_clean_ending() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A\r\nB\r\n");
        let bottom = write(td.path(), "bottom.txt", b"H\r\nC");

        merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), b"A\r\nB\r\nC");
    }

    #[test]
    fn mismatched_encodings_rejected_without_touching_inputs() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A\nB");
        let mut utf16 = vec![0xFF, 0xFE];
        for b in b"H\nC" {
            utf16.push(*b);
            utf16.push(0);
        }
        let bottom = write(td.path(), "bottom.txt", &utf16);

        let err = merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ScratchError::Unsupported(_)));
        assert_eq!(fs::read(&top).unwrap(), b"A\nB");
        assert_eq!(fs::read(&bottom).unwrap(), utf16);
    }

    #[test]
    fn utf16_le_merge_keeps_units_intact() {
        let td = tempdir().unwrap();
        let enc = |s: &str| -> Vec<u8> {
            let mut v = vec![0xFF, 0xFE];
            for u in s.encode_utf16() {
                v.extend_from_slice(&u.to_le_bytes());
            }
            v
        };
        let top = write(td.path(), "top.txt", &enc("A\nB"));
        let bottom = write(td.path(), "bottom.txt", &enc("H\nC"));

        merge(
            &top,
            &bottom,
            HeaderTreatment::DeleteBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), enc("A\nB\nC"));
    }

    #[test]
    fn bottom_bom_not_copied_when_header_kept() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"\xEF\xBB\xBFA\n");
        let bottom = write(td.path(), "bottom.txt", b"\xEF\xBB\xBFH\nC");

        merge(
            &top,
            &bottom,
            HeaderTreatment::KeepBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap();

        assert_eq!(fs::read(&top).unwrap(), b"\xEF\xBB\xBFA\nH\nC");
    }

    #[test]
    fn missing_new_path_is_invalid() {
        let td = tempdir().unwrap();
        let top = write(td.path(), "top.txt", b"A");
        let bottom = write(td.path(), "bottom.txt", b"B");
        let err = merge(
            &top,
            &bottom,
            HeaderTreatment::KeepBottomHeader,
            MergeMethod::IntoNewFile,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ScratchError::InvalidArgument { .. }));
    }

    #[test]
    fn empty_paths_are_invalid() {
        let err = merge(
            Path::new(""),
            Path::new("b"),
            HeaderTreatment::KeepBottomHeader,
            MergeMethod::IntoTopFile,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ScratchError::InvalidArgument { .. }));
    }
}
