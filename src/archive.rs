//! Archive adapter.
//!
//! Compression is an external collaborator, not something this crate
//! implements: these helpers wrap gzip'd tar (`tar` + `flate2`) behind the
//! four entry points callers need. Format internals stay in those crates.

use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, Header};
use tracing::debug;

use crate::errors::{Result, ScratchError};
use crate::util::classify_io;

/// Compress the given files and directories into `output_archive`.
/// Each path is stored under its own final name.
pub fn compress(paths: &[PathBuf], output_archive: &Path) -> Result<()> {
    let out = File::create(output_archive).map_err(|e| classify_io(output_archive, e))?;
    let enc = GzEncoder::new(out, Compression::default());
    let mut builder = Builder::new(enc);

    for path in paths {
        let name = path
            .file_name()
            .ok_or_else(|| {
                ScratchError::invalid(path.to_string_lossy(), "archive entry needs a file name")
            })?
            .to_owned();
        let meta = fs::metadata(path).map_err(|e| classify_io(path, e))?;
        if meta.is_dir() {
            builder
                .append_dir_all(&name, path)
                .map_err(|e| classify_io(path, e))?;
        } else {
            builder
                .append_path_with_name(path, &name)
                .map_err(|e| classify_io(path, e))?;
        }
    }

    let enc = builder
        .into_inner()
        .map_err(|e| classify_io(output_archive, e))?;
    enc.finish().map_err(|e| classify_io(output_archive, e))?;
    debug!(archive = %output_archive.display(), entries = paths.len(), "archive written");
    Ok(())
}

/// Extract every entry of `archive_path` into `output_directory`.
pub fn decompress(archive_path: &Path, output_directory: &Path) -> Result<()> {
    let f = File::open(archive_path).map_err(|e| classify_io(archive_path, e))?;
    let mut ar = Archive::new(GzDecoder::new(f));
    fs::create_dir_all(output_directory).map_err(|e| classify_io(output_directory, e))?;
    ar.unpack(output_directory)
        .map_err(|e| classify_io(archive_path, e))
}

/// Compress named byte streams into an in-memory archive.
pub fn compress_to_bytes(named_streams: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let enc = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(enc);

    for (name, bytes) in named_streams {
        if name.is_empty() {
            return Err(ScratchError::invalid("", "archive entry name must be non-empty"));
        }
        let mut header = Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, bytes.as_slice())
            .map_err(|e| classify_io(Path::new(name), e))?;
    }

    let enc = builder
        .into_inner()
        .map_err(|e| classify_io(Path::new("<memory>"), e))?;
    enc.finish().map_err(|e| classify_io(Path::new("<memory>"), e))
}

/// Extract an in-memory archive into `output_directory`.
pub fn decompress_from_bytes(bytes: &[u8], output_directory: &Path) -> Result<()> {
    let mut ar = Archive::new(GzDecoder::new(Cursor::new(bytes)));
    fs::create_dir_all(output_directory).map_err(|e| classify_io(output_directory, e))?;
    ar.unpack(output_directory)
        .map_err(|e| classify_io(output_directory, e))
}
