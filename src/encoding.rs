//! Text-encoding sniffing for the merger.
//!
//! Detection is BOM-based: UTF-16 LE/BE by their two-byte marks, UTF-8 with
//! or without its three-byte mark. Anything without a BOM is treated as plain
//! UTF-8/ASCII bytes. The merger only needs three facts per file: where the
//! text starts (BOM length), the code-unit width for offset math, and the
//! encoded line-feed sequence.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Sniff the encoding of the file at `path` from its first bytes.
    pub fn detect(path: &Path) -> io::Result<TextEncoding> {
        let mut f = File::open(path)?;
        let mut head = [0u8; 3];
        let mut filled = 0;
        // A file shorter than the probe is fine; read what is there.
        while filled < head.len() {
            let n = f.read(&mut head[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(Self::from_bom(&head[..filled]))
    }

    fn from_bom(head: &[u8]) -> TextEncoding {
        if head.starts_with(&[0xEF, 0xBB, 0xBF]) {
            TextEncoding::Utf8Bom
        } else if head.starts_with(&[0xFF, 0xFE]) {
            TextEncoding::Utf16Le
        } else if head.starts_with(&[0xFE, 0xFF]) {
            TextEncoding::Utf16Be
        } else {
            TextEncoding::Utf8
        }
    }

    /// Byte length of the byte-order mark, i.e. where the text begins.
    pub fn bom_len(&self) -> u64 {
        match self {
            TextEncoding::Utf8 => 0,
            TextEncoding::Utf8Bom => 3,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
        }
    }

    /// Width of one code unit in bytes; all offset math steps by this.
    pub fn code_unit(&self) -> usize {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => 1,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
        }
    }

    /// The encoded line feed.
    pub fn newline(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => b"\n",
            TextEncoding::Utf16Le => b"\n\0",
            TextEncoding::Utf16Be => b"\0\n",
        }
    }

    /// Whether two detected encodings decode text identically. UTF-8 with and
    /// without a BOM are the same encoding; a merge across them is fine.
    pub fn compatible_with(&self, other: &TextEncoding) -> bool {
        self.code_unit() == other.code_unit()
            && match (self, other) {
                (TextEncoding::Utf16Le, TextEncoding::Utf16Le) => true,
                (TextEncoding::Utf16Be, TextEncoding::Utf16Be) => true,
                (TextEncoding::Utf16Le, _) | (_, TextEncoding::Utf16Le) => false,
                (TextEncoding::Utf16Be, _) | (_, TextEncoding::Utf16Be) => false,
                _ => true,
            }
    }
}
