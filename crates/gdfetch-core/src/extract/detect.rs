//! Archive format detection from file names and magic bytes.

use super::{ArchiveFormat, TarCompression};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Format from the leading bytes of a file.
pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x50, 0x4B, 0x03, 0x04, ..] | [0x50, 0x4B, 0x05, 0x06, ..] => Some(ArchiveFormat::Zip),
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::Tar(TarCompression::Gzip)),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(ArchiveFormat::Tar(TarCompression::Xz)),
        _ if is_tar_header(data) => Some(ArchiveFormat::Tar(TarCompression::None)),
        _ => None,
    }
}

fn is_tar_header(data: &[u8]) -> bool {
    data.len() >= 263 && &data[257..262] == b"ustar"
}

/// Read the first block of `path` and detect its format.
pub fn sniff_file(path: &Path) -> io::Result<Option<ArchiveFormat>> {
    let mut header = Vec::with_capacity(512);
    File::open(path)?.take(512).read_to_end(&mut header)?;
    Ok(detect_format(&header))
}

/// Format from a file name (`.zip`, `.tar`, `.tar.gz`, `.tgz`, `.tar.xz`, `.txz`).
pub fn format_from_file_name(path: &Path) -> Option<ArchiveFormat> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveFormat::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveFormat::Tar(TarCompression::Gzip))
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some(ArchiveFormat::Tar(TarCompression::Xz))
    } else if name.ends_with(".tar") {
        Some(ArchiveFormat::Tar(TarCompression::None))
    } else {
        None
    }
}
