//! Traversal-safe archive extraction.
//!
//! Entries are written into a sibling staging directory
//! (`<destination>.part`). Every entry path is resolved and checked against
//! the staging root before anything is written for it; the first entry that
//! escapes aborts the whole job. On success the staging directory is renamed
//! to the destination, on any failure it is removed, so a destination either
//! holds the complete archive or does not exist.

mod contain;
mod detect;
mod untar;
mod unzip;

pub use contain::{is_contained_within, resolve_path};
pub use detect::{detect_format, format_from_file_name, sniff_file};

use crate::error::{Error, Result};
use crate::fs_util::remove_tree;
use crate::storage::temp_path;
use contain::ExtractRoot;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Compression wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
    Xz,
}

impl TarCompression {
    fn decoder<'r, R: Read + 'r>(self, reader: R) -> Box<dyn Read + 'r> {
        match self {
            TarCompression::None => Box::new(reader),
            TarCompression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            TarCompression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        }
    }
}

/// Container format of a downloaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar(TarCompression),
    Zip,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArchiveFormat::Tar(TarCompression::None) => "tar",
            ArchiveFormat::Tar(TarCompression::Gzip) => "tar.gz",
            ArchiveFormat::Tar(TarCompression::Xz) => "tar.xz",
            ArchiveFormat::Zip => "zip",
        };
        f.write_str(s)
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tar" => Ok(ArchiveFormat::Tar(TarCompression::None)),
            "tar.gz" | "tgz" | "gz" => Ok(ArchiveFormat::Tar(TarCompression::Gzip)),
            "tar.xz" | "txz" | "xz" => Ok(ArchiveFormat::Tar(TarCompression::Xz)),
            "zip" => Ok(ArchiveFormat::Zip),
            other => Err(format!(
                "unknown archive format {:?} (expected tar, tar.gz, tar.xz or zip)",
                other
            )),
        }
    }
}

impl ArchiveFormat {
    /// Format from the file name, falling back to the file's magic bytes.
    pub fn infer(path: &Path) -> Result<Option<ArchiveFormat>> {
        if let Some(format) = format_from_file_name(path) {
            return Ok(Some(format));
        }
        sniff_file(path).map_err(|e| Error::io("read", path, e))
    }
}

/// What an extract call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Archive was unpacked; `entries` counts processed archive entries.
    Extracted { entries: usize },
    /// Destination already existed; left untouched.
    AlreadyPresent,
    /// Archive file does not exist; nothing to do.
    ArchiveMissing,
}

/// Extract `archive` into `destination`.
///
/// An existing `destination` counts as done and is left untouched. Any entry
/// resolving outside the destination aborts with [`Error::Security`] and
/// leaves no extracted file behind.
pub fn extract(archive: &Path, destination: &Path, format: ArchiveFormat) -> Result<ExtractOutcome> {
    if !archive.is_file() {
        tracing::info!("archive {} not found, nothing to extract", archive.display());
        return Ok(ExtractOutcome::ArchiveMissing);
    }
    if destination.exists() {
        tracing::info!("folder {} already exists", destination.display());
        return Ok(ExtractOutcome::AlreadyPresent);
    }

    let staging = temp_path(destination);
    if fs::symlink_metadata(&staging).is_ok() {
        tracing::debug!("removing stale staging directory {}", staging.display());
        remove_tree(&staging).map_err(|e| Error::io("remove", &staging, e))?;
    }
    fs::create_dir_all(&staging).map_err(|e| Error::io("create directory", &staging, e))?;

    let unpacked = ExtractRoot::new(&staging).and_then(|root| {
        tracing::debug!(%format, "extracting {} into {}", archive.display(), root.path().display());
        match format {
            ArchiveFormat::Tar(compression) => untar::extract_tar(archive, compression, &root),
            ArchiveFormat::Zip => unzip::extract_zip(archive, &root),
        }
    });
    let published = unpacked.and_then(|entries| {
        fs::rename(&staging, destination)
            .map(|()| entries)
            .map_err(|e| Error::io("rename", &staging, e))
    });

    match published {
        Ok(entries) => {
            tracing::info!(entries, "extracted {} to {}", archive.display(), destination.display());
            Ok(ExtractOutcome::Extracted { entries })
        }
        Err(e) => {
            if e.is_security() {
                tracing::warn!("refusing {}: {}", archive.display(), e);
            }
            if let Err(rm) = remove_tree(&staging) {
                tracing::warn!("could not remove {}: {}", staging.display(), rm);
            }
            Err(e)
        }
    }
}

/// Write one regular file entry, creating intermediate directories.
fn write_file(target: &Path, reader: &mut dyn Read, mode: Option<u32>) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
    }
    let mut out = File::create(target).map_err(|e| Error::io("create", target, e))?;
    io::copy(reader, &mut out).map_err(|e| Error::io("extract", target, e))?;
    apply_mode(target, mode)
}

fn create_dir(target: &Path) -> Result<()> {
    fs::create_dir_all(target).map_err(|e| Error::io("create directory", target, e))
}

/// Apply permission bits only; owner, setuid/setgid and sticky bits are dropped.
#[cfg(unix)]
fn apply_mode(target: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o777))
            .map_err(|e| Error::io("chmod", target, e)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_target: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}
