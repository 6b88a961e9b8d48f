//! Streaming tar extraction with a per-entry containment check.

use super::contain::ExtractRoot;
use super::{create_dir, write_file, TarCompression};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use tar::EntryType;

/// Unpack every entry of the tar at `archive_path` below `root`.
///
/// Owner, group and absolute paths stored in the archive are never used.
/// Returns the number of entries processed.
pub(super) fn extract_tar(
    archive_path: &Path,
    compression: TarCompression,
    root: &ExtractRoot,
) -> Result<usize> {
    let file = File::open(archive_path).map_err(|e| Error::io("open", archive_path, e))?;
    let mut archive = tar::Archive::new(compression.decoder(BufReader::new(file)));
    let read_err = |e: io::Error| Error::io("read", archive_path, e);

    let mut count = 0;
    let mut symlinks = Vec::new();
    for entry in archive.entries().map_err(read_err)? {
        let mut entry = entry.map_err(read_err)?;
        let entry_path = entry.path().map_err(read_err)?.into_owned();
        let entry_type = entry.header().entry_type();

        match entry_type {
            EntryType::Directory => create_dir(&root.resolve(&entry_path)?)?,
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                let target = root.resolve(&entry_path)?;
                let mode = entry.header().mode().ok();
                write_file(&target, &mut entry, mode)?;
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(read_err)?
                    .ok_or_else(|| missing_link(&entry_path))?
                    .into_owned();
                let target = root.resolve_link_location(&entry_path)?;
                let base = target.parent().unwrap_or_else(|| root.path());
                root.contain(&entry_path, &base.join(&link))?;
                make_symlink(&link, &target)?;
                symlinks.push((entry_path, target));
            }
            EntryType::Link => {
                let link = entry
                    .link_name()
                    .map_err(read_err)?
                    .ok_or_else(|| missing_link(&entry_path))?
                    .into_owned();
                let target = root.resolve_link_location(&entry_path)?;
                // Hard links are relative to the archive root, not to the entry.
                let source = root.resolve(&link)?;
                if let Some(parent) = target.parent() {
                    create_dir(parent)?;
                }
                fs::hard_link(&source, &target).map_err(|e| Error::io("link", &target, e))?;
            }
            EntryType::XGlobalHeader | EntryType::XHeader => continue,
            other => {
                tracing::warn!("skipping {}: unsupported entry type {:?}", entry_path.display(), other);
                continue;
            }
        }
        count += 1;
    }

    // A later entry can change what an earlier link points at.
    for (entry_path, location) in &symlinks {
        root.contain(entry_path, location)?;
    }
    Ok(count)
}

fn missing_link(entry: &Path) -> Error {
    Error::Archive(format!("link entry {} has no target", entry.display()))
}

#[cfg(unix)]
fn make_symlink(link: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        create_dir(parent)?;
    }
    std::os::unix::fs::symlink(link, target).map_err(|e| Error::io("symlink", target, e))
}

#[cfg(not(unix))]
fn make_symlink(link: &Path, target: &Path) -> Result<()> {
    tracing::warn!("skipping symlink {} -> {}", target.display(), link.display());
    Ok(())
}
